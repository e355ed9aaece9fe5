#[cfg(test)]
mod tests {
    use crate::cli::Cli;
    use crate::dispatcher::{FetchData, ProviderCall, spawn_dispatcher};
    use crate::kubernetes::{LogLines, ResourceProvider};
    use crate::logstream;
    use crate::nav::{Effect, Navigator, ViewKey};
    use crate::types::{Container, CronJob, Job};
    use crate::ui::AppEvent;
    use anyhow::Result;
    use clap::Parser;
    use futures::StreamExt;
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc;

    /// In-memory provider with a recorded call log, standing in for a
    /// cluster in the end-to-end scenarios.
    #[derive(Clone, Default)]
    struct StaticProvider {
        calls: Arc<Mutex<Vec<String>>>,
        fail_cron_jobs: bool,
    }

    impl StaticProvider {
        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ResourceProvider for StaticProvider {
        async fn list_namespaces(&self) -> Result<Vec<String>> {
            self.record("list_namespaces".to_string());
            Ok(vec!["default".to_string(), "kube-system".to_string()])
        }

        async fn list_containers(
            &self,
            namespace: &str,
            label_selector: Option<&str>,
        ) -> Result<Vec<Container>> {
            self.record(format!(
                "list_containers({namespace}, {:?})",
                label_selector
            ));
            Ok(vec![Container::new("default", "p1", "c1")])
        }

        async fn list_cron_jobs(&self, namespace: &str) -> Result<Vec<CronJob>> {
            self.record(format!("list_cron_jobs({namespace})"));
            if self.fail_cron_jobs {
                anyhow::bail!("cron jobs unavailable");
            }
            Ok(vec![CronJob {
                namespace: namespace.to_string(),
                name: "nightly".to_string(),
                jobs: vec![Job {
                    namespace: namespace.to_string(),
                    name: "nightly-1".to_string(),
                }],
            }])
        }

        async fn list_jobs(&self, namespace: &str, owner: &str) -> Result<Vec<Job>> {
            self.record(format!("list_jobs({namespace}, {owner})"));
            Ok(vec![Job {
                namespace: namespace.to_string(),
                name: format!("{owner}-1"),
            }])
        }

        async fn get_log_tail(&self, container: &Container, tail_lines: i64) -> Result<Vec<String>> {
            self.record(format!("get_log_tail({}, {tail_lines})", container.path()));
            Ok(vec![r#"{"level":"info","msg":"tail"}"#.to_string()])
        }

        async fn open_log_stream(&self, container: &Container, _tail_lines: i64) -> Result<LogLines> {
            self.record(format!("open_log_stream({})", container.path()));
            Ok(futures::stream::iter(vec![Ok(
                r#"{"level":"info","time":"t1","msg":"hello","extra":"z"}"#.to_string(),
            )])
            .boxed())
        }
    }

    async fn next_fetch(rx: &mut mpsc::Receiver<AppEvent>) -> (ViewKey, Result<FetchData>) {
        match rx.recv().await.expect("event") {
            AppEvent::Fetch { view, result } => (view, result),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn drill_from_namespaces_to_container_logs() {
        let provider = StaticProvider::default();
        let (event_tx, mut event_rx) = mpsc::channel(16);
        let (req_tx, req_rx) = mpsc::channel(16);
        let _dispatcher = spawn_dispatcher(provider.clone(), req_rx, event_tx);

        let mut nav = Navigator::new();

        // Initial entry fetches the namespace list.
        let Effect::Fetch(request) = nav.initial_request() else {
            panic!("initial entry must fetch");
        };
        req_tx.send(request).await.unwrap();
        let (view, result) = next_fetch(&mut event_rx).await;
        nav.apply_fetch(view, result);
        assert_eq!(nav.store.namespaces, vec!["default", "kube-system"]);

        // Descend into "default", then pick the containers API.
        assert_eq!(nav.descend(0), None);
        assert_eq!(nav.key, ViewKey::ApiChoice);
        assert_eq!(nav.context.namespace.as_deref(), Some("default"));

        let Some(Effect::Fetch(request)) = nav.descend(0) else {
            panic!("entering containers must fetch");
        };
        assert_eq!(
            request.call,
            ProviderCall::ListContainers {
                namespace: "default".to_string(),
                selector: None,
            }
        );
        req_tx.send(request).await.unwrap();
        let (view, result) = next_fetch(&mut event_rx).await;
        nav.apply_fetch(view, result);
        assert_eq!(nav.store.containers, vec![Container::new("default", "p1", "c1")]);
        assert_eq!(nav.item_count(), 1);

        // Descend into the only container: a follow-stream opens for it.
        let effect = nav.descend(0);
        assert_eq!(
            effect,
            Some(Effect::OpenStream {
                view: ViewKey::ContainerLogs,
                container: Container::new("default", "p1", "c1"),
            })
        );
        assert_eq!(
            nav.context.container,
            Some(Container::new("default", "p1", "c1"))
        );

        let lines = provider
            .open_log_stream(&Container::new("default", "p1", "c1"), 10)
            .await
            .unwrap();
        let mut session = logstream::spawn_reader(ViewKey::ContainerLogs, lines);

        let entry = session.recv().await.unwrap().unwrap();
        nav.apply_log_entry(session.view, entry);
        assert_eq!(nav.log_entries().len(), 1);
        assert_eq!(nav.log_entries()[0].msg, "hello");
        assert_eq!(
            nav.log_entries()[0].raw,
            r#"{"level":"info","time":"t1","msg":"hello","extra":"z"}"#
        );

        // The fixture stream ends after one line; the session signals
        // end-of-stream instead of hanging.
        assert!(session.recv().await.is_none());

        assert_eq!(
            provider.calls(),
            vec![
                "list_namespaces",
                "list_containers(default, None)",
                "open_log_stream(default/p1/c1)",
            ]
        );
    }

    #[tokio::test]
    async fn dispatcher_survives_provider_errors() {
        let provider = StaticProvider {
            fail_cron_jobs: true,
            ..Default::default()
        };
        let (event_tx, mut event_rx) = mpsc::channel(16);
        let (req_tx, req_rx) = mpsc::channel(16);
        let _dispatcher = spawn_dispatcher(provider, req_rx, event_tx);

        req_tx
            .send(crate::dispatcher::FetchRequest {
                view: ViewKey::CronJobs,
                call: ProviderCall::ListCronJobs {
                    namespace: "default".to_string(),
                },
            })
            .await
            .unwrap();

        let (view, result) = next_fetch(&mut event_rx).await;
        assert_eq!(view, ViewKey::CronJobs);
        assert!(result.is_err());

        // The worker keeps servicing requests after a failure.
        req_tx
            .send(crate::dispatcher::FetchRequest {
                view: ViewKey::Namespaces,
                call: ProviderCall::ListNamespaces,
            })
            .await
            .unwrap();

        let (view, result) = next_fetch(&mut event_rx).await;
        assert_eq!(view, ViewKey::Namespaces);
        assert_eq!(
            result.unwrap(),
            FetchData::Namespaces(vec!["default".to_string(), "kube-system".to_string()])
        );
    }

    #[tokio::test]
    async fn cron_branch_uses_embedded_jobs_and_job_selector() {
        let provider = StaticProvider::default();
        let (event_tx, mut event_rx) = mpsc::channel(16);
        let (req_tx, req_rx) = mpsc::channel(16);
        let _dispatcher = spawn_dispatcher(provider.clone(), req_rx, event_tx);

        let mut nav = Navigator::new();
        nav.store.namespaces = vec!["default".to_string()];
        nav.descend(0);

        let Some(Effect::Fetch(request)) = nav.descend(1) else {
            panic!("entering cronjobs must fetch");
        };
        req_tx.send(request).await.unwrap();
        let (view, result) = next_fetch(&mut event_rx).await;
        nav.apply_fetch(view, result);
        assert_eq!(nav.key, ViewKey::CronJobs);
        assert_eq!(nav.item_count(), 1);

        // Jobs come embedded in the CronJob; no fetch on descend.
        assert_eq!(nav.descend(0), None);
        assert_eq!(nav.key, ViewKey::CronJobJobs);
        assert_eq!(nav.item_count(), 1);

        // Job containers are listed by the job-name label.
        let Some(Effect::Fetch(request)) = nav.descend(0) else {
            panic!("entering job containers must fetch");
        };
        assert_eq!(
            request.call,
            ProviderCall::ListContainers {
                namespace: "default".to_string(),
                selector: Some("job-name=nightly-1".to_string()),
            }
        );
        req_tx.send(request).await.unwrap();
        let (view, result) = next_fetch(&mut event_rx).await;
        nav.apply_fetch(view, result);
        assert_eq!(nav.key, ViewKey::CronJobContainers);
        assert_eq!(nav.item_count(), 1);

        assert!(
            provider
                .calls()
                .contains(&"list_containers(default, Some(\"job-name=nightly-1\"))".to_string())
        );
    }

    #[tokio::test]
    async fn one_shot_tail_decodes_in_order() {
        let provider = StaticProvider::default();
        let target = Container::new("default", "p1", "c1");

        let lines = provider.get_log_tail(&target, 10).await.unwrap();
        let entries = logstream::decode_tail(&lines);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, "info");
        assert_eq!(entries[0].msg, "tail");
        assert_eq!(provider.calls(), vec!["get_log_tail(default/p1/c1, 10)"]);
    }

    #[test]
    fn cli_parses_direct_target() {
        let cli = Cli::try_parse_from([
            "kube-drill",
            "-n",
            "default",
            "-p",
            "my-pod",
            "-c",
            "app",
        ])
        .unwrap();

        assert_eq!(
            cli.direct_target(),
            Some(Container::new("default", "my-pod", "app"))
        );
        assert_eq!(cli.tail, 10);
        assert!(!cli.no_follow);
    }

    #[test]
    fn cli_requires_full_triple_for_direct_target() {
        let cli = Cli::try_parse_from(["kube-drill", "-n", "default"]).unwrap();
        assert_eq!(cli.direct_target(), None);
    }

    #[test]
    fn cli_parses_tail_and_follow_flags() {
        let cli = Cli::try_parse_from(["kube-drill", "--tail", "50", "--no-follow", "-v"]).unwrap();
        assert_eq!(cli.tail, 50);
        assert!(cli.no_follow);
        assert!(cli.verbose);
    }
}
