use tracing::debug;

use crate::dispatcher::{FetchData, FetchRequest, ProviderCall};
use crate::types::{Container, CronJob, Job, LogEntry};

/// One node in the fixed navigation hierarchy. Exactly one key is current
/// at any time; parent/child edges are fixed by `parent()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKey {
    Namespaces,
    ApiChoice,
    Containers,
    ContainerLogs,
    CronJobs,
    CronJobJobs,
    CronJobContainers,
    CronJobLogs,
}

impl Default for ViewKey {
    fn default() -> Self {
        Self::Namespaces
    }
}

impl ViewKey {
    pub fn parent(self) -> Option<ViewKey> {
        match self {
            Self::Namespaces => None,
            Self::ApiChoice => Some(Self::Namespaces),
            Self::Containers => Some(Self::ApiChoice),
            Self::ContainerLogs => Some(Self::Containers),
            Self::CronJobs => Some(Self::ApiChoice),
            Self::CronJobJobs => Some(Self::CronJobs),
            Self::CronJobContainers => Some(Self::CronJobJobs),
            Self::CronJobLogs => Some(Self::CronJobContainers),
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Namespaces => "namespaces",
            Self::ApiChoice => "apis",
            Self::Containers => "containers",
            Self::ContainerLogs => "logs",
            Self::CronJobs => "cronjobs",
            Self::CronJobJobs => "jobs",
            Self::CronJobContainers => "job containers",
            Self::CronJobLogs => "logs",
        }
    }

    /// Log-tailing leaf views own a follow-stream for their lifetime.
    pub fn is_log_view(self) -> bool {
        matches!(self, Self::ContainerLogs | Self::CronJobLogs)
    }
}

/// The resource kinds selectable from the `ApiChoice` view. The list is
/// static; no fetch is issued to produce it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKind {
    Containers,
    CronJobs,
}

impl ApiKind {
    pub const ALL: [Self; 2] = [Self::Containers, Self::CronJobs];

    pub fn label(self) -> &'static str {
        match self {
            Self::Containers => "containers",
            Self::CronJobs => "cronJobs",
        }
    }
}

/// Selections accumulated while descending the hierarchy. Fields are
/// written on descend and never cleared on ascend; re-descending
/// overwrites them.
#[derive(Debug, Clone, Default)]
pub struct NavigationContext {
    pub namespace: Option<String>,
    pub api: Option<ApiKind>,
    pub container: Option<Container>,
    pub cron_job: Option<CronJob>,
    pub job: Option<Job>,
    pub job_container: Option<Container>,
}

/// Per-view list data. Disposable: fully replaced on every transition into
/// the owning view, never patched in place. `ApiChoice` is static and
/// `CronJobJobs` is derived from the jobs embedded in the selected
/// CronJob, so neither is stored here.
#[derive(Debug, Default)]
pub struct ViewStore {
    pub namespaces: Vec<String>,
    pub containers: Vec<Container>,
    pub cron_jobs: Vec<CronJob>,
    pub job_containers: Vec<Container>,
    pub container_logs: Vec<LogEntry>,
    pub cron_job_logs: Vec<LogEntry>,
}

/// A side effect requested by a transition. The UI loop executes these;
/// the navigator itself never touches a channel or the network.
#[derive(Debug, PartialEq)]
pub enum Effect {
    Fetch(FetchRequest),
    OpenStream { view: ViewKey, container: Container },
    CloseStream,
}

/// The navigation state machine. Owns the current view key, the
/// accumulated context and all per-view data; mutated only from the UI
/// loop in response to commands and tagged results.
#[derive(Debug, Default)]
pub struct Navigator {
    pub key: ViewKey,
    pub context: NavigationContext,
    pub store: ViewStore,
    pub loading: bool,
    pub error: Option<String>,
    pub stream_ended: bool,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The fetch issued on initial entry into the root view.
    pub fn initial_request(&mut self) -> Effect {
        self.loading = true;
        Effect::Fetch(FetchRequest {
            view: ViewKey::Namespaces,
            call: ProviderCall::ListNamespaces,
        })
    }

    /// Number of selectable items in the current view.
    pub fn item_count(&self) -> usize {
        match self.key {
            ViewKey::Namespaces => self.store.namespaces.len(),
            ViewKey::ApiChoice => ApiKind::ALL.len(),
            ViewKey::Containers => self.store.containers.len(),
            ViewKey::CronJobs => self.store.cron_jobs.len(),
            ViewKey::CronJobJobs => self.embedded_jobs().len(),
            ViewKey::CronJobContainers => self.store.job_containers.len(),
            ViewKey::ContainerLogs | ViewKey::CronJobLogs => 0,
        }
    }

    /// Jobs shown by `CronJobJobs`, re-derived from the selected CronJob.
    pub fn embedded_jobs(&self) -> &[Job] {
        self.context
            .cron_job
            .as_ref()
            .map(|cj| cj.jobs.as_slice())
            .unwrap_or(&[])
    }

    pub fn log_entries(&self) -> &[LogEntry] {
        match self.key {
            ViewKey::ContainerLogs => &self.store.container_logs,
            ViewKey::CronJobLogs => &self.store.cron_job_logs,
            _ => &[],
        }
    }

    /// Confirm the selection at `index`: move to the child view, record the
    /// selection in the context and request the child's data. No-op on the
    /// log leaves and on an out-of-range index.
    pub fn descend(&mut self, index: usize) -> Option<Effect> {
        match self.key {
            ViewKey::Namespaces => {
                let namespace = self.store.namespaces.get(index)?.clone();
                self.context.namespace = Some(namespace);
                self.enter(ViewKey::ApiChoice);
                None
            }
            ViewKey::ApiChoice => {
                let api = *ApiKind::ALL.get(index)?;
                let namespace = self.context.namespace.clone()?;
                self.context.api = Some(api);
                match api {
                    ApiKind::Containers => {
                        self.enter(ViewKey::Containers);
                        self.store.containers.clear();
                        self.start_fetch(ProviderCall::ListContainers {
                            namespace,
                            selector: None,
                        })
                    }
                    ApiKind::CronJobs => {
                        self.enter(ViewKey::CronJobs);
                        self.store.cron_jobs.clear();
                        self.start_fetch(ProviderCall::ListCronJobs { namespace })
                    }
                }
            }
            ViewKey::Containers => {
                let container = self.store.containers.get(index)?.clone();
                self.context.container = Some(container.clone());
                self.enter(ViewKey::ContainerLogs);
                self.store.container_logs.clear();
                self.loading = true;
                Some(Effect::OpenStream {
                    view: ViewKey::ContainerLogs,
                    container,
                })
            }
            ViewKey::CronJobs => {
                let cron_job = self.store.cron_jobs.get(index)?.clone();
                self.context.cron_job = Some(cron_job);
                self.enter(ViewKey::CronJobJobs);
                None
            }
            ViewKey::CronJobJobs => {
                let job = self.embedded_jobs().get(index)?.clone();
                self.context.job = Some(job.clone());
                self.enter(ViewKey::CronJobContainers);
                self.store.job_containers.clear();
                self.start_fetch(ProviderCall::ListContainers {
                    namespace: job.namespace,
                    selector: Some(format!("job-name={}", job.name)),
                })
            }
            ViewKey::CronJobContainers => {
                let container = self.store.job_containers.get(index)?.clone();
                self.context.job_container = Some(container.clone());
                self.enter(ViewKey::CronJobLogs);
                self.store.cron_job_logs.clear();
                self.loading = true;
                Some(Effect::OpenStream {
                    view: ViewKey::CronJobLogs,
                    container,
                })
            }
            ViewKey::ContainerLogs | ViewKey::CronJobLogs => None,
        }
    }

    /// Move to the parent view. Issues no fetch: the parent's data is still
    /// in the store (or re-derivable from context). Leaving a log leaf
    /// closes the owning stream. No-op at the root.
    pub fn ascend(&mut self) -> Option<Effect> {
        let parent = self.key.parent()?;
        let leaving_logs = self.key.is_log_view();
        self.key = parent;
        self.loading = false;
        if leaving_logs {
            Some(Effect::CloseStream)
        } else {
            None
        }
    }

    /// Re-issue the current view's fetch, fully replacing its data on
    /// arrival. The `CronJobJobs` view refreshes through `ListJobs`, which
    /// also replaces the job list embedded in the selected CronJob.
    pub fn refresh(&mut self) -> Option<Effect> {
        match self.key {
            ViewKey::Namespaces => self.start_fetch(ProviderCall::ListNamespaces),
            ViewKey::Containers => {
                let namespace = self.context.namespace.clone()?;
                self.start_fetch(ProviderCall::ListContainers {
                    namespace,
                    selector: None,
                })
            }
            ViewKey::CronJobs => {
                let namespace = self.context.namespace.clone()?;
                self.start_fetch(ProviderCall::ListCronJobs { namespace })
            }
            ViewKey::CronJobJobs => {
                let cron_job = self.context.cron_job.clone()?;
                self.start_fetch(ProviderCall::ListJobs {
                    namespace: cron_job.namespace,
                    owner: cron_job.name,
                })
            }
            ViewKey::CronJobContainers => {
                let job = self.context.job.clone()?;
                self.start_fetch(ProviderCall::ListContainers {
                    namespace: job.namespace,
                    selector: Some(format!("job-name={}", job.name)),
                })
            }
            ViewKey::ApiChoice | ViewKey::ContainerLogs | ViewKey::CronJobLogs => None,
        }
    }

    /// Apply a fetch result tagged with the view it was issued for.
    /// Results for a view that is no longer current are dropped. A payload
    /// variant that cannot belong to its tag means the message protocol
    /// and the state machine have drifted apart; that fails loudly.
    pub fn apply_fetch(&mut self, view: ViewKey, result: anyhow::Result<FetchData>) {
        if view != self.key {
            debug!(?view, current = ?self.key, "dropping stale fetch result");
            return;
        }

        self.loading = false;

        let data = match result {
            Ok(data) => data,
            Err(err) => {
                self.error = Some(format!("{err:#}"));
                return;
            }
        };

        match (view, data) {
            (ViewKey::Namespaces, FetchData::Namespaces(names)) => {
                self.store.namespaces = names;
            }
            (ViewKey::Containers, FetchData::Containers(containers)) => {
                self.store.containers = containers;
            }
            (ViewKey::CronJobs, FetchData::CronJobs(cron_jobs)) => {
                self.store.cron_jobs = cron_jobs;
            }
            (ViewKey::CronJobJobs, FetchData::Jobs(jobs)) => {
                if let Some(cron_job) = self.context.cron_job.as_mut() {
                    cron_job.jobs = jobs;
                }
            }
            (ViewKey::CronJobContainers, FetchData::Containers(containers)) => {
                self.store.job_containers = containers;
            }
            (view, data) => {
                panic!("fetch payload {data:?} does not belong to view {view:?}");
            }
        }
    }

    /// Append one decoded entry to the current log view. Entries tagged for
    /// a view we already left are dropped (the session is aborted on
    /// ascend, but a final in-flight entry can still arrive).
    pub fn apply_log_entry(&mut self, view: ViewKey, entry: LogEntry) {
        if view != self.key {
            debug!(?view, current = ?self.key, "dropping stale log entry");
            return;
        }

        self.loading = false;

        match view {
            ViewKey::ContainerLogs => self.store.container_logs.push(entry),
            ViewKey::CronJobLogs => self.store.cron_job_logs.push(entry),
            _ => panic!("log entry delivered to non-log view {view:?}"),
        }
    }

    /// The follow-stream failed to open or died mid-read.
    pub fn stream_failed(&mut self, err: anyhow::Error) {
        self.loading = false;
        self.error = Some(format!("{err:#}"));
    }

    /// The follow-stream closed cleanly. No further entries will arrive.
    pub fn stream_closed(&mut self) {
        self.loading = false;
        self.stream_ended = true;
    }

    /// Dismiss the error overlay and return to the parent of the view
    /// whose request failed, the last view with usable data.
    pub fn dismiss_error(&mut self) -> Option<Effect> {
        self.error = None;
        self.ascend()
    }

    fn enter(&mut self, key: ViewKey) {
        self.key = key;
        self.loading = false;
        self.stream_ended = false;
    }

    fn start_fetch(&mut self, call: ProviderCall) -> Option<Effect> {
        self.loading = true;
        Some(Effect::Fetch(FetchRequest {
            view: self.key,
            call,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Navigator {
        let mut nav = Navigator::new();
        nav.store.namespaces = vec!["default".to_string(), "kube-system".to_string()];
        nav
    }

    fn containers_fixture() -> Vec<Container> {
        vec![Container::new("default", "p1", "c1")]
    }

    fn cron_job_fixture() -> CronJob {
        CronJob {
            namespace: "default".to_string(),
            name: "nightly".to_string(),
            jobs: vec![Job {
                namespace: "default".to_string(),
                name: "nightly-1".to_string(),
            }],
        }
    }

    #[test]
    fn descend_records_namespace_and_enters_api_choice() {
        let mut nav = fixture();

        let effect = nav.descend(0);

        assert_eq!(effect, None);
        assert_eq!(nav.key, ViewKey::ApiChoice);
        assert_eq!(nav.context.namespace.as_deref(), Some("default"));
    }

    #[test]
    fn selecting_containers_api_issues_tagged_fetch() {
        let mut nav = fixture();
        nav.descend(0);

        let effect = nav.descend(0);

        assert_eq!(nav.key, ViewKey::Containers);
        assert_eq!(nav.context.api, Some(ApiKind::Containers));
        assert_eq!(
            effect,
            Some(Effect::Fetch(FetchRequest {
                view: ViewKey::Containers,
                call: ProviderCall::ListContainers {
                    namespace: "default".to_string(),
                    selector: None,
                },
            }))
        );
        assert!(nav.loading);
    }

    #[test]
    fn descending_into_logs_opens_stream_for_selected_container() {
        let mut nav = fixture();
        nav.descend(0);
        nav.descend(0);
        nav.apply_fetch(
            ViewKey::Containers,
            Ok(FetchData::Containers(containers_fixture())),
        );

        let effect = nav.descend(0);

        assert_eq!(nav.key, ViewKey::ContainerLogs);
        assert_eq!(
            nav.context.container,
            Some(Container::new("default", "p1", "c1"))
        );
        assert_eq!(
            effect,
            Some(Effect::OpenStream {
                view: ViewKey::ContainerLogs,
                container: Container::new("default", "p1", "c1"),
            })
        );
    }

    #[test]
    fn descend_then_ascend_round_trips_every_parented_view() {
        for key in [
            ViewKey::ApiChoice,
            ViewKey::Containers,
            ViewKey::ContainerLogs,
            ViewKey::CronJobs,
            ViewKey::CronJobJobs,
            ViewKey::CronJobContainers,
            ViewKey::CronJobLogs,
        ] {
            let parent = key.parent().expect("parented view");

            let mut nav = Navigator::new();
            nav.key = parent;
            nav.context.namespace = Some("default".to_string());
            nav.context.cron_job = Some(cron_job_fixture());
            nav.store.namespaces = vec!["default".to_string()];
            nav.store.containers = containers_fixture();
            nav.store.cron_jobs = vec![cron_job_fixture()];
            nav.store.job_containers = containers_fixture();

            // Pick the index that reaches `key` from its parent; the api
            // choice forks, so the cron branch descends at index 1.
            let index = match key {
                ViewKey::CronJobs => 1,
                _ => 0,
            };

            // A fetch may still be in flight; the round trip must hold
            // regardless.
            nav.descend(index);
            assert_eq!(nav.key, key, "descend from {parent:?}");
            nav.ascend();
            assert_eq!(nav.key, parent, "ascend back to {parent:?}");
        }
    }

    #[test]
    fn ascend_at_root_is_a_no_op() {
        let mut nav = fixture();

        assert_eq!(nav.ascend(), None);
        assert_eq!(nav.key, ViewKey::Namespaces);
    }

    #[test]
    fn descend_on_log_leaf_is_a_no_op() {
        let mut nav = fixture();
        nav.key = ViewKey::ContainerLogs;

        assert_eq!(nav.descend(0), None);
        assert_eq!(nav.key, ViewKey::ContainerLogs);
    }

    #[test]
    fn ascending_from_logs_closes_the_stream() {
        let mut nav = fixture();
        nav.key = ViewKey::CronJobLogs;

        assert_eq!(nav.ascend(), Some(Effect::CloseStream));
        assert_eq!(nav.key, ViewKey::CronJobContainers);
    }

    #[test]
    fn stale_fetch_result_does_not_mutate_state() {
        let mut nav = fixture();
        nav.descend(0);
        nav.descend(0); // Containers, fetch in flight
        nav.ascend(); // back before the result lands

        nav.apply_fetch(
            ViewKey::Containers,
            Ok(FetchData::Containers(containers_fixture())),
        );

        assert_eq!(nav.key, ViewKey::ApiChoice);
        assert!(nav.store.containers.is_empty());
        assert!(nav.error.is_none());
    }

    #[test]
    fn fetch_error_raises_modal_overlay_without_moving() {
        let mut nav = fixture();
        nav.descend(0);
        nav.descend(0);

        nav.apply_fetch(ViewKey::Containers, Err(anyhow::anyhow!("boom")));

        assert_eq!(nav.key, ViewKey::Containers);
        assert_eq!(nav.context.namespace.as_deref(), Some("default"));
        assert!(nav.error.as_deref().is_some_and(|e| e.contains("boom")));
        assert!(!nav.loading);
    }

    #[test]
    fn dismissing_error_returns_to_parent_view() {
        let mut nav = fixture();
        nav.descend(0);
        nav.descend(0);
        nav.apply_fetch(ViewKey::Containers, Err(anyhow::anyhow!("boom")));

        nav.dismiss_error();

        assert!(nav.error.is_none());
        assert_eq!(nav.key, ViewKey::ApiChoice);
    }

    #[test]
    #[should_panic(expected = "does not belong to view")]
    fn mismatched_payload_for_current_view_panics() {
        let mut nav = fixture();
        nav.apply_fetch(
            ViewKey::Namespaces,
            Ok(FetchData::Containers(containers_fixture())),
        );
    }

    #[test]
    fn cron_job_jobs_are_embedded_not_fetched() {
        let mut nav = fixture();
        nav.descend(0);
        nav.descend(1); // cronJobs api
        nav.apply_fetch(ViewKey::CronJobs, Ok(FetchData::CronJobs(vec![cron_job_fixture()])));

        let effect = nav.descend(0);

        assert_eq!(effect, None);
        assert_eq!(nav.key, ViewKey::CronJobJobs);
        assert_eq!(nav.item_count(), 1);
    }

    #[test]
    fn job_containers_fetch_uses_job_name_selector() {
        let mut nav = fixture();
        nav.descend(0);
        nav.descend(1);
        nav.apply_fetch(ViewKey::CronJobs, Ok(FetchData::CronJobs(vec![cron_job_fixture()])));
        nav.descend(0);

        let effect = nav.descend(0);

        assert_eq!(
            effect,
            Some(Effect::Fetch(FetchRequest {
                view: ViewKey::CronJobContainers,
                call: ProviderCall::ListContainers {
                    namespace: "default".to_string(),
                    selector: Some("job-name=nightly-1".to_string()),
                },
            }))
        );
    }

    #[test]
    fn refresh_on_jobs_view_replaces_embedded_jobs() {
        let mut nav = fixture();
        nav.descend(0);
        nav.descend(1);
        nav.apply_fetch(ViewKey::CronJobs, Ok(FetchData::CronJobs(vec![cron_job_fixture()])));
        nav.descend(0);

        let effect = nav.refresh();
        assert_eq!(
            effect,
            Some(Effect::Fetch(FetchRequest {
                view: ViewKey::CronJobJobs,
                call: ProviderCall::ListJobs {
                    namespace: "default".to_string(),
                    owner: "nightly".to_string(),
                },
            }))
        );

        nav.apply_fetch(
            ViewKey::CronJobJobs,
            Ok(FetchData::Jobs(vec![
                Job {
                    namespace: "default".to_string(),
                    name: "nightly-1".to_string(),
                },
                Job {
                    namespace: "default".to_string(),
                    name: "nightly-2".to_string(),
                },
            ])),
        );

        assert_eq!(nav.item_count(), 2);
    }

    #[test]
    fn context_survives_ascent_and_is_overwritten_on_redescent() {
        let mut nav = fixture();
        nav.descend(0);
        assert_eq!(nav.context.namespace.as_deref(), Some("default"));

        nav.ascend();
        assert_eq!(nav.context.namespace.as_deref(), Some("default"));

        nav.descend(1);
        assert_eq!(nav.context.namespace.as_deref(), Some("kube-system"));
    }

    #[test]
    fn stale_log_entry_is_dropped() {
        let mut nav = fixture();
        nav.key = ViewKey::ContainerLogs;

        nav.apply_log_entry(
            ViewKey::CronJobLogs,
            LogEntry {
                raw: "late".to_string(),
                ..Default::default()
            },
        );

        assert!(nav.store.cron_job_logs.is_empty());
        assert!(nav.store.container_logs.is_empty());
    }
}
