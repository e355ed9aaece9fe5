use anyhow::Result;
use futures::StreamExt;
use futures::io::AsyncBufReadExt;
use futures::stream::BoxStream;
use k8s_openapi::api::batch::v1::Job as BatchJob;
use k8s_openapi::api::core::v1::{Namespace, Pod};
use kube::api::{ListParams, LogParams};
use kube::{Api, Client, ResourceExt};
use std::collections::BTreeMap;
use std::future::Future;

use crate::types::{Container, CronJob, Job};

/// A follow-stream of raw log lines, already split on newlines.
pub type LogLines = BoxStream<'static, std::io::Result<String>>;

/// The capability set the navigation core consumes. The kube-backed
/// implementation below is the only one outside tests; the trait exists
/// so the dispatcher and the end-to-end scenarios can run against an
/// in-memory provider.
pub trait ResourceProvider: Clone + Send + Sync + 'static {
    fn list_namespaces(&self) -> impl Future<Output = Result<Vec<String>>> + Send;

    fn list_containers(
        &self,
        namespace: &str,
        label_selector: Option<&str>,
    ) -> impl Future<Output = Result<Vec<Container>>> + Send;

    fn list_cron_jobs(&self, namespace: &str) -> impl Future<Output = Result<Vec<CronJob>>> + Send;

    fn list_jobs(
        &self,
        namespace: &str,
        owner: &str,
    ) -> impl Future<Output = Result<Vec<Job>>> + Send;

    /// One-shot read of the last `tail_lines` lines.
    fn get_log_tail(
        &self,
        container: &Container,
        tail_lines: i64,
    ) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Open a following stream starting `tail_lines` back. Fails fast if
    /// the stream cannot be established.
    fn open_log_stream(
        &self,
        container: &Container,
        tail_lines: i64,
    ) -> impl Future<Output = Result<LogLines>> + Send;
}

#[derive(Clone)]
pub struct KubeProvider {
    client: Client,
}

impl KubeProvider {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

impl ResourceProvider for KubeProvider {
    async fn list_namespaces(&self) -> Result<Vec<String>> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let list = api.list(&ListParams::default()).await?;

        Ok(list.items.iter().map(|ns| ns.name_any()).collect())
    }

    async fn list_containers(
        &self,
        namespace: &str,
        label_selector: Option<&str>,
    ) -> Result<Vec<Container>> {
        let mut lp = ListParams::default();
        if let Some(selector) = label_selector {
            lp = lp.labels(selector);
        }

        let list = self.pods(namespace).list(&lp).await?;

        let mut containers = Vec::new();
        for pod in list.items {
            let pod_name = pod.name_any();
            let pod_namespace = pod.namespace().unwrap_or_else(|| namespace.to_string());

            match &pod.spec {
                Some(spec) if !spec.containers.is_empty() => {
                    for container in &spec.containers {
                        containers.push(Container::new(
                            pod_namespace.clone(),
                            pod_name.clone(),
                            container.name.clone(),
                        ));
                    }
                }
                // A pod with no listed containers still gets a row so the
                // user can see it exists.
                _ => containers.push(Container::new(pod_namespace, pod_name, "")),
            }
        }

        Ok(containers)
    }

    async fn list_cron_jobs(&self, namespace: &str) -> Result<Vec<CronJob>> {
        let api: Api<BatchJob> = Api::namespaced(self.client.clone(), namespace);
        let list = api.list(&ListParams::default()).await?;

        // CronJobs are reconstructed from the jobs that reference them as
        // owner, so each CronJob arrives with its jobs embedded. BTreeMap
        // keeps the output sorted by name.
        let mut grouped: BTreeMap<String, CronJob> = BTreeMap::new();

        for job in list.items {
            let job_namespace = job.namespace().unwrap_or_else(|| namespace.to_string());
            let job_name = job.name_any();

            for owner in job.owner_references() {
                if owner.kind != "CronJob" {
                    continue;
                }

                grouped
                    .entry(owner.name.clone())
                    .or_insert_with(|| CronJob {
                        namespace: job_namespace.clone(),
                        name: owner.name.clone(),
                        jobs: Vec::new(),
                    })
                    .jobs
                    .push(Job {
                        namespace: job_namespace.clone(),
                        name: job_name.clone(),
                    });
            }
        }

        Ok(grouped.into_values().collect())
    }

    async fn list_jobs(&self, namespace: &str, owner: &str) -> Result<Vec<Job>> {
        let api: Api<BatchJob> = Api::namespaced(self.client.clone(), namespace);
        let list = api.list(&ListParams::default()).await?;

        let jobs = list
            .items
            .iter()
            .filter(|job| {
                job.owner_references()
                    .iter()
                    .any(|r| r.kind == "CronJob" && r.name == owner)
            })
            .map(|job| Job {
                namespace: job.namespace().unwrap_or_else(|| namespace.to_string()),
                name: job.name_any(),
            })
            .collect();

        Ok(jobs)
    }

    async fn get_log_tail(&self, container: &Container, tail_lines: i64) -> Result<Vec<String>> {
        let lp = LogParams {
            container: some_container_name(container),
            tail_lines: Some(tail_lines),
            ..Default::default()
        };

        let body = self
            .pods(&container.namespace)
            .logs(&container.pod, &lp)
            .await?;

        Ok(body
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn open_log_stream(&self, container: &Container, tail_lines: i64) -> Result<LogLines> {
        let lp = LogParams {
            follow: true,
            container: some_container_name(container),
            tail_lines: Some(tail_lines),
            ..Default::default()
        };

        let stream = self
            .pods(&container.namespace)
            .log_stream(&container.pod, &lp)
            .await?;

        Ok(stream.lines().boxed())
    }
}

// Single-container pods may be listed with an empty container name; the
// log API then wants the field omitted entirely.
fn some_container_name(container: &Container) -> Option<String> {
    if container.name.is_empty() {
        None
    } else {
        Some(container.name.clone())
    }
}
