use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::debug;

use crate::kubernetes::ResourceProvider;
use crate::nav::ViewKey;
use crate::types::{Container, CronJob, Job};
use crate::ui::events::AppEvent;

/// One outbound fetch, tagged with the view it was issued for so the
/// consumer can reject results that arrive after the view changed.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub view: ViewKey,
    pub call: ProviderCall,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProviderCall {
    ListNamespaces,
    ListContainers {
        namespace: String,
        selector: Option<String>,
    },
    ListCronJobs {
        namespace: String,
    },
    ListJobs {
        namespace: String,
        owner: String,
    },
}

/// Successful fetch payload. One variant per provider listing; the
/// (view, variant) pairing is checked at the point of application.
#[derive(Debug, PartialEq)]
pub enum FetchData {
    Namespaces(Vec<String>),
    Containers(Vec<Container>),
    CronJobs(Vec<CronJob>),
    Jobs(Vec<Job>),
}

/// Spawn the dispatcher worker: one long-lived task that services fetch
/// requests in arrival order and emits exactly one tagged result per
/// request. A failed call is forwarded as an error value; the worker
/// keeps servicing subsequent requests.
pub fn spawn_dispatcher<P: ResourceProvider>(
    provider: P,
    mut requests: mpsc::Receiver<FetchRequest>,
    events: mpsc::Sender<AppEvent>,
) -> AbortHandle {
    let handle = tokio::spawn(async move {
        while let Some(request) = requests.recv().await {
            debug!(view = ?request.view, call = ?request.call, "dispatching fetch");
            let result = execute(&provider, &request.call).await;
            let event = AppEvent::Fetch {
                view: request.view,
                result,
            };
            if events.send(event).await.is_err() {
                break;
            }
        }
    });

    handle.abort_handle()
}

async fn execute<P: ResourceProvider>(provider: &P, call: &ProviderCall) -> Result<FetchData> {
    match call {
        ProviderCall::ListNamespaces => {
            provider.list_namespaces().await.map(FetchData::Namespaces)
        }
        ProviderCall::ListContainers {
            namespace,
            selector,
        } => provider
            .list_containers(namespace, selector.as_deref())
            .await
            .map(FetchData::Containers),
        ProviderCall::ListCronJobs { namespace } => provider
            .list_cron_jobs(namespace)
            .await
            .map(FetchData::CronJobs),
        ProviderCall::ListJobs { namespace, owner } => provider
            .list_jobs(namespace, owner)
            .await
            .map(FetchData::Jobs),
    }
}
