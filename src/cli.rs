use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "kube-drill")]
#[command(about = "Drill into Kubernetes namespaces and workloads and tail structured logs")]
pub struct Cli {
    /// Path to a kubeconfig file (defaults to the standard lookup)
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// Namespace for direct tailing (with --pod and --container skips the TUI)
    #[arg(short = 'n', long)]
    pub namespace: Option<String>,

    /// Pod for direct tailing
    #[arg(short = 'p', long)]
    pub pod: Option<String>,

    /// Container for direct tailing
    #[arg(short = 'c', long)]
    pub container: Option<String>,

    /// Number of historical lines to request when tailing
    #[arg(long, default_value_t = 10)]
    pub tail: i64,

    /// Print the current tail and exit instead of following
    #[arg(long)]
    pub no_follow: bool,

    /// Force plain stdout output even on a terminal
    #[arg(long)]
    pub no_tui: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// The container addressed by --namespace/--pod/--container, if all
    /// three were given.
    pub fn direct_target(&self) -> Option<crate::types::Container> {
        match (&self.namespace, &self.pod, &self.container) {
            (Some(namespace), Some(pod), Some(container)) => Some(
                crate::types::Container::new(namespace.clone(), pod.clone(), container.clone()),
            ),
            _ => None,
        }
    }
}
