//! Wires `kube::runtime::Controller` to the `Request` and `DisposableRequest`
//! reconcilers. No leader election: a single active reconciler per resource
//! is assumed, so `--leader-election-namespace` is accepted for
//! forward-compatibility and otherwise unused.
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use futures::StreamExt;
use kube::runtime::controller::Controller;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::{Api, Client, ResourceExt};
use provider_http_api::{DisposableRequest, Request};
use provider_http_runtime::reconcile::{disposable, request, Context};
use provider_http_runtime::secret_store::KubeSecretStore;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Run the provider-http reconcilers against the cluster the kubeconfig
/// points at.
#[derive(Parser, Debug)]
#[command(name = "provider-http", version)]
struct Cli {
    /// Address the health/metrics endpoint binds to.
    #[arg(long, env = "METRICS_ADDR", default_value = "0.0.0.0:8080")]
    metrics_addr: String,

    /// Maximum number of reconciles run concurrently per controller.
    #[arg(long, env = "CONCURRENCY", default_value_t = 10)]
    concurrency: u16,

    /// Fallback poll interval for `DisposableRequest` when `nextReconcile`
    /// is unset.
    #[arg(long, env = "REQUEUE_DEFAULT_SECONDS", default_value_t = 30)]
    requeue_default: u64,

    /// Accepted for forward-compatibility; leader election is not
    /// implemented.
    #[arg(long, env = "LEADER_ELECTION_NAMESPACE")]
    #[allow(dead_code)]
    leader_election_namespace: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    info!(metrics_addr = %cli.metrics_addr, concurrency = cli.concurrency, "starting provider-http");

    let client = Client::try_default().await?;
    let secrets = KubeSecretStore::new(client.clone());
    let ctx = Arc::new(Context {
        client: client.clone(),
        secrets,
        requeue_default: Duration::from_secs(cli.requeue_default),
    });

    let requests: Api<Request> = Api::all(client.clone());
    let disposables: Api<DisposableRequest> = Api::all(client.clone());
    let concurrency = cli.concurrency as usize;

    let request_controller = Controller::new(requests, WatcherConfig::default())
        .shutdown_on_signal()
        .run(request::reconcile, request_error_policy, ctx.clone())
        .for_each_concurrent(concurrency, |result| async move {
            match result {
                Ok((obj_ref, _action)) => info!(object = %obj_ref.name, "request reconciled"),
                Err(err) => error!(error = %err, "request reconcile failed"),
            }
        });

    let disposable_controller = Controller::new(disposables, WatcherConfig::default())
        .shutdown_on_signal()
        .run(disposable::reconcile, disposable_error_policy, ctx)
        .for_each_concurrent(concurrency, |result| async move {
            match result {
                Ok((obj_ref, _action)) => info!(object = %obj_ref.name, "disposable request reconciled"),
                Err(err) => error!(error = %err, "disposable request reconcile failed"),
            }
        });

    tokio::join!(request_controller, disposable_controller);
    info!("all controllers have shut down");
    Ok(())
}

fn request_error_policy<S: provider_http_runtime::secret_store::SecretStore>(
    obj: Arc<Request>,
    err: &provider_http_runtime::Error,
    _ctx: Arc<Context<S>>,
) -> kube::runtime::controller::Action {
    error!(object = %obj.name_any(), error = %err, "request reconcile error");
    kube::runtime::controller::Action::requeue(Duration::from_secs(30))
}

fn disposable_error_policy<S: provider_http_runtime::secret_store::SecretStore>(
    obj: Arc<DisposableRequest>,
    err: &provider_http_runtime::Error,
    _ctx: Arc<Context<S>>,
) -> kube::runtime::controller::Action {
    error!(object = %obj.name_any(), error = %err, "disposable request reconcile error");
    kube::runtime::controller::Action::requeue(Duration::from_secs(30))
}
