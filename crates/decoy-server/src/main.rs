use clap::Parser;
use decoy_server::api::ApiServer;
use decoy_server::grpc::GrpcListenerManager;
use decoy_server::session::SessionRegistry;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "decoy-server", about = "Session-scoped HTTP/gRPC test double", version)]
struct Args {
    /// Port for the configuration API and intercepted HTTP traffic
    #[arg(short, long, default_value_t = 8080, env = "DECOY_PORT")]
    port: u16,
    /// Bind address for the HTTP server
    #[arg(long, default_value = "0.0.0.0", env = "DECOY_HOST")]
    host: IpAddr,
    /// Bind address for per-session gRPC listeners
    #[arg(long, default_value = "127.0.0.1", env = "DECOY_GRPC_HOST")]
    grpc_host: IpAddr,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing();

    let registry = Arc::new(SessionRegistry::new(GrpcListenerManager::new(
        args.grpc_host,
    )));
    let server = ApiServer::bind(SocketAddr::new(args.host, args.port), registry).await?;
    server.run().await
}
