use std::net::SocketAddr;
use std::process;

use tracing_subscriber::EnvFilter;
use tracklet_api::IssueService;
use tracklet_api::http::{HttpServer, HttpServerConfig};
use tracklet_store::JsonlProjectStore;

pub fn run(bind: String, store: String) {
    init_tracing();

    let bind_addr: SocketAddr = bind.parse().unwrap_or_else(|e| {
        eprintln!("error: invalid --bind address `{bind}`: {e}");
        process::exit(1);
    });

    let config = HttpServerConfig { bind: bind_addr };
    let service = IssueService::new(JsonlProjectStore::new(&store));
    let server = HttpServer::bind(&config, service).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        process::exit(1);
    });

    println!("tracklet serve");
    println!("  bind: {bind_addr}");
    println!("  store: {store}");
    println!("  routes:");
    println!("    GET /healthz");
    println!("    GET /api/issues/{{project}}");
    println!("    POST /api/issues/{{project}}");
    println!("    PUT /api/issues/{{project}}");
    println!("    DELETE /api/issues/{{project}}");
    tracing::info!(bind = %bind_addr, store = %store, "issue api listening");

    if let Err(e) = server.serve() {
        eprintln!("error: issue api failed: {e}");
        process::exit(1);
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("TRACKLET_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
