mod config;
mod handlers;
mod prefs;
mod state;
mod status;
mod worker;

use axum::{
    Router,
    routing::{get, post},
};
use local_ip_address::local_ip;
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use tracing::{Level, info};

use crate::config::Settings;
use crate::handlers::{api, web};
use crate::prefs::PrefsStore;
use crate::state::AppState;
use crate::status::StatusStore;
use crate::worker::WorkerRegistry;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let settings = Settings::new().expect("Failed to load configuration");

    tracing_subscriber::fmt()
        .with_env_filter(&settings.log_level)
        .init();

    info!("Starting tubedeck...");

    if !settings.data_dir.exists() {
        std::fs::create_dir_all(&settings.data_dir).expect("Failed to create data directory");
    }

    let state = AppState {
        prefs: PrefsStore::new(&settings.data_dir),
        statuses: StatusStore::new(),
        workers: WorkerRegistry::new(),
        settings: settings.clone(),
    };

    let app = create_app(state);

    let port = settings.server_port;
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let local_ip = local_ip().unwrap_or("127.0.0.1".parse().unwrap());
    info!("Listening on http://{}", addr);
    info!("Network address: http://{}:{}", local_ip, port);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(web::index).post(web::submit))
        .route("/status", get(api::status))
        .route("/cancel/{id}", post(api::cancel))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(tower_http::trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(tower_http::trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
