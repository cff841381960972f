use actix_web::{web, App, HttpServer};
use backend::config::EngineConfig;
use backend::engine::store::SqliteJobStore;
use backend::google::auth::EnvAccessToken;
use backend::google::sheets::SheetsApiClient;
use backend::google::slides::SlidesApiClient;
use backend::job_controller;
use backend::job_controller::state::JobsState;
use backend::services::{self, AppContext};
use env_logger::Env;
use log::info;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

const DB_PATH: &str = "slidegen.sqlite";

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(Env::default().default_filter_or("info"));
    let host = "127.0.0.1";
    let port = 8080;

    let store = Arc::new(
        SqliteJobStore::open(DB_PATH)
            .map_err(|e| std::io::Error::other(e.to_string()))?,
    );
    let tokens = Arc::new(EnvAccessToken::new());
    let context = web::Data::new(AppContext {
        store,
        slides: Arc::new(SlidesApiClient::new(tokens.clone())),
        sheets: Arc::new(SheetsApiClient::new(tokens)),
        config: EngineConfig::from_env(),
    });

    // Initialize job controller state
    let (tx, rx) = mpsc::channel(100);
    let jobs_state = JobsState {
        jobs: Arc::new(RwLock::new(HashMap::new())),
        tx,
    };

    // Start job updater task
    let updater_state = jobs_state.clone();
    tokio::spawn(async move {
        job_controller::state::start_job_updater(updater_state, rx).await;
    });

    info!("Server running at http://{}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::JsonConfig::default().limit(10 * 1024 * 1024)) // 10 MB
            .app_data(web::Data::new(jobs_state.clone()))
            .app_data(context.clone())
            .service(services::generation::configure_routes())
            .service(services::resync::configure_routes())
    })
    .bind((host, port))?
    .run()
    .await
}
