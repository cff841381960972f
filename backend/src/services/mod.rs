pub mod generation;
pub mod resync;

use crate::config::EngineConfig;
use crate::engine::store::SqliteJobStore;
use crate::google::sheets::SheetsApiClient;
use crate::google::slides::SlidesApiClient;
use std::sync::Arc;

/// Shared collaborators, built once in `main.rs` and injected as
/// `web::Data<AppContext>`. Handlers hand these to the engine as trait
/// objects; the engine never constructs its own collaborators.
pub struct AppContext {
    pub store: Arc<SqliteJobStore>,
    pub slides: Arc<SlidesApiClient>,
    pub sheets: Arc<SheetsApiClient>,
    pub config: EngineConfig,
}
