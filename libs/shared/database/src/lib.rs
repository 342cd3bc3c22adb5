pub mod supabase;

use std::sync::Arc;

use shared_config::AppConfig;

pub use supabase::{DbError, SupabaseClient};

/// Process-wide state built once at startup and injected into every cell.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: Arc<SupabaseClient>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let db = Arc::new(SupabaseClient::new(&config));
        Self { config, db }
    }
}
