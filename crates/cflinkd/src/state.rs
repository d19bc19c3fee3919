use std::sync::Arc;

use cflink_core::{Reconciler, RecordManager, Services};
use tokio::sync::Mutex;

use crate::auth::jwt::JwtConfig;

/// Shared state available to all handlers via `State<AppState>`.
///
/// Cheap to clone; everything inside is behind an `Arc` or is a handle.
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub reconciler: Reconciler,
    pub records: RecordManager,
    pub jwt: Arc<JwtConfig>,
    /// Serializes first-run setup so only one admin can be created
    pub setup_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(services: Services, jwt: JwtConfig) -> Self {
        Self {
            reconciler: Reconciler::new(services.clone()),
            records: RecordManager::new(services.clone()),
            services,
            jwt: Arc::new(jwt),
            setup_lock: Arc::new(Mutex::new(())),
        }
    }
}
