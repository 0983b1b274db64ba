pub mod config;
pub mod controllers;
pub mod error;
pub mod models;
pub mod seating;
pub mod store;
pub mod venue;

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::seating::{Operator, PolicyOperator, SeatingEngine};
use crate::store::{MemoryBackend, MemoryStore, RedisBackend, RedisStore, SeatStore};
use crate::venue::Venue;

// Shared state для всего приложения
pub struct AppState {
    pub store: Arc<dyn SeatStore>,
    pub operator: Arc<dyn Operator>,
    pub venue: Venue,
    pub config: config::Config,
    /// Одновременно идёт не больше одного прогона
    pub run_lock: Mutex<()>,
}

impl AppState {
    pub async fn new(config: config::Config) -> anyhow::Result<Arc<Self>> {
        let store: Arc<dyn SeatStore> = match config.redis.url.as_deref() {
            Some(url) => {
                let backend = RedisBackend::connect(url).await?;
                info!("Redis connected");
                Arc::new(RedisStore::new(backend))
            }
            None => {
                warn!("REDIS_URL is not set, running offline with in-memory storage");
                Arc::new(MemoryStore::new(MemoryBackend::default()))
            }
        };
        let operator: Arc<dyn Operator> = Arc::new(PolicyOperator::new(config.seating.operator_policy));
        Ok(Arc::new(Self::with_parts(store, operator, Venue::theater(), config)))
    }

    pub fn with_parts(
        store: Arc<dyn SeatStore>,
        operator: Arc<dyn Operator>,
        venue: Venue,
        config: config::Config,
    ) -> Self {
        Self {
            store,
            operator,
            venue,
            config,
            run_lock: Mutex::new(()),
        }
    }

    pub fn engine(&self) -> SeatingEngine {
        SeatingEngine::new(self.store.clone(), self.operator.clone(), self.venue.clone())
    }
}
