use std::sync::Arc;

use crate::db::WeatherStore;
use crate::services::pipeline::Providers;

pub mod health;
pub mod proxy;
pub mod weather;

/// Shared application state for all endpoints.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) store: Arc<dyn WeatherStore>,
    pub(crate) providers: Providers,
}
