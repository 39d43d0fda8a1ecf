pub mod config;
pub mod error;
pub mod events;
pub mod handlers;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod pagination;
pub mod repository;
pub mod response;
pub mod server;
pub mod services;
pub mod tasks;
pub mod validator;

use std::sync::Arc;

use config::Config;
use events::EventBus;
use metrics::Monitor;
use repository::{MemoryProductRepository, MemoryUserRepository};
use services::{ProductService, UserService};

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    pub config: Arc<Config>,

    /// Process-wide event bus. Producers and consumers get it from here
    /// rather than from a global.
    pub bus: Arc<EventBus>,

    /// Aggregates lifecycle events; read by the metrics endpoints.
    pub monitor: Arc<Monitor>,

    pub users: UserService,
    pub products: ProductService,
}

impl AppState {
    /// Wire the bus, monitor and in-memory services together. The monitor
    /// and the system loggers are subscribed before this returns.
    pub fn new(config: Config) -> Self {
        let bus = Arc::new(EventBus::new());
        events::register_system_loggers(&bus);

        let monitor = Arc::new(
            Monitor::with_recorder(config.monitor.sample_recorder)
                .with_route_key(config.monitor.route_key),
        );
        monitor.attach(&bus);

        let users = UserService::new(Arc::new(MemoryUserRepository::new()), Arc::clone(&bus));
        let products =
            ProductService::new(Arc::new(MemoryProductRepository::new()), Arc::clone(&bus));

        Self {
            config: Arc::new(config),
            bus,
            monitor,
            users,
            products,
        }
    }
}
