pub mod health;
pub mod models;
pub mod relay;

pub use health::{HealthResponse, health_check};
pub use models::list_models;
pub use relay::{ActionRequest, DONE_EVENT, relay_action};
