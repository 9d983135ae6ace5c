//! Registry server: authoritative registration list, patch broadcast, and
//! heartbeat supervision.

mod heartbeat;
mod http;
mod store;

pub use heartbeat::HeartbeatMonitor;
pub use http::{create_router, SERVICES_PATH};
pub use store::ServiceRegistry;
