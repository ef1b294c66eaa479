pub mod handlers;
pub mod orchestrator;
pub mod routes;

pub use orchestrator::{LookupError, RedirectTarget, Redirector};
pub use routes::create_redirect_router;
