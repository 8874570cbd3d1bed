//! Request handling: per-request context, orchestration, and intake dispatch.

mod context;
mod dispatcher;
mod orchestrator;

pub use context::{Outcome, RequestContext, Stage};
pub use dispatcher::Dispatcher;
pub use orchestrator::RequestOrchestrator;
