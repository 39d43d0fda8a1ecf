//! Request pipeline, outermost first: request id, logger, lifecycle emitter,
//! response formatter, panic recovery. Auth is per route group.

pub mod auth;
pub mod formatter;
pub mod lifecycle;
pub mod logger;
pub mod recovery;
pub mod request_id;

pub use auth::CallerIdentity;
pub use lifecycle::{LifecycleEmitter, RequestEvent};
pub use request_id::{RequestId, REQUEST_ID_HEADER};
