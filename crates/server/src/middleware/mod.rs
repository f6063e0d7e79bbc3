pub mod auth;
pub mod loaders;

pub use auth::{RequestContext, require_session};
pub use loaders::*;
