//! Command Processing
//!
//! ```text
//! decoded args ──> validator ──> table lookup ──> handler fn ──> Reply
//! ```
//!
//! - [`table`]: one [`table::CommandSpec`] per verb (arity, numeric
//!   positions, handler)
//! - [`validator`]: checks a command against its spec before any store access
//! - [`handler`]: the [`CommandHandler`] dispatcher and the per-verb handlers

pub mod handler;
pub mod table;
pub mod validator;

pub use handler::CommandHandler;
pub use validator::{validate, validate_raw};
