//! # Observability
//!
//! Structured logging for the Depot node. HTTP requests are traced by the
//! `TraceLayer` installed in [`crate::api::create_router`].
//!
//! ```rust,ignore
//! use depot_node::observability::{init_logging, LogFormat};
//!
//! init_logging("info", LogFormat::parse("json"));
//! ```

mod logging;

pub use logging::{init_logging, LogFormat};
