//! launchgate
//!
//! Session bootstrap and navigation gate. The domain lives in the `lg-*`
//! crates; this crate holds the bootstrap layer (config, tracing, wiring)
//! and the console harness.

pub mod bootstrap;

pub use bootstrap::{init_tracing_subscriber, load_or_default, resolve_settings, run_app};
