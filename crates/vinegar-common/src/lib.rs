//! Shared plumbing for the Vinegar layer and its helper binaries.

pub mod logging;

pub use logging::{init_layer_logging, init_logging};
