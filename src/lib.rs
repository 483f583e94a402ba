#![doc(test(attr(deny(warnings))))]

//! Kharch splits shared expenses and works out who should pay whom.
//!
//! The settlement engine lives in `kharch-core`; this crate wires it to the
//! JSON store and user config and renders reports for the CLI.

pub mod errors;
pub mod report;
pub mod session;
pub mod utils;

pub use kharch_config as config;
pub use kharch_core as core;
pub use kharch_domain as domain;
pub use kharch_storage_json as storage;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Kharch tracing initialized.");
    });
}
