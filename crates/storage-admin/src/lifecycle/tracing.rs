//! # Tracing
//!
//! [`setup_tracing`] installs a compact subscriber filtered by `RUST_LOG`.
//!
//! ## Usage
//!
//! ```bash
//! # Loads, mutations and the refresh wave
//! RUST_LOG=info cargo run -p storage-admin
//!
//! # Request bodies, cache hits and subscriptions
//! RUST_LOG=debug cargo run -p storage-admin
//!
//! # Only the cache machinery
//! RUST_LOG=cache_framework=debug cargo run -p storage-admin
//! ```
//!
//! ## What gets logged
//!
//! - **Cache lifecycle**: start and shutdown of the cache actor
//! - **Loads**: every fetch with its `resource`, `endpoint` and `flight`, and
//!   whether it was committed or superseded
//! - **Mutations**: each coordinator operation as a span, the submitted
//!   `endpoint` and the consumers refreshed afterwards
//! - **Errors**: failed fetches and refreshes with the server's message
//!
//! With `RUST_LOG=info` a business switch reads:
//!
//! ```text
//! INFO switch_business{candidate="Acme"}: Switched business business="Acme"
//! INFO Fetch resource="active_business" endpoint="/get_storage_info/id/Acme" flight=4
//! INFO Loaded resource="active_business" fresh=true
//! INFO Fetch resource="storage_statistics" endpoint="/get_statistics/id/Acme" flight=5
//! INFO Loaded resource="storage_statistics" fresh=true
//! ```
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
