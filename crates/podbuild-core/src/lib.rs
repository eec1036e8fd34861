//! podbuild core
//!
//! Turns a declarative build into a single pod whose init containers run the
//! build's steps strictly in order, and folds the pod's reported status back
//! into one build outcome:
//! - [`pod::from_build`]: credential init, source fetch and user steps as init containers
//! - [`status::from_pod`]: Succeeded / Failed / Unknown plus per-step state
//! - [`executor::SequenceExecutor`]: the orchestrator's "run in order, stop on failure" contract

pub mod accounts;
pub mod config;
pub mod creds;
pub mod error;
pub mod executor;
pub mod pod;
pub mod status;
pub mod telemetry;

// Re-export key types
pub use accounts::{AccountLookup, StaticAccounts};
pub use config::BuildConfig;
pub use error::{BuildError, ExecutorError, LookupError, ValidationError, ValidationReason};
pub use executor::{LocalExecutor, SequenceExecutor};
pub use pod::{from_build, to_build_spec};
pub use status::from_pod;
pub use telemetry::init_tracing;

/// podbuild version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
