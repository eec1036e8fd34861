//! podbuild step runner
//!
//! Runs inside every unit of a build pod. Units share a volume but have no
//! other channel to each other, so ordering between them is expressed with
//! signal files whose existence is the only information they carry:
//! - wait until the predecessor's file exists
//! - run the step's command, forwarding its output and exit code
//! - create this unit's own file once the command succeeded

pub mod entrypointer;
pub mod error;
pub mod post_writer;
pub mod runner;
pub mod waiter;

pub use entrypointer::Entrypointer;
pub use error::{EntrypointError, INTERNAL_FAULT_EXIT_CODE};
pub use post_writer::{FilePostWriter, PostWriter};
pub use runner::{ProcessRunner, Runner};
pub use waiter::{FileWaiter, Waiter, DEFAULT_POLL_INTERVAL};
