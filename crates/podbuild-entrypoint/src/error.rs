use std::path::PathBuf;

use thiserror::Error;

/// Exit code of the step runner when it fails itself, as opposed to the
/// wrapped command failing.
pub const INTERNAL_FAULT_EXIT_CODE: i32 = 125;

/// Local faults of the step runner. Each one is fatal to the unit.
#[derive(Error, Debug)]
pub enum EntrypointError {
    #[error("waiting for {}: {}", .path.display(), .source)]
    Wait {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("executing {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("creating {}: {}", .path.display(), .source)]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
