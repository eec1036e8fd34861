//! The wait → run → post sequence of one unit.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::error::EntrypointError;
use crate::post_writer::{FilePostWriter, PostWriter};
use crate::runner::{ProcessRunner, Runner};
use crate::waiter::{FileWaiter, Waiter};

/// One unit's step runner.
///
/// `entrypoint`, when set, is placed in front of `args` to form the command
/// line. An empty `wait_file` or `post_file` skips that phase.
pub struct Entrypointer<W = FileWaiter, R = ProcessRunner, P = FilePostWriter> {
    pub entrypoint: String,
    pub args: Vec<String>,
    pub wait_file: PathBuf,
    pub post_file: PathBuf,
    pub waiter: W,
    pub runner: R,
    pub post_writer: P,
}

impl Entrypointer {
    pub fn new(entrypoint: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            entrypoint: entrypoint.into(),
            args,
            wait_file: PathBuf::new(),
            post_file: PathBuf::new(),
            waiter: FileWaiter::default(),
            runner: ProcessRunner,
            post_writer: FilePostWriter,
        }
    }
}

impl<W, R, P> Entrypointer<W, R, P> {
    pub fn with_wait_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.wait_file = path.into();
        self
    }

    pub fn with_post_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.post_file = path.into();
        self
    }

    pub fn with_waiter<W2>(self, waiter: W2) -> Entrypointer<W2, R, P> {
        Entrypointer {
            entrypoint: self.entrypoint,
            args: self.args,
            wait_file: self.wait_file,
            post_file: self.post_file,
            waiter,
            runner: self.runner,
            post_writer: self.post_writer,
        }
    }

    pub fn with_runner<R2>(self, runner: R2) -> Entrypointer<W, R2, P> {
        Entrypointer {
            entrypoint: self.entrypoint,
            args: self.args,
            wait_file: self.wait_file,
            post_file: self.post_file,
            waiter: self.waiter,
            runner,
            post_writer: self.post_writer,
        }
    }

    pub fn with_post_writer<P2>(self, post_writer: P2) -> Entrypointer<W, R, P2> {
        Entrypointer {
            entrypoint: self.entrypoint,
            args: self.args,
            wait_file: self.wait_file,
            post_file: self.post_file,
            waiter: self.waiter,
            runner: self.runner,
            post_writer,
        }
    }

    /// Full command line after the entrypoint is applied.
    pub fn command_line(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + 1);
        if !self.entrypoint.is_empty() {
            argv.push(self.entrypoint.clone());
        }
        argv.extend(self.args.iter().cloned());
        argv
    }
}

impl<W: Waiter, R: Runner, P: PostWriter> Entrypointer<W, R, P> {
    /// Wait, run, then post.
    ///
    /// Returns the command's exit code. The post file is only written when
    /// that code is 0, so a failed step never releases its successor.
    pub async fn go(&self) -> Result<i32, EntrypointError> {
        self.waiter.wait(&self.wait_file).await?;

        let code = self.runner.run(&self.command_line()).await?;
        if code != 0 {
            warn!(code, "Step failed; not posting");
            return Ok(code);
        }

        self.post_writer.write(&self.post_file).await?;
        info!(post_file = %self.post_file.display(), "Step complete");
        Ok(0)
    }
}
