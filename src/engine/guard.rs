//! Scoped stop/start of the broker application.

use crate::error::ClusterResult;
use crate::runner::{CommandRunner, ControlCommand};

/// Holds the broker application stopped for as long as it lives.
///
/// Acquiring issues `stop_app`. Releasing, explicitly or on drop during unwinding, issues
/// `start_app` exactly once.
pub(super) struct ApplicationGuard<'a, R: CommandRunner> {
    runner: &'a R,
    released: bool,
}

impl<'a, R: CommandRunner> ApplicationGuard<'a, R> {
    /// Stop the application. If stopping fails nothing is held and nothing will be started.
    pub(super) fn acquire(runner: &'a R) -> ClusterResult<Self> {
        runner.run_checked(&ControlCommand::StopApplication)?;
        tracing::info!("broker application stopped");
        Ok(Self { runner, released: false })
    }

    /// Start the application again.
    pub(super) fn release(mut self) -> ClusterResult<()> {
        self.released = true;
        self.start()
    }

    fn start(&self) -> ClusterResult<()> {
        self.runner.run_checked(&ControlCommand::StartApplication)?;
        tracing::info!("broker application started");
        Ok(())
    }
}

impl<'a, R: CommandRunner> Drop for ApplicationGuard<'a, R> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(err) = self.start() {
            tracing::error!(error = ?err, "error starting broker application while unwinding");
        }
    }
}
