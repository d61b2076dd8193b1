use crate::report::RunReport;
use crate::ExecError;

/// What the controller should do after a child failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Abort the entire run; teardown still happens.
    Abort,
    /// Absorb the failure and keep processing.
    Continue,
}

/// Strategy consulted on every execution error. Errors are reported at
/// their point of occurrence regardless of the action returned; the
/// policy only decides whether the run continues.
pub trait ErrorPolicy: Send + Sync {
    fn name(&self) -> &str;

    fn on_error(&self, actor: &str, error: &ExecError) -> ErrorAction;
}

/// Default, strict policy: any failure aborts the whole run.
#[derive(Debug, Default, Clone, Copy)]
pub struct StopOnError;

impl ErrorPolicy for StopOnError {
    fn name(&self) -> &str {
        "stop-on-error"
    }

    fn on_error(&self, _actor: &str, _error: &ExecError) -> ErrorAction {
        ErrorAction::Abort
    }
}

/// Absorbs failures per activation; the failing path produces no token,
/// everything else keeps running.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContinueOnError;

impl ErrorPolicy for ContinueOnError {
    fn name(&self) -> &str {
        "continue-on-error"
    }

    fn on_error(&self, actor: &str, error: &ExecError) -> ErrorAction {
        tracing::warn!(actor, %error, "absorbing failure");
        ErrorAction::Continue
    }
}

/// Strategy consulted after every completed run attempt.
pub trait RestartPolicy: Send + Sync {
    fn name(&self) -> &str;

    fn should_restart(&self, report: &RunReport) -> bool;
}

/// Default: never re-run.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRestart;

impl RestartPolicy for NoRestart {
    fn name(&self) -> &str {
        "no-restart"
    }

    fn should_restart(&self, _report: &RunReport) -> bool {
        false
    }
}

/// Re-runs a failed flow up to `max_restarts` additional attempts.
/// Successful and stopped runs are never restarted.
#[derive(Debug, Clone, Copy)]
pub struct RestartLimit {
    max_restarts: u32,
}

impl RestartLimit {
    pub fn new(max_restarts: u32) -> Self {
        Self { max_restarts }
    }
}

impl RestartPolicy for RestartLimit {
    fn name(&self) -> &str {
        "restart-limit"
    }

    fn should_restart(&self, report: &RunReport) -> bool {
        !report.is_success() && !report.is_stopped() && report.attempt <= self.max_restarts
    }
}

/// Invoked exactly once after each run attempt, success or failure.
pub type PostRunHook = Box<dyn Fn(&RunReport) + Send + Sync>;
