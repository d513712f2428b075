/// Operator-facing output channel.
///
/// Constructed once and passed to whatever needs to report to the operator;
/// diagnostics for developers go through `tracing` instead.
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
pub trait OutputLog: Send + Sync {
    fn info(&self, message: &str);
    fn error(&self, message: &str);
}
