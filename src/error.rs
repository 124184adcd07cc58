use std::path::PathBuf;

/// Raised only at startup, when the fuzzer's immutable parameters can't be
/// satisfied. Nothing else in the core raises an uncatchable failure.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("bitmap_size must be a positive power of two, got {0}")]
    BadBitmapSize(usize),
    #[error("agent path does not exist: {0}")]
    MissingAgent(PathBuf),
    #[error("timeout must be greater than zero")]
    ZeroTimeout,
    #[error("input_arity must be at least 1")]
    ZeroArity,
    #[error("could not resolve absolute path for {path}: {source}")]
    PathResolution { path: PathBuf, source: std::io::Error },
}

/// Internal driver failure taxonomy. Converted to the `(trace,
/// error_message)` pair at the `ExecutionDriver` boundary — callers never
/// see this type directly.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("timeout after {0}s")]
    Timeout(u64),
    #[error("driver error: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("execution failed (code={code}): {stderr}")]
    TargetFailed { code: i32, stderr: String },
}

impl DriverError {
    /// True for the one error kind that should be deduplicated as a crash
    /// — a target exception, as opposed to a timeout or driver failure.
    pub fn is_target_exception(&self) -> bool {
        matches!(self, DriverError::TargetFailed { .. })
    }
}

/// Same classification as [`DriverError::is_target_exception`], usable once
/// the error has already crossed the `(trace, error_message)` boundary as a
/// plain string (the formats are bit-exact with what `ProcessDriver` emits).
pub fn is_target_exception_message(message: &str) -> bool {
    message.starts_with("execution failed (code=")
}
