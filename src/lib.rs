//! Core library for `bytescribe-fuzz`, a coverage-guided greybox fuzzer for
//! instrumented JVM targets. The binary in `src/bin/fuzz.rs` is a thin CLI
//! shell over the types exported here.

pub mod config;
pub mod corpus;
pub mod coverage;
pub mod crash;
pub mod driver;
pub mod engine;
pub mod error;
pub mod mutate;
pub mod protocol;
pub mod record;

pub use config::{Config, ConfigParams};
pub use corpus::CorpusManager;
pub use coverage::{CoverageStats, CoverageTracker};
pub use crash::{CrashEntry, ErrorDetector};
pub use driver::{ExecutionDriver, FakeDriver, ProcessDriver};
pub use engine::{run_parallel, FuzzProgress, FuzzSummary, FuzzerEngine, SharedState};
pub use error::{ConfigError, DriverError};
pub use mutate::InputGenerator;
pub use protocol::{DriverProtocol, DriverRequest, DriverResponse};
pub use record::ExecutionRecord;
