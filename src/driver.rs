use std::fs;
use std::io::Read as _;
use std::process::{Command, Stdio};

use wait_timeout::ChildExt;

use crate::config::Config;
use crate::error::DriverError;

const RUNTIME_DISPATCHER_CLASS: &str = "jpamb.Runtime";

/// A single-execution harness: feed it an input tuple, get back an edge
/// trace and/or an error message. Abstracted behind a trait so the
/// engine/protocol layers never depend on an actual subprocess.
pub trait ExecutionDriver {
    fn run(&mut self, input: &[i64]) -> (Option<Vec<i64>>, Option<String>);
}

/// Real subprocess-backed driver: spawns the instrumented target under the
/// configured agent and parses its per-edge CSV output.
pub struct ProcessDriver {
    config: Config,
}

impl ProcessDriver {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// `Config::build` already resolves `shm_path`/`map_path`/`edge_csv_path`
    /// to absolute paths, so the target JVM — which may be spawned with a
    /// different working directory than ours — resolves them identically.
    fn agent_descriptor(&self) -> String {
        format!(
            "-javaagent:{}=size={},shm={},map={},map.append=false,perEdge=true,perEdgePath={}",
            self.config.agent_path.display(),
            self.config.bitmap_size,
            self.config.shm_path.display(),
            self.config.map_path.display(),
            self.config.edge_csv_path.display(),
        )
    }

    fn args_tuple(input: &[i64]) -> String {
        let joined = input.iter().map(i64::to_string).collect::<Vec<_>>().join(",");
        format!("({joined})")
    }

    fn run_inner(&mut self, input: &[i64]) -> Result<Vec<i64>, DriverError> {
        let _ = fs::remove_file(&self.config.edge_csv_path);

        let mut child = Command::new("java")
            .arg(self.agent_descriptor())
            .arg("-ea")
            .arg("-cp")
            .arg(&self.config.classpath)
            .arg(RUNTIME_DISPATCHER_CLASS)
            .arg(&self.config.target_method)
            .arg(Self::args_tuple(input))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let status = match child.wait_timeout(self.config.timeout)? {
            Some(status) => status,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(DriverError::Timeout(self.config.timeout.as_secs()));
            }
        };

        // Drain stdout so the child never blocks on a full pipe buffer; its
        // contents carry no signal we use.
        if let Some(mut stdout) = child.stdout.take() {
            let mut sink = Vec::new();
            let _ = stdout.read_to_end(&mut sink);
        }

        let mut stderr = String::new();
        if let Some(mut pipe) = child.stderr.take() {
            let _ = pipe.read_to_string(&mut stderr);
        }

        if !status.success() {
            let code = status.code().unwrap_or(-1);
            return Err(DriverError::TargetFailed { code, stderr: stderr.trim().to_string() });
        }

        Ok(parse_edge_csv(&self.config.edge_csv_path))
    }
}

impl ExecutionDriver for ProcessDriver {
    fn run(&mut self, input: &[i64]) -> (Option<Vec<i64>>, Option<String>) {
        match self.run_inner(input) {
            Ok(trace) => (Some(trace), None),
            Err(err) => (None, Some(err.to_string())),
        }
    }
}

/// Reads `src_offset,dst_offset,hit_count` lines, returning the sequence of
/// source offsets in file order. A non-existent file (missing CSV, exit 0)
/// or a line whose first field doesn't parse as an integer (treated as a
/// header) contribute nothing.
fn parse_edge_csv(path: &std::path::Path) -> Vec<i64> {
    let Ok(contents) = fs::read_to_string(path) else {
        return Vec::new();
    };

    contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let mut fields = line.split(',');
            let src = fields.next()?.trim().parse::<i64>().ok()?;
            Some(src)
        })
        .collect()
}

/// Closure-backed stand-in for [`ExecutionDriver`] used by unit and
/// integration tests so engine behavior can be pinned without an actual JVM.
pub struct FakeDriver<F>
where
    F: FnMut(&[i64]) -> (Option<Vec<i64>>, Option<String>),
{
    behavior: F,
}

impl<F> FakeDriver<F>
where
    F: FnMut(&[i64]) -> (Option<Vec<i64>>, Option<String>),
{
    pub fn new(behavior: F) -> Self {
        Self { behavior }
    }
}

impl<F> ExecutionDriver for FakeDriver<F>
where
    F: FnMut(&[i64]) -> (Option<Vec<i64>>, Option<String>),
{
    fn run(&mut self, input: &[i64]) -> (Option<Vec<i64>>, Option<String>) {
        (self.behavior)(input)
    }
}
