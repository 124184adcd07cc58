use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_BITMAP_SIZE: usize = 65_536;
pub const DEFAULT_RNG_SEED: u64 = 42;

/// Immutable run parameters. Built once via [`Config::build`], read-only
/// thereafter.
#[derive(Debug, Clone)]
pub struct Config {
    pub classpath: String,
    pub target_method: String,
    pub agent_path: PathBuf,
    pub shm_path: PathBuf,
    pub map_path: PathBuf,
    pub edge_csv_path: PathBuf,
    pub bitmap_size: usize,
    pub timeout: Duration,
    pub seed_count: usize,
    pub mutate_count: usize,
    pub max_iterations: u64,
    pub rng_seed: u64,
    pub input_arity: usize,
}

/// Raw constructor arguments for [`Config::build`]; kept as its own type so
/// CLI parsing and tests can assemble one without threading a dozen
/// positional arguments through a constructor.
#[derive(Debug, Clone)]
pub struct ConfigParams {
    pub classpath: String,
    pub target_method: String,
    pub agent_path: PathBuf,
    pub shm_path: PathBuf,
    pub map_path: PathBuf,
    pub edge_csv_path: PathBuf,
    pub bitmap_size: usize,
    pub timeout: Duration,
    pub seed_count: usize,
    pub mutate_count: usize,
    pub max_iterations: u64,
    pub rng_seed: u64,
    pub input_arity: usize,
}

impl Default for ConfigParams {
    fn default() -> Self {
        Self {
            classpath: String::new(),
            target_method: String::new(),
            agent_path: PathBuf::new(),
            shm_path: PathBuf::from("./bytescribe.shm"),
            map_path: PathBuf::from("./bytescribe-map.csv"),
            edge_csv_path: PathBuf::from("./per-edge.csv"),
            bitmap_size: DEFAULT_BITMAP_SIZE,
            timeout: Duration::from_secs(5),
            seed_count: 100,
            mutate_count: 5,
            max_iterations: 10_000,
            rng_seed: DEFAULT_RNG_SEED,
            input_arity: 1,
        }
    }
}

/// Collapses `.`/`..` components lexically, without touching the
/// filesystem — plain string surgery on the component list, the same
/// normalization `cwd.join(path)` needs after the fact since `Path::join`
/// itself never collapses `./`.
fn normalize_components(path: &std::path::Path) -> PathBuf {
    use std::path::Component;

    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Joins a relative path onto the current working directory without
/// requiring the path to exist (unlike `fs::canonicalize`) — the agent's
/// shm/map/per-edge-CSV paths are created by the subprocess we spawn, not by
/// us, so they won't exist yet at config-build time.
fn absolutize(path: PathBuf) -> Result<PathBuf, ConfigError> {
    if path.is_absolute() {
        return Ok(normalize_components(&path));
    }
    std::env::current_dir()
        .map(|cwd| normalize_components(&cwd.join(&path)))
        .map_err(|source| ConfigError::PathResolution { path, source })
}

impl Config {
    /// Validates and freezes a [`ConfigParams`] into a [`Config`]. The only
    /// place the core raises an uncatchable failure.
    pub fn build(params: ConfigParams) -> Result<Self, ConfigError> {
        if params.bitmap_size == 0 || !params.bitmap_size.is_power_of_two() {
            return Err(ConfigError::BadBitmapSize(params.bitmap_size));
        }
        if !params.agent_path.exists() {
            return Err(ConfigError::MissingAgent(params.agent_path));
        }
        if params.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if params.input_arity == 0 {
            return Err(ConfigError::ZeroArity);
        }

        // The agent descriptor's shm/map/perEdgePath fields must be
        // absolute regardless of what the caller passed in, so the target
        // JVM (which may run with a different working directory) resolves
        // them the same way we do.
        let shm_path = absolutize(params.shm_path)?;
        let map_path = absolutize(params.map_path)?;
        let edge_csv_path = absolutize(params.edge_csv_path)?;

        Ok(Self {
            classpath: params.classpath,
            target_method: params.target_method,
            agent_path: params.agent_path,
            shm_path,
            map_path,
            edge_csv_path,
            bitmap_size: params.bitmap_size,
            timeout: params.timeout,
            seed_count: params.seed_count,
            mutate_count: params.mutate_count,
            max_iterations: params.max_iterations,
            rng_seed: params.rng_seed,
            input_arity: params.input_arity,
        })
    }
}
