use config::Config as eConfig;
use serde::Deserialize;
use serde_derive::Serialize;
use std::path::Path;

/// Settings for a fit: EM stopping rules, the M-step optimizer and logging.
///
/// Every field has a default, so an empty TOML file (or [Settings::default])
/// is a valid configuration.
#[derive(Debug, Deserialize, Clone, Serialize, PartialEq, Default)]
pub struct Settings {
    #[serde(default)]
    pub config: EmConfig,
    #[serde(default)]
    pub optimizer: OptimizerConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Stopping rules of the EM loop
#[derive(Debug, Deserialize, Clone, Serialize, PartialEq)]
pub struct EmConfig {
    /// Convergence threshold on the Aitken statistic
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Maximum number of EM cycles
    #[serde(default = "default_max_cycles")]
    pub max_cycles: usize,
}

impl Default for EmConfig {
    fn default() -> Self {
        EmConfig {
            tolerance: default_tolerance(),
            max_cycles: default_max_cycles(),
        }
    }
}

/// L-BFGS settings of the M-step
#[derive(Debug, Deserialize, Clone, Serialize, PartialEq)]
pub struct OptimizerConfig {
    /// How many times the optimizer is re-seeded when it ends below the start value
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    /// Number of correction pairs kept by L-BFGS
    #[serde(default = "default_lbfgs_memory")]
    pub lbfgs_memory: usize,
    /// Optimizer iterations allowed per free parameter
    #[serde(default = "default_iterations_per_parameter")]
    pub iterations_per_parameter: f64,
    #[serde(default = "default_gradient_tolerance")]
    pub gradient_tolerance: f64,
    #[serde(default = "default_cost_tolerance")]
    pub cost_tolerance: f64,
}

impl OptimizerConfig {
    /// Iteration cap of one optimizer run for `n_parameters` free parameters, at least one
    pub fn max_iters(&self, n_parameters: usize) -> u64 {
        let iters = (n_parameters as f64 * self.iterations_per_parameter).round();
        if iters.is_finite() && iters >= 1.0 {
            iters as u64
        } else {
            1
        }
    }
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig {
            max_retries: default_max_retries(),
            lbfgs_memory: default_lbfgs_memory(),
            iterations_per_parameter: default_iterations_per_parameter(),
            gradient_tolerance: default_gradient_tolerance(),
            cost_tolerance: default_cost_tolerance(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Serialize, PartialEq)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional log file, truncated on setup
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_true")]
    pub stdout: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: default_log_level(),
            file: None,
            stdout: default_true(),
        }
    }
}

impl Settings {
    /// Write the settings as pretty-printed JSON to `path`
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), std::io::Error> {
        let serialized = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

        let mut file = std::fs::File::create(path)?;
        std::io::Write::write_all(&mut file, serialized.as_bytes())?;
        Ok(())
    }
}

/// Read settings from a TOML file.
///
/// Values can be overridden by environment variables prefixed with `ORDMIX`,
/// with `__` between nested keys, e.g. `ORDMIX_CONFIG__MAX_CYCLES=50`.
pub fn read_settings(path: impl AsRef<Path>) -> Result<Settings, config::ConfigError> {
    let parsed = eConfig::builder()
        .add_source(config::File::from(path.as_ref()).format(config::FileFormat::Toml))
        .add_source(
            config::Environment::with_prefix("ORDMIX")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    parsed.try_deserialize()
}

// *********************************
// Default values for deserializing
// *********************************
fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_tolerance() -> f64 {
    1e-6
}

fn default_max_cycles() -> usize {
    10
}

fn default_max_retries() -> usize {
    25
}

fn default_lbfgs_memory() -> usize {
    7
}

fn default_iterations_per_parameter() -> f64 {
    0.25
}

fn default_gradient_tolerance() -> f64 {
    1e-8
}

fn default_cost_tolerance() -> f64 {
    1e-12
}
