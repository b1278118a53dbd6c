use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::scene::SCENE_SIZE;
use crate::types::Fitness;

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

fn default_name() -> String {
    "Unnamed agent".into()
}
fn default_host() -> String {
    "localhost".into()
}
const fn default_port() -> u16 {
    4242
}
const fn default_connect_attempts() -> u32 {
    5
}
const fn default_connect_backoff_ms() -> u64 {
    5000
}
fn default_program() -> String {
    "java".into()
}
fn default_args() -> Vec<String> {
    vec![
        "ch.idsia.scenarios.MainRun".into(),
        "-server".into(),
        "on".into(),
    ]
}
fn default_working_dir() -> PathBuf {
    PathBuf::from("server")
}
fn default_log_dir() -> PathBuf {
    PathBuf::from("server/tmp")
}
const fn default_true() -> bool {
    true
}
const fn default_mario_mode() -> i32 {
    2
}
const fn default_level_seed() -> i64 {
    1
}
const fn default_time_limit() -> u32 {
    100
}
const fn default_fitness_value_count() -> usize {
    Fitness::FIELDS
}
const fn default_window_size() -> usize {
    4
}
const fn default_max_dist() -> usize {
    2
}
const fn default_player_pos() -> usize {
    11
}
const fn default_episodes() -> u32 {
    1
}
const fn default_max_fps() -> i32 {
    24
}
const fn default_response_delay() -> u32 {
    2
}

// ---------------------------------------------------------------------------
// ResetConfig
// ---------------------------------------------------------------------------

/// Level setup sent with every reset command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetConfig {
    /// Level difficulty; the simulator suggests 0..=30.
    #[serde(default)]
    pub level_difficulty: i32,

    /// 0 overground, 1 underground, 2 castle, 3 random.
    #[serde(default)]
    pub level_type: i32,

    #[serde(default = "default_true")]
    pub creatures_enabled: bool,

    /// 0 small, 1 large, 2 large with fire.
    #[serde(default = "default_mario_mode")]
    pub mario_mode: i32,

    #[serde(default = "default_level_seed")]
    pub level_seed: i64,

    /// Limit in simulator seconds.
    #[serde(default = "default_time_limit")]
    pub time_limit: u32,

    #[serde(default)]
    pub fast_tcp: bool,

    /// Whether the simulator renders the level.
    #[serde(default = "default_true")]
    pub visualization: bool,

    /// Fields expected in the fitness frame.
    #[serde(default = "default_fitness_value_count")]
    pub fitness_value_count: usize,

    /// Extra arguments appended verbatim to the reset command.
    #[serde(default)]
    pub custom_args: String,
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            level_difficulty: 0,
            level_type: 0,
            creatures_enabled: true,
            mario_mode: default_mario_mode(),
            level_seed: default_level_seed(),
            time_limit: default_time_limit(),
            fast_tcp: false,
            visualization: true,
            fitness_value_count: default_fitness_value_count(),
            custom_args: String::new(),
        }
    }
}

impl ResetConfig {
    /// Validate configuration. Returns Err on invalid values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fitness_value_count != Fitness::FIELDS {
            return Err(ConfigError::invalid(
                "reset.fitness_value_count",
                format!("must be {}", Fitness::FIELDS),
            ));
        }
        if !(0..=2).contains(&self.mario_mode) {
            return Err(ConfigError::invalid("reset.mario_mode", "must be 0, 1 or 2"));
        }
        if self.custom_args.contains(['\r', '\n']) {
            return Err(ConfigError::invalid(
                "reset.custom_args",
                "must not contain line breaks",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Transport settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Client name sent in the handshake.
    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Connection attempts before giving up (refusals only).
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,

    /// Pause between refused attempts.
    #[serde(default = "default_connect_backoff_ms")]
    pub connect_backoff_ms: u64,

    /// Receive timeout. `None` blocks indefinitely.
    #[serde(default)]
    pub read_timeout_ms: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            host: default_host(),
            port: default_port(),
            connect_attempts: default_connect_attempts(),
            connect_backoff_ms: default_connect_backoff_ms(),
            read_timeout_ms: None,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::invalid("session.port", "must be non-zero"));
        }
        if self.connect_attempts == 0 {
            return Err(ConfigError::invalid(
                "session.connect_attempts",
                "must be >= 1",
            ));
        }
        if self.read_timeout_ms == Some(0) {
            return Err(ConfigError::invalid(
                "session.read_timeout_ms",
                "must be > 0 when set",
            ));
        }
        if self.name.contains(['\r', '\n']) {
            return Err(ConfigError::invalid(
                "session.name",
                "must not contain line breaks",
            ));
        }
        Ok(())
    }

    /// `host:port` pair for socket resolution.
    #[must_use]
    pub fn address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

// ---------------------------------------------------------------------------
// SimulatorConfig
// ---------------------------------------------------------------------------

/// How to start the external simulator process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Start the simulator as a child process. When `false`, connect to one
    /// that is already running.
    #[serde(default = "default_true")]
    pub launch: bool,

    #[serde(default = "default_program")]
    pub program: String,

    #[serde(default = "default_args")]
    pub args: Vec<String>,

    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,

    /// Directory receiving `server_logOut.log` and `server_logErr.log`.
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Run `{program} -version` before launching.
    #[serde(default = "default_true")]
    pub check_runtime: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            launch: true,
            program: default_program(),
            args: default_args(),
            working_dir: default_working_dir(),
            log_dir: default_log_dir(),
            check_runtime: true,
        }
    }
}

impl SimulatorConfig {
    /// Log file paths as `(stdout, stderr)`.
    #[must_use]
    pub fn log_paths(&self) -> (PathBuf, PathBuf) {
        (
            self.log_dir.join("server_logOut.log"),
            self.log_dir.join("server_logErr.log"),
        )
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.launch && self.program.trim().is_empty() {
            return Err(ConfigError::invalid(
                "simulator.program",
                "must be set when launch = true",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TaskConfig
// ---------------------------------------------------------------------------

/// Feature extraction window around the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Half-width of the ground search window.
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Largest look-ahead distance for proximity features.
    #[serde(default = "default_max_dist")]
    pub max_dist: usize,

    /// Row/column of the player in the scene.
    #[serde(default = "default_player_pos")]
    pub player_pos: usize,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            max_dist: default_max_dist(),
            player_pos: default_player_pos(),
        }
    }
}

impl TaskConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.player_pos >= SCENE_SIZE {
            return Err(ConfigError::invalid(
                "task.player_pos",
                format!("must be < {SCENE_SIZE}"),
            ));
        }
        if self.max_dist == 0 {
            return Err(ConfigError::invalid("task.max_dist", "must be >= 1"));
        }
        if self.window_size > self.player_pos {
            return Err(ConfigError::invalid(
                "task.window_size",
                "must be <= player_pos",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ExperimentConfig
// ---------------------------------------------------------------------------

/// Episode loop pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    #[serde(default = "default_episodes")]
    pub episodes: u32,

    /// Target frames per second. `<= 0` runs uncapped.
    #[serde(default = "default_max_fps")]
    pub max_fps: i32,

    /// Frames skipped between agent decisions.
    #[serde(default = "default_response_delay")]
    pub response_delay: u32,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            episodes: default_episodes(),
            max_fps: default_max_fps(),
            response_delay: default_response_delay(),
        }
    }
}

// ---------------------------------------------------------------------------
// CodecConfig
// ---------------------------------------------------------------------------

/// Frame decoding behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Reject bit-packed frames whose checksum does not match. When `false`,
    /// mismatches are logged and the frame is accepted.
    #[serde(default = "default_true")]
    pub strict_checksum: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            strict_checksum: true,
        }
    }
}

// ---------------------------------------------------------------------------
// HarnessConfig
// ---------------------------------------------------------------------------

/// Complete client configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarnessConfig {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub simulator: SimulatorConfig,
    #[serde(default)]
    pub reset: ResetConfig,
    #[serde(default)]
    pub task: TaskConfig,
    #[serde(default)]
    pub experiment: ExperimentConfig,
    #[serde(default)]
    pub codec: CodecConfig,
}

impl HarnessConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.session.validate()?;
        self.simulator.validate()?;
        self.reset.validate()?;
        self.task.validate()?;
        Ok(())
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Render as a TOML document.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
