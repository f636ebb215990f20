use std::time::Duration;

use common::Language;
use common::retry::RetryPolicy;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub use common::config::{GatewayConfig, MqAppConfig};

use crate::runner::RunnerLimits;

/// Binaries and flags used to build and run submissions.
#[derive(Debug, Deserialize, Clone)]
pub struct ToolchainConfig {
    /// Python interpreter. Default: "python3".
    #[serde(default = "default_python")]
    pub python: String,
    /// Node.js runtime. Default: "node".
    #[serde(default = "default_node")]
    pub node: String,
    /// C++ compiler. Default: "g++".
    #[serde(default = "default_cpp_compiler")]
    pub cpp_compiler: String,
    /// Flags passed to the C++ compiler before `-o`. Default: ["-std=c++17", "-O2"].
    #[serde(default = "default_cpp_flags")]
    pub cpp_flags: Vec<String>,
    /// Java compiler. Default: "javac".
    #[serde(default = "default_javac")]
    pub javac: String,
    /// Java launcher. Default: "java".
    #[serde(default = "default_java")]
    pub java: String,
}

fn default_python() -> String {
    "python3".into()
}
fn default_node() -> String {
    "node".into()
}
fn default_cpp_compiler() -> String {
    "g++".into()
}
fn default_cpp_flags() -> Vec<String> {
    vec!["-std=c++17".into(), "-O2".into()]
}
fn default_javac() -> String {
    "javac".into()
}
fn default_java() -> String {
    "java".into()
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            python: default_python(),
            node: default_node(),
            cpp_compiler: default_cpp_compiler(),
            cpp_flags: default_cpp_flags(),
            javac: default_javac(),
            java: default_java(),
        }
    }
}

/// Worker-specific configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct WorkerConfig {
    /// Unique identifier for this worker instance. Default: "worker-1".
    #[serde(default = "default_worker_id")]
    pub id: String,
    /// Submissions judged concurrently per language topic. Default: 4.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Wall-clock budget of the run step. Default: 5000ms.
    #[serde(default = "default_run_timeout_ms")]
    pub run_timeout_ms: u64,
    /// Wall-clock budget of the build step. Default: 30000ms.
    #[serde(default = "default_compile_timeout_ms")]
    pub compile_timeout_ms: u64,
    /// Bytes kept per captured output stream. Default: 1 MiB.
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
    /// Languages this worker judges. Default: all supported languages.
    #[serde(default = "default_languages")]
    pub languages: Vec<Language>,
    #[serde(default)]
    pub toolchain: ToolchainConfig,
}

fn default_worker_id() -> String {
    "worker-1".into()
}
fn default_concurrency() -> usize {
    4
}
fn default_run_timeout_ms() -> u64 {
    5_000
}
fn default_compile_timeout_ms() -> u64 {
    30_000
}
fn default_max_output_bytes() -> usize {
    1024 * 1024
}
fn default_languages() -> Vec<Language> {
    Language::ALL.to_vec()
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            id: default_worker_id(),
            concurrency: default_concurrency(),
            run_timeout_ms: default_run_timeout_ms(),
            compile_timeout_ms: default_compile_timeout_ms(),
            max_output_bytes: default_max_output_bytes(),
            languages: default_languages(),
            toolchain: ToolchainConfig::default(),
        }
    }
}

impl WorkerConfig {
    pub fn run_deadline(&self) -> Duration {
        Duration::from_millis(self.run_timeout_ms)
    }

    pub fn limits(&self) -> RunnerLimits {
        RunnerLimits {
            compile_timeout: Duration::from_millis(self.compile_timeout_ms),
            max_output_bytes: self.max_output_bytes,
        }
    }
}

/// Worker application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct WorkerAppConfig {
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub mq: MqAppConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl WorkerAppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("LEARNCODE_CONFIG").unwrap_or_else(|_| "config/config".to_string());
        Self::from_builder(
            Config::builder()
                .add_source(File::with_name(&config_path).required(false))
                .add_source(
                    Environment::with_prefix("LEARNCODE")
                        .separator("__")
                        .list_separator(",")
                        .with_list_parse_key("worker.languages")
                        .with_list_parse_key("worker.toolchain.cpp_flags")
                        .try_parsing(true),
                ),
        )
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        builder
            .set_default("worker.id", "worker-1")?
            .set_default("worker.concurrency", 4_i64)?
            .set_default("worker.run_timeout_ms", 5_000_i64)?
            .set_default("worker.compile_timeout_ms", 30_000_i64)?
            .set_default("mq.url", "redis://localhost:6379")?
            .set_default("mq.pool_size", 5_i64)?
            .set_default("mq.topic_prefix", common::language::DEFAULT_TOPIC_PREFIX)?
            .set_default("gateway.url", "redis://localhost:6379")?
            .set_default("gateway.key_prefix", "learncode")?
            .build()?
            .try_deserialize()
    }
}
