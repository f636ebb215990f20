use serde::Deserialize;

use crate::language::DEFAULT_TOPIC_PREFIX;

/// App-level MQ configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct MqAppConfig {
    /// Redis connection URL of the broker. Default: "redis://localhost:6379".
    #[serde(default = "default_mq_url")]
    pub url: String,
    /// Connection pool size. Default: 5.
    #[serde(default = "default_mq_pool_size")]
    pub pool_size: u8,
    /// Prefix of the per-language topics (`{prefix}-{language}`). Default: "learncode".
    #[serde(default = "default_topic_prefix")]
    pub topic_prefix: String,
}

fn default_mq_url() -> String {
    "redis://localhost:6379".into()
}
fn default_mq_pool_size() -> u8 {
    5
}
fn default_topic_prefix() -> String {
    DEFAULT_TOPIC_PREFIX.into()
}

impl Default for MqAppConfig {
    fn default() -> Self {
        Self {
            url: default_mq_url(),
            pool_size: default_mq_pool_size(),
            topic_prefix: default_topic_prefix(),
        }
    }
}

/// Data gateway configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    /// Redis URL of the key-value store. Default: "redis://localhost:6379".
    #[serde(default = "default_gateway_url")]
    pub url: String,
    /// Prefix for every key the gateway writes. Default: "learncode".
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

fn default_gateway_url() -> String {
    "redis://localhost:6379".into()
}
fn default_key_prefix() -> String {
    "learncode".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: default_gateway_url(),
            key_prefix: default_key_prefix(),
        }
    }
}
