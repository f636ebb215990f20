pub mod error;
pub mod models;
pub mod publisher;

pub use models::{BrokerMessage, BroccoliError, MqConfig, MqQueue, init_mq};
pub use publisher::MqPublisher;

pub type Mq = MqQueue;
