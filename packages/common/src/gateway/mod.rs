mod error;
mod traits;

pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

pub use error::GatewayError;
pub use memory::InMemoryGateway;
pub use traits::DataGateway;
