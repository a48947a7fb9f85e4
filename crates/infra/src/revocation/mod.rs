//! Revocation store adapters.

pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

pub use memory::InMemoryRevocationStore;
#[cfg(feature = "redis")]
pub use redis::RedisRevocationStore;
