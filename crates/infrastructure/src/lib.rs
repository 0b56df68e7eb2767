//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_secret_storage;
mod postgres_secret_storage;
mod ram_identity_platform;
mod redis_sweep_lock_coordinator;

pub use in_memory_secret_storage::InMemorySecretStorage;
pub use postgres_secret_storage::PostgresSecretStorage;
pub use ram_identity_platform::{
    DEFAULT_RAM_ENDPOINT, RAM_API_VERSION, RamIdentityPlatform, RamIdentityPlatformConnector,
};
pub use redis_sweep_lock_coordinator::RedisSweepLockCoordinator;
