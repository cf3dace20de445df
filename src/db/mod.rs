pub mod diesel_pool;
pub mod memory_store;
pub mod postgres_store;
pub mod redis_store;

pub use diesel_pool::{
    check_diesel_health, create_diesel_pool, mask_connection_string, DieselDatabaseConfig,
    DieselPool, MIGRATIONS,
};
pub use memory_store::InMemoryVerdictStore;
pub use postgres_store::PostgresVerdictStore;
pub use redis_store::RedisVerdictStore;
