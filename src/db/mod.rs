pub mod catalog;
pub mod ledger;
pub mod postgres;
pub mod profiles;
pub mod recommendations;
pub mod redis;
pub mod repository;
pub mod session;

pub use postgres::{create_pool, run_migrations, PgStore};
pub use self::redis::{create_redis_client, RedisSessionStore};
pub use repository::{CatalogRepository, LedgerRepository, PoolRepository, ProfileRepository};
pub use session::{MemorySessionStore, SessionKey, SessionStore};
