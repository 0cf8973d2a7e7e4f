pub mod bank_loader;
pub mod error;
pub mod persistence;
pub mod schema;

pub use bank_loader::SqliteBankLoader;
pub use error::{Result, StorageError};
pub use persistence::SqlitePersistencePort;
pub use schema::{init_db, init_in_memory_db};
