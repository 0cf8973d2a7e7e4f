//! Loads the initial item bank as process-wide state with explicit
//! init/teardown. This port only describes the contract a loader must
//! satisfy; the actual ingestion format and schema live with the adapter.

use async_trait::async_trait;

use crate::bank::ItemBank;
use crate::error::EngineResult;

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait BankLoader: Send + Sync {
    /// Loads the full item pool once at startup.
    async fn load(&self) -> EngineResult<ItemBank>;
}
