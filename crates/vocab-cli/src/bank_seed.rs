//! Bootstraps the item bank backing a database on first use. Content
//! authoring is out of scope; this only seeds a synthetic bank so the engine
//! has something to select from when no real import has run yet.

use anyhow::Result;
use vocab_core::ports::BankLoader as _;
use vocab_core::ItemBank;
use vocab_storage::SqliteBankLoader;

const DEFAULT_SYNTHETIC_ITEMS: usize = 600;

pub async fn load_or_seed(loader: &SqliteBankLoader) -> Result<ItemBank> {
    let bank = loader.load().await?;
    if !bank.is_empty() {
        return Ok(bank);
    }

    tracing::info!(
        items = DEFAULT_SYNTHETIC_ITEMS,
        "items table is empty, seeding a synthetic bank"
    );
    let synthetic = vocab_core::synthetic_bank(DEFAULT_SYNTHETIC_ITEMS);
    let items: Vec<vocab_core::domain::Item> = synthetic.all_items().cloned().collect();
    loader.replace_items(&items).await?;
    Ok(synthetic)
}
