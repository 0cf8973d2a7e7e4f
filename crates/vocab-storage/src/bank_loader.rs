//! `BankLoader` over the flat `items` table. The bank is loaded once at
//! startup and published atomically; this type only satisfies the read side
//! of that contract, the in-process swap-and-publish itself lives with the
//! calibration job.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use vocab_core::domain::Item;
use vocab_core::error::{EngineError, EngineResult};
use vocab_core::ports::BankLoader;
use vocab_core::ItemBank;

pub struct SqliteBankLoader {
    pool: SqlitePool,
}

impl SqliteBankLoader {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Replaces the full item set in one transaction. Used by seeding tools
    /// and by tests; not part of the `BankLoader` read contract.
    pub async fn replace_items(&self, items: &[Item]) -> crate::error::Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM items").execute(&mut *tx).await?;
        for item in items {
            let json = serde_json::to_string(item).map_err(|source| crate::error::StorageError::MalformedJson {
                column: "item_json",
                source,
            })?;
            sqlx::query("INSERT INTO items (id, item_json) VALUES (?, ?)")
                .bind(item.id)
                .bind(json)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl BankLoader for SqliteBankLoader {
    async fn load(&self) -> EngineResult<ItemBank> {
        let rows = sqlx::query("SELECT item_json FROM items")
            .fetch_all(&self.pool)
            .await
            .map_err(crate::error::StorageError::Database)?;

        let items = rows
            .into_iter()
            .map(|row| {
                let json: String = row.get("item_json");
                serde_json::from_str::<Item>(&json).map_err(|source| {
                    EngineError::from(crate::error::StorageError::MalformedJson {
                        column: "item_json",
                        source,
                    })
                })
            })
            .collect::<Result<Vec<Item>, EngineError>>()?;

        Ok(ItemBank::new(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vocab_core::domain::{CefrBand, CurriculumBand, IrtParams, ItemRelations, PartOfSpeech, QuestionType};
    use vocab_core::ports::BankLoader as _;

    fn sample_item(id: i64) -> Item {
        Item {
            id,
            lemma: format!("word{id}"),
            pos: PartOfSpeech::Noun,
            topic: "travel".to_string(),
            cefr: CefrBand::B1,
            curriculum: CurriculumBand::Middle,
            frequency_rank: 100,
            irt: IrtParams { a: 1.0, b: 0.0, c: 0.2 },
            capable_types: vec![QuestionType::KoreanMeaning],
            relations: ItemRelations::default(),
            attributes: std::collections::HashMap::new(),
        }
    }

    #[tokio::test]
    async fn round_trips_items_through_the_json_column() {
        let pool = crate::schema::init_in_memory_db().await.unwrap();
        let loader = SqliteBankLoader::new(pool);
        loader.replace_items(&[sample_item(1), sample_item(2)]).await.unwrap();

        let bank = loader.load().await.unwrap();
        assert_eq!(bank.len(), 2);
        assert_eq!(bank.get(1).unwrap().lemma, "word1");
    }
}
