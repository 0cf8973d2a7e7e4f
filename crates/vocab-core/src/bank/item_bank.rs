//! In-memory index over the item pool. Immutable after construction;
//! read without synchronization once published.

use std::collections::HashMap;

use crate::domain::{CefrBand, CurriculumBand, Item, PartOfSpeech, QuestionType};
use crate::math::fisher_information;

use super::render;

/// Optional filter applied by `filtered` and by the selector's content
/// constraints.
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    pub topic: Option<String>,
    pub pos: Option<PartOfSpeech>,
    pub cefr: Option<CefrBand>,
    pub curriculum: Option<CurriculumBand>,
    pub question_type: Option<QuestionType>,
}

impl ItemFilter {
    fn matches(&self, item: &Item, bank: &ItemBank) -> bool {
        if let Some(topic) = &self.topic {
            if &item.topic != topic {
                return false;
            }
        }
        if let Some(pos) = self.pos {
            if item.pos != pos {
                return false;
            }
        }
        if let Some(cefr) = self.cefr {
            if item.cefr != cefr {
                return false;
            }
        }
        if let Some(curriculum) = self.curriculum {
            if item.curriculum != curriculum {
                return false;
            }
        }
        if let Some(qtype) = self.question_type {
            if !render::is_renderable(item, qtype, bank) {
                return false;
            }
        }
        true
    }
}

pub struct ItemBank {
    items: HashMap<i64, Item>,
    ordered_ids: Vec<i64>,
}

impl ItemBank {
    pub fn new(items: Vec<Item>) -> Self {
        let mut ordered_ids: Vec<i64> = items.iter().map(|item| item.id).collect();
        ordered_ids.sort_unstable();
        let items = items.into_iter().map(|item| (item.id, item)).collect();
        Self { items, ordered_ids }
    }

    pub fn get(&self, id: i64) -> Option<&Item> {
        self.items.get(&id)
    }

    pub fn len(&self) -> usize {
        self.ordered_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered_ids.is_empty()
    }

    pub fn all_items(&self) -> impl Iterator<Item = &Item> {
        self.ordered_ids.iter().filter_map(|id| self.items.get(id))
    }

    /// Filtered enumeration by topic, POS, CEFR, curriculum, question-type
    /// capability.
    pub fn filtered(&self, filter: &ItemFilter) -> Vec<i64> {
        self.all_items()
            .filter(|item| filter.matches(item, self))
            .map(|item| item.id)
            .collect()
    }

    /// Top-N candidates from `candidate_ids` ranked by Fisher information at
    /// `theta`, ties broken by ascending item id.
    pub fn ranked_by_information(&self, theta: f64, candidate_ids: &[i64], top_n: usize) -> Vec<i64> {
        let mut scored: Vec<(i64, f64)> = candidate_ids
            .iter()
            .filter_map(|id| self.items.get(id).map(|item| (*id, item)))
            .map(|(id, item)| (id, fisher_information(theta, item.irt)))
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.into_iter().take(top_n).map(|(id, _)| id).collect()
    }

    /// Graph neighbors for synonym/antonym question types.
    pub fn synonym_neighbors(&self, item_id: i64) -> &[i64] {
        self.items
            .get(&item_id)
            .map(|item| item.relations.synonyms.as_slice())
            .unwrap_or(&[])
    }

    pub fn antonym_neighbors(&self, item_id: i64) -> &[i64] {
        self.items
            .get(&item_id)
            .map(|item| item.relations.antonyms.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_renderable(&self, item_id: i64, qtype: QuestionType) -> bool {
        self.get(item_id)
            .map(|item| render::is_renderable(item, qtype, self))
            .unwrap_or(false)
    }

    pub fn render(
        &self,
        item_id: i64,
        qtype: QuestionType,
        session_id: &str,
        seed: u64,
    ) -> Option<crate::domain::RenderedItem> {
        let item = self.get(item_id)?;
        render::render(item, qtype, self, session_id, seed)
    }
}
