//! Shared fixtures for math/bank/selector unit tests across this crate.

use std::collections::HashMap;

use crate::domain::{
    CefrBand, CurriculumBand, IrtParams, Item, ItemRelations, PartOfSpeech, QuestionType,
};

use super::item_bank::ItemBank;

fn travel_item(id: i64, b: f64) -> Item {
    let mut attributes = HashMap::new();
    attributes.insert("korean_meaning".to_string(), format!("뜻-{id}"));
    attributes.insert("english_definition".to_string(), format!("definition-{id}"));
    Item {
        id,
        lemma: format!("word-{id}"),
        pos: PartOfSpeech::Noun,
        topic: "travel".to_string(),
        cefr: CefrBand::B1,
        curriculum: CurriculumBand::Middle,
        frequency_rank: id as u32,
        irt: IrtParams::clamped(1.0, b, 0.20),
        capable_types: vec![QuestionType::KoreanMeaning, QuestionType::EnglishDefinition],
        relations: ItemRelations::default(),
        attributes,
    }
}

fn isolated_item(id: i64) -> Item {
    Item {
        id,
        lemma: "solitary".to_string(),
        pos: PartOfSpeech::Other,
        topic: "rare".to_string(),
        cefr: CefrBand::C1,
        curriculum: CurriculumBand::Csat,
        frequency_rank: 9999,
        irt: IrtParams::clamped(1.0, 2.0, 0.20),
        capable_types: vec![QuestionType::Collocation],
        relations: ItemRelations::default(),
        attributes: {
            let mut attrs = HashMap::new();
            attrs.insert("collocation_answer".to_string(), "solo".to_string());
            attrs
        },
    }
}

/// A small but non-trivial bank: ten same-topic items dense enough for
/// distractor strategies to find three neighbors, plus one isolated item
/// (id=99) that cannot be rendered under most question types.
pub fn sample_bank() -> ItemBank {
    let mut items: Vec<Item> = (1..=10)
        .map(|id| travel_item(id, (id as f64 - 5.0) * 0.3))
        .collect();
    items.push(isolated_item(99));
    ItemBank::new(items)
}
