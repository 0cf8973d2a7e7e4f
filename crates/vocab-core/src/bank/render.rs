//! Distractor-selection strategies and deterministic question rendering.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::prelude::*;
use rand::rngs::StdRng;

use crate::domain::{Item, QuestionType, RenderedItem};

use super::item_bank::ItemBank;

/// Deterministic RNG for `(session_id, item_id, seed)` so regeneration
/// reproduces byte-identical output.
pub fn make_rng_for(session_id: &str, item_id: i64, seed: u64) -> StdRng {
    let mut hasher = DefaultHasher::new();
    session_id.hash(&mut hasher);
    item_id.hash(&mut hasher);
    seed.hash(&mut hasher);
    StdRng::seed_from_u64(hasher.finish())
}

fn correct_answer_text(item: &Item, qtype: QuestionType) -> Option<String> {
    let key = match qtype {
        QuestionType::KoreanMeaning => "korean_meaning",
        QuestionType::EnglishDefinition => "english_definition",
        QuestionType::Synonym => "synonym_answer",
        QuestionType::Antonym => "antonym_answer",
        QuestionType::Cloze => "cloze_answer",
        QuestionType::Collocation => "collocation_answer",
    };
    item.attributes.get(key).cloned()
}

fn stem_template(item: &Item, qtype: QuestionType) -> String {
    match qtype {
        QuestionType::KoreanMeaning => format!("'{}'의 뜻으로 알맞은 것은?", item.lemma),
        QuestionType::EnglishDefinition => format!("Which best defines \"{}\"?", item.lemma),
        QuestionType::Synonym => format!("Choose the word closest in meaning to \"{}\".", item.lemma),
        QuestionType::Antonym => format!("Choose the word opposite in meaning to \"{}\".", item.lemma),
        QuestionType::Cloze => item
            .attributes
            .get("cloze_stem")
            .cloned()
            .unwrap_or_else(|| format!("Fill in the blank: ___ ({})", item.lemma)),
        QuestionType::Collocation => format!("Which word best collocates with \"{}\"?", item.lemma),
    }
}

/// Strategy A: same POS, adjacent CEFR, same topic, excluding known synonyms.
fn strategy_a(item: &Item, qtype: QuestionType, bank: &ItemBank) -> Vec<i64> {
    bank.all_items()
        .filter(|candidate| {
            candidate.id != item.id
                && candidate.pos == item.pos
                && candidate.topic == item.topic
                && (candidate.cefr.ordinal() as i16 - item.cefr.ordinal() as i16).abs() <= 1
                && !item.relations.synonyms.contains(&candidate.id)
                && correct_answer_text(candidate, qtype).is_some()
        })
        .map(|candidate| candidate.id)
        .collect()
}

/// Strategy B: for synonym items, non-synonyms sharing POS.
fn strategy_b(item: &Item, qtype: QuestionType, bank: &ItemBank) -> Vec<i64> {
    bank.all_items()
        .filter(|candidate| {
            candidate.id != item.id
                && candidate.pos == item.pos
                && !item.relations.synonyms.contains(&candidate.id)
                && correct_answer_text(candidate, qtype).is_some()
        })
        .map(|candidate| candidate.id)
        .collect()
}

/// Strategy C: for antonym items, the item's own declared antonyms (falls
/// back to Strategy A at the call site when empty).
fn strategy_c(item: &Item, _qtype: QuestionType) -> Vec<i64> {
    item.relations.antonyms.clone()
}

/// Strategy D: hypernym siblings when the graph is available.
fn strategy_d(item: &Item, _qtype: QuestionType) -> Vec<i64> {
    item.relations.hypernym_siblings.clone()
}

/// Falls back in order A→D→B→C, accumulating unique candidates until three
/// are produced. Returns `None` if fewer than three can be found, in which
/// case the item is not renderable under this type.
fn collect_distractor_ids(item: &Item, qtype: QuestionType, bank: &ItemBank) -> Option<[i64; 3]> {
    let mut seen = std::collections::HashSet::new();
    let mut ordered = Vec::new();

    let primary = match qtype {
        QuestionType::Synonym => strategy_b(item, qtype, bank),
        QuestionType::Antonym => strategy_c(item, qtype),
        _ => strategy_a(item, qtype, bank),
    };
    for candidates in [
        primary,
        strategy_a(item, qtype, bank),
        strategy_d(item, qtype),
        strategy_b(item, qtype, bank),
        strategy_c(item, qtype),
    ] {
        for id in candidates {
            if seen.insert(id) {
                ordered.push(id);
            }
            if ordered.len() >= 3 {
                break;
            }
        }
        if ordered.len() >= 3 {
            break;
        }
    }

    if ordered.len() < 3 {
        return None;
    }
    Some([ordered[0], ordered[1], ordered[2]])
}

/// Whether an item can be rendered under `qtype` at all: it must declare the
/// capability and at least three distractors must be resolvable.
pub fn is_renderable(item: &Item, qtype: QuestionType, bank: &ItemBank) -> bool {
    item.supports(qtype)
        && correct_answer_text(item, qtype).is_some()
        && collect_distractor_ids(item, qtype, bank).is_some()
}

/// Produces a concrete rendered question, or `None` if the item cannot be
/// rendered under `qtype`.
pub fn render(
    item: &Item,
    qtype: QuestionType,
    bank: &ItemBank,
    session_id: &str,
    seed: u64,
) -> Option<RenderedItem> {
    let correct_answer = correct_answer_text(item, qtype)?;
    let distractor_ids = collect_distractor_ids(item, qtype, bank)?;
    let distractor_text = |id: i64| -> String {
        bank.get(id)
            .and_then(|candidate| correct_answer_text(candidate, qtype))
            .unwrap_or_default()
    };
    let distractors = [
        distractor_text(distractor_ids[0]),
        distractor_text(distractor_ids[1]),
        distractor_text(distractor_ids[2]),
    ];

    let mut rng = make_rng_for(session_id, item.id, seed);
    let mut options = vec![correct_answer.clone()];
    options.extend(distractors.iter().cloned());
    options.shuffle(&mut rng);

    Some(RenderedItem {
        item_id: item.id,
        word: item.lemma.clone(),
        question_type: qtype,
        stem: stem_template(item, qtype),
        correct_answer,
        distractors,
        options,
        pos: item.pos,
        cefr: item.cefr,
        effective_b: item.effective_b(qtype),
        explanation: item.attributes.get("explanation").cloned(),
    })
}
