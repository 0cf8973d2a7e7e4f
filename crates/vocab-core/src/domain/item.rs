use serde::{Deserialize, Serialize};

/// One of the six question types an item can be rendered under.
///
/// Numbering matches the wire contract (1-indexed): 1 Korean meaning,
/// 2 English definition, 3 synonym, 4 antonym, 5 cloze, 6 collocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum QuestionType {
    KoreanMeaning = 1,
    EnglishDefinition = 2,
    Synonym = 3,
    Antonym = 4,
    Cloze = 5,
    Collocation = 6,
}

impl QuestionType {
    pub const ALL: [QuestionType; 6] = [
        QuestionType::KoreanMeaning,
        QuestionType::EnglishDefinition,
        QuestionType::Synonym,
        QuestionType::Antonym,
        QuestionType::Cloze,
        QuestionType::Collocation,
    ];

    /// The fixed per-type difficulty offset applied only at render time.
    pub fn b_offset(self) -> f64 {
        match self {
            QuestionType::KoreanMeaning => 0.0,
            QuestionType::EnglishDefinition => 0.6,
            QuestionType::Synonym => 0.2,
            QuestionType::Antonym => 0.3,
            QuestionType::Cloze => 0.5,
            QuestionType::Collocation => 0.2,
        }
    }

    /// 5-dimension bucket this type scores into: semantic, relational, contextual.
    pub fn dimension(self) -> Dimension {
        match self {
            QuestionType::KoreanMeaning | QuestionType::EnglishDefinition => Dimension::Semantic,
            QuestionType::Synonym | QuestionType::Antonym => Dimension::Relational,
            QuestionType::Cloze | QuestionType::Collocation => Dimension::Contextual,
        }
    }
}

impl From<QuestionType> for u8 {
    fn from(qt: QuestionType) -> Self {
        qt as u8
    }
}

impl TryFrom<u8> for QuestionType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(QuestionType::KoreanMeaning),
            2 => Ok(QuestionType::EnglishDefinition),
            3 => Ok(QuestionType::Synonym),
            4 => Ok(QuestionType::Antonym),
            5 => Ok(QuestionType::Cloze),
            6 => Ok(QuestionType::Collocation),
            other => Err(format!("unknown question type: {other}")),
        }
    }
}

/// The five report dimensions. Form and Pragmatic are reserved:
/// no question type maps to them yet, so their score is always null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Semantic,
    Relational,
    Contextual,
    Form,
    Pragmatic,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::Semantic,
        Dimension::Relational,
        Dimension::Contextual,
        Dimension::Form,
        Dimension::Pragmatic,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartOfSpeech {
    Noun,
    Verb,
    Adjective,
    Adverb,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CefrBand {
    A1,
    A2,
    B1,
    B2,
    C1,
}

impl CefrBand {
    pub fn ordinal(self) -> u8 {
        match self {
            CefrBand::A1 => 1,
            CefrBand::A2 => 2,
            CefrBand::B1 => 3,
            CefrBand::B2 => 4,
            CefrBand::C1 => 5,
        }
    }

    pub fn next(self) -> Option<CefrBand> {
        match self {
            CefrBand::A1 => Some(CefrBand::A2),
            CefrBand::A2 => Some(CefrBand::B1),
            CefrBand::B1 => Some(CefrBand::B2),
            CefrBand::B2 => Some(CefrBand::C1),
            CefrBand::C1 => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurriculumBand {
    Elementary,
    Middle,
    High,
    Csat,
}

impl CurriculumBand {
    pub fn ordinal(self) -> u8 {
        match self {
            CurriculumBand::Elementary => 1,
            CurriculumBand::Middle => 2,
            CurriculumBand::High => 3,
            CurriculumBand::Csat => 4,
        }
    }
}

/// IRT parameters for an item. Always within the guard bounds by
/// construction: the initializer and calibration both clamp before building one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IrtParams {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl IrtParams {
    pub fn clamped(a: f64, b: f64, c: f64) -> Self {
        Self {
            a: a.clamp(0.3, 3.0),
            b: b.clamp(-4.0, 4.0),
            c: c.clamp(0.0, 0.4),
        }
    }
}

/// An item's raw capability and relation metadata: which question types it can
/// be rendered under, and graph neighbors used by the synonym/antonym strategies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemRelations {
    pub synonyms: Vec<i64>,
    pub antonyms: Vec<i64>,
    /// Siblings sharing a hypernym, used by distractor Strategy D.
    pub hypernym_siblings: Vec<i64>,
}

/// Immutable after initialization. Identity is `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub lemma: String,
    pub pos: PartOfSpeech,
    pub topic: String,
    pub cefr: CefrBand,
    pub curriculum: CurriculumBand,
    pub frequency_rank: u32,
    pub irt: IrtParams,
    pub capable_types: Vec<QuestionType>,
    pub relations: ItemRelations,
    /// English definition / Korean meaning / collocation text fields the
    /// renderer draws the correct answer and stem from. Kept as a flat map
    /// because the exact attribute set per question type is a rendering
    /// concern, not a modeling one.
    pub attributes: std::collections::HashMap<String, String>,
}

impl Item {
    pub fn supports(&self, qtype: QuestionType) -> bool {
        self.capable_types.contains(&qtype)
    }

    /// Effective difficulty under a given question type.
    pub fn effective_b(&self, qtype: QuestionType) -> f64 {
        self.irt.b + qtype.b_offset()
    }
}

/// An item projected into a concrete question. Never persisted;
/// regenerated deterministically from `(item_id, seed)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedItem {
    pub item_id: i64,
    pub word: String,
    pub question_type: QuestionType,
    pub stem: String,
    pub correct_answer: String,
    pub distractors: [String; 3],
    pub options: Vec<String>,
    pub pos: PartOfSpeech,
    pub cefr: CefrBand,
    pub effective_b: f64,
    pub explanation: Option<String>,
}
