//! Derives `a`, `b`, `c` for an item from its raw metadata. Purely
//! deterministic and pure: recomputed from metadata on cold start, never
//! persisted.

use crate::domain::{CefrBand, CurriculumBand, IrtParams, PartOfSpeech};

/// The raw, ordinal encodings `initialize_params` weighs into `b`: CEFR band,
/// frequency decile, GSE band, curriculum band, Lexile band.
#[derive(Debug, Clone, Copy)]
pub struct RawItemMetadata {
    pub cefr: CefrBand,
    pub frequency_decile: u8,
    pub gse_band: u8,
    pub curriculum: CurriculumBand,
    pub lexile_band: u8,
    pub pos: PartOfSpeech,
    pub is_topic_specific: bool,
    pub has_rich_synonym_graph: bool,
    pub rendering_mode: RenderingMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderingMode {
    FourOptionMcq,
    Binary,
}

impl RenderingMode {
    fn fixed_c(self) -> f64 {
        match self {
            RenderingMode::FourOptionMcq => 0.20,
            RenderingMode::Binary => 0.40,
        }
    }
}

/// Weighted average over the five ordinal encodings, scaled to [-2.5, 2.5].
fn compute_b(meta: &RawItemMetadata) -> f64 {
    // Each ordinal is normalized to [0, 1] over its own band count, then the
    // five are averaged with equal weight and mapped onto [-2.5, 2.5].
    let cefr_norm = (meta.cefr.ordinal() as f64 - 1.0) / 4.0;
    let freq_norm = (meta.frequency_decile.min(9) as f64) / 9.0;
    let gse_norm = (meta.gse_band.min(9) as f64) / 9.0;
    let curriculum_norm = (meta.curriculum.ordinal() as f64 - 1.0) / 3.0;
    let lexile_norm = (meta.lexile_band.min(9) as f64) / 9.0;

    let average = (cefr_norm + freq_norm + gse_norm + curriculum_norm + lexile_norm) / 5.0;
    // average in [0, 1] -> [-2.5, 2.5]
    (average - 0.5) * 5.0
}

/// Base 1.0 plus small increments for topic-specific words, rich synonym
/// graph, rare POS; clamped to [0.5, 2.0].
fn compute_a(meta: &RawItemMetadata) -> f64 {
    let mut a: f64 = 1.0;
    if meta.is_topic_specific {
        a += 0.15;
    }
    if meta.has_rich_synonym_graph {
        a += 0.15;
    }
    if matches!(meta.pos, PartOfSpeech::Other) {
        a += 0.10;
    }
    a.clamp(0.5, 2.0)
}

/// `c` is fixed per rendering mode, not per item.
pub fn initialize_params(meta: &RawItemMetadata) -> IrtParams {
    let a = compute_a(meta);
    let b = compute_b(meta);
    let c = meta.rendering_mode.fixed_c();
    IrtParams::clamped(a, b, c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(cefr: CefrBand, curriculum: CurriculumBand) -> RawItemMetadata {
        RawItemMetadata {
            cefr,
            frequency_decile: 5,
            gse_band: 5,
            curriculum,
            lexile_band: 5,
            pos: PartOfSpeech::Noun,
            is_topic_specific: false,
            has_rich_synonym_graph: false,
            rendering_mode: RenderingMode::FourOptionMcq,
        }
    }

    #[test]
    fn a1_elementary_item_has_lower_b_than_c1_csat_item() {
        let easy = initialize_params(&meta(CefrBand::A1, CurriculumBand::Elementary));
        let hard = initialize_params(&meta(CefrBand::C1, CurriculumBand::Csat));
        assert!(easy.b < hard.b);
    }

    #[test]
    fn four_option_mcq_fixes_c_at_point_two() {
        let params = initialize_params(&meta(CefrBand::B1, CurriculumBand::Middle));
        assert_eq!(params.c, 0.20);
    }

    #[test]
    fn binary_mode_fixes_c_at_point_four() {
        let mut raw = meta(CefrBand::B1, CurriculumBand::Middle);
        raw.rendering_mode = RenderingMode::Binary;
        let params = initialize_params(&raw);
        assert_eq!(params.c, 0.40);
    }

    #[test]
    fn topic_specific_and_rich_graph_increase_discrimination() {
        let mut plain = meta(CefrBand::B1, CurriculumBand::Middle);
        let baseline = initialize_params(&plain);
        plain.is_topic_specific = true;
        plain.has_rich_synonym_graph = true;
        let boosted = initialize_params(&plain);
        assert!(boosted.a > baseline.a);
    }

    #[test]
    fn discrimination_is_always_within_guard_bounds() {
        let mut raw = meta(CefrBand::C1, CurriculumBand::Csat);
        raw.is_topic_specific = true;
        raw.has_rich_synonym_graph = true;
        raw.pos = PartOfSpeech::Other;
        let params = initialize_params(&raw);
        assert!(params.a <= 2.0);
        assert!(params.a >= 0.5);
    }

    #[test]
    fn b_is_always_within_scaled_range() {
        let params = initialize_params(&meta(CefrBand::A1, CurriculumBand::Elementary));
        assert!(params.b >= -2.5 && params.b <= 2.5);
    }
}
