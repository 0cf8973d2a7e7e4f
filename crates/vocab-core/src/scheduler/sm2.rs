//! The SM-2 spaced-repetition update.

use chrono::{DateTime, Duration, Utc};

use crate::domain::{AssessmentEvent, LearnedWord};

const MIN_EASE_FACTOR: f64 = 1.3;
const MASTERY_MIN_REVIEWS: u32 = 5;
const MASTERY_MIN_ACCURACY: f64 = 0.80;
const MASTERY_MIN_INTERVAL_DAYS: u32 = 7;

fn round_interval(days: f64) -> u32 {
    days.round().max(0.0) as u32
}

/// Applies one self-rating to a word, mutating interval, ease factor, review
/// counters, and mastery status in place.
pub fn apply_rating(word: &mut LearnedWord, self_rating: u8, is_correct: bool, now: DateTime<Utc>) {
    // The "first review" special case is about the first *passing* rating,
    // not total review count: a word that already took an s=0/s=1 lapse has
    // review_count > 0 by the time it first passes, but still graduates.
    let graduating = !word.has_graduated;

    match self_rating {
        0 => {
            word.interval_days = 0;
            word.ease_factor = (word.ease_factor - 0.20).max(MIN_EASE_FACTOR);
        }
        1 => {
            word.interval_days = round_interval((word.interval_days as f64 * 1.2).max(1.0));
            word.ease_factor = (word.ease_factor - 0.15).max(MIN_EASE_FACTOR);
        }
        2 => {
            word.interval_days = if graduating {
                1
            } else {
                round_interval(word.interval_days as f64 * word.ease_factor)
            };
            word.has_graduated = true;
        }
        3 => {
            word.interval_days = if graduating {
                4
            } else {
                round_interval(word.interval_days as f64 * word.ease_factor * 1.3)
            };
            word.ease_factor += 0.15;
            word.has_graduated = true;
        }
        other => {
            // Unknown ratings are treated as the most conservative response
            // (s=0) rather than panicking on malformed client input.
            debug_assert!(false, "self_rating out of range: {other}");
            word.interval_days = 0;
            word.ease_factor = (word.ease_factor - 0.20).max(MIN_EASE_FACTOR);
        }
    }

    word.next_review_at = now + Duration::hours(i64::from(word.interval_days) * 24);
    word.assessment_history.push(AssessmentEvent {
        timestamp: now,
        self_rating,
        is_correct,
    });
    word.review_count += 1;
    // Mastery accuracy tracks whether the answer was actually correct, not
    // the self-assessed ease rating: a learner can rate a correct answer
    // "again" out of uncertainty, which shouldn't by itself cap accuracy.
    if is_correct {
        word.correct_count += 1;
    }
    word.last_reviewed_at = Some(now);

    if !word.is_mastered
        && word.review_count >= MASTERY_MIN_REVIEWS
        && word.accuracy() >= MASTERY_MIN_ACCURACY
        && word.interval_days >= MASTERY_MIN_INTERVAL_DAYS
    {
        word.is_mastered = true;
        word.mastered_at = Some(now);
    }
}
