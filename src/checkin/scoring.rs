//! Check-in Scorer
//!
//! Pure arithmetic over the current answers:
//! - each "yes" earns the item's weight, floored at zero
//! - each slip-up costs a fixed penalty
//! - the slip-up total is clamped to [-15, 0]
//!
//! Negative day totals are valid (no positive items + slip-ups).

use serde::{Deserialize, Serialize};

use super::items::CheckInItem;
use super::responses::{Responses, SlipupFlags};

pub const SLIPUP_PENALTY: i64 = -5;
pub const MAX_SLIPUP_PENALTY: i64 = -15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Score {
    /// Sum of earned item weights, always >= 0
    pub positive: i64,
    /// Clamped slip-up penalty, in [-15, 0]
    pub negative: i64,
    pub total: i64,
}

/// Slip-up penalty for a set of flags
pub fn negative_points(slipups: &SlipupFlags) -> i64 {
    (SLIPUP_PENALTY * slipups.count() as i64).clamp(MAX_SLIPUP_PENALTY, 0)
}

/// Score the answers against the live item set.
///
/// Answers for keys outside `items` earn nothing.
pub fn score<'a, I>(items: I, responses: &Responses, slipups: &SlipupFlags) -> Score
where
    I: IntoIterator<Item = &'a CheckInItem>,
{
    let positive: i64 = items
        .into_iter()
        .filter(|item| responses.is_yes(item.key))
        .map(CheckInItem::effective_points)
        .sum();
    let negative = negative_points(slipups);

    Score {
        positive,
        negative,
        total: positive + negative,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkin::items::ItemKey;

    fn scenario_items() -> Vec<CheckInItem> {
        vec![
            CheckInItem::activity(1, "Workout", 10),
            CheckInItem::activity(2, "Steps", 15),
            CheckInItem::goal(1, "Water", 5),
        ]
    }

    fn scenario_answers() -> Responses {
        let items = scenario_items();
        let mut responses = Responses::unanswered(items.iter().map(|i| i.key));
        responses.answer(ItemKey::Activity(1), true);
        responses.answer(ItemKey::Activity(2), false);
        responses.answer(ItemKey::Goal(1), true);
        responses
    }

    #[test]
    fn test_mixed_answers_without_slipups() {
        let score = score(&scenario_items(), &scenario_answers(), &SlipupFlags::default());
        assert_eq!(score.total, 15);
        assert_eq!(score.positive, 15);
        assert_eq!(score.negative, 0);
    }

    #[test]
    fn test_two_slipups_cost_ten() {
        let slipups = SlipupFlags {
            junk_food: true,
            alcohol_excess: true,
            ..Default::default()
        };
        let score = score(&scenario_items(), &scenario_answers(), &slipups);
        assert_eq!(score.total, 5);
        assert_eq!(score.negative, -10);
    }

    #[test]
    fn test_all_slipups_floor_at_minus_fifteen() {
        let items = scenario_items();
        let mut responses = Responses::unanswered(items.iter().map(|i| i.key));
        for item in &items {
            responses.answer(item.key, false);
        }
        let slipups = SlipupFlags {
            junk_food: true,
            processed_sugar: true,
            alcohol_excess: true,
        };
        let score = score(&items, &responses, &slipups);
        assert_eq!(score.total, -15);
    }

    #[test]
    fn test_negative_points_always_within_bounds() {
        for mask in 0..8u8 {
            let flags = SlipupFlags {
                junk_food: mask & 1 != 0,
                processed_sugar: mask & 2 != 0,
                alcohol_excess: mask & 4 != 0,
            };
            let n = negative_points(&flags);
            assert!((MAX_SLIPUP_PENALTY..=0).contains(&n), "mask {} gave {}", mask, n);
        }
    }

    #[test]
    fn test_misconfigured_negative_weight_contributes_nothing() {
        let items = vec![CheckInItem::activity(1, "Broken", -20)];
        let mut responses = Responses::unanswered([ItemKey::Activity(1)]);
        responses.answer(ItemKey::Activity(1), true);
        assert_eq!(score(&items, &responses, &SlipupFlags::default()).total, 0);
    }

    #[test]
    fn test_empty_item_set_scores_only_slipups() {
        let slipups = SlipupFlags {
            processed_sugar: true,
            ..Default::default()
        };
        let none: [CheckInItem; 0] = [];
        assert_eq!(score(&none, &Responses::default(), &slipups).total, -5);
        assert_eq!(score(&none, &Responses::default(), &SlipupFlags::default()).total, 0);
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let items = scenario_items();
        let responses = scenario_answers();
        let slipups = SlipupFlags {
            junk_food: true,
            ..Default::default()
        };
        let first = score(&items, &responses, &slipups);
        let second = score(&items, &responses, &slipups);
        assert_eq!(first, second);
    }

    #[test]
    fn test_orphaned_yes_answers_earn_nothing() {
        let items = vec![CheckInItem::activity(1, "Workout", 10)];
        let mut responses = Responses::unanswered([ItemKey::Activity(1)]);
        responses.answer(ItemKey::Activity(1), false);
        responses.answer(ItemKey::Activity(77), true);
        assert_eq!(score(&items, &responses, &SlipupFlags::default()).total, 0);
    }
}
