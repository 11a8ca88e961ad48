//! Reading arbitration - decides whether a new reading replaces the best one.
//!
//! Recency and accuracy both signal quality, and neither wins outright:
//!
//! 1. No current best: anything is accepted
//! 2. Outside the staleness window, age alone decides (newer wins)
//! 3. Inside the window, a more accurate reading wins
//! 4. A newer reading that is not less accurate wins
//! 5. A newer, slightly less accurate reading wins only from the same provider
//!
//! # Accuracy truncation
//!
//! The accuracy delta is truncated toward zero to a whole number of meters
//! before any threshold comparison ([`truncated_accuracy_delta`]). A candidate
//! that is 0.9m worse therefore counts as "not less accurate", and one 200.9m
//! worse is still within the significance limit.

use std::time::Duration;

use chrono::TimeDelta;

use crate::reading::Reading;

/// Age difference beyond which recency alone decides.
pub const STALENESS_WINDOW: Duration = Duration::from_secs(120);

/// Truncated accuracy loss (meters) above which a reading is "significantly" worse.
pub const SIGNIFICANT_ACCURACY_LOSS: i64 = 200;

/// Policy deciding whether a candidate reading should become the new best.
///
/// Implementations must be pure and total.
pub trait ReadingComparator: Send + Sync {
    fn is_better(&self, candidate: &Reading, current: Option<&Reading>) -> bool;
}

/// Default arbitration policy: staleness window, then accuracy, then provider identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecencyAccuracyComparator;

impl ReadingComparator for RecencyAccuracyComparator {
    fn is_better(&self, candidate: &Reading, current: Option<&Reading>) -> bool {
        is_better(candidate, current)
    }
}

/// Accuracy difference `candidate - current`, truncated toward zero.
///
/// Non-finite differences collapse to 0 and out-of-range ones saturate.
pub fn truncated_accuracy_delta(candidate: &Reading, current: &Reading) -> i64 {
    (candidate.accuracy.meters() - current.accuracy.meters()).trunc() as i64
}

/// Returns true if `candidate` should replace `current`.
pub fn is_better(candidate: &Reading, current: Option<&Reading>) -> bool {
    let Some(current) = current else {
        return true;
    };

    let window = staleness_window();
    let time_delta = candidate.timestamp - current.timestamp;

    if time_delta > window {
        return true;
    }
    if time_delta < -window {
        return false;
    }

    let accuracy_delta = truncated_accuracy_delta(candidate, current);
    let less_accurate = accuracy_delta > 0;
    let more_accurate = accuracy_delta < 0;
    let significantly_less_accurate = accuracy_delta > SIGNIFICANT_ACCURACY_LOSS;

    let is_newer = time_delta > TimeDelta::zero();
    let same_provider = candidate
        .provider
        .as_ref()
        .is_some_and(|id| current.provider.as_ref() == Some(id));

    if more_accurate {
        return true;
    }
    if is_newer && !less_accurate {
        return true;
    }
    is_newer && !significantly_less_accurate && same_provider
}

fn staleness_window() -> TimeDelta {
    TimeDelta::seconds(STALENESS_WINDOW.as_secs() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn base_time() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn at(offset_ms: i64, accuracy: f32, provider: Option<&str>) -> Reading {
        let r = Reading::new(
            53.5,
            10.0,
            accuracy,
            base_time() + TimeDelta::milliseconds(offset_ms),
        );
        match provider {
            Some(p) => r.with_provider(p),
            None => r,
        }
    }

    #[test]
    fn test_anything_beats_absent() {
        assert!(is_better(&at(0, 5000.0, None), None));
    }

    #[test]
    fn test_significantly_newer_wins_even_when_much_worse() {
        let current = at(0, 5.0, Some("gps"));
        let candidate = at(120_001, 4000.0, Some("network"));
        assert!(is_better(&candidate, Some(&current)));
    }

    #[test]
    fn test_significantly_older_loses_even_when_much_better() {
        let current = at(120_001, 4000.0, Some("network"));
        let candidate = at(0, 1.0, Some("gps"));
        assert!(!is_better(&candidate, Some(&current)));
    }

    #[test]
    fn test_exactly_window_apart_falls_through_to_accuracy() {
        // 120s exactly is not "significantly" newer
        let current = at(0, 5.0, Some("gps"));
        let candidate = at(120_000, 400.0, Some("network"));
        assert!(!is_better(&candidate, Some(&current)));

        // ...nor significantly older
        let current = at(120_000, 50.0, Some("network"));
        let candidate = at(0, 10.0, Some("gps"));
        assert!(is_better(&candidate, Some(&current)));
    }

    #[test]
    fn test_more_accurate_wins_even_if_older() {
        let current = at(10_000, 50.0, Some("network"));
        let candidate = at(0, 10.0, Some("gps"));
        assert!(is_better(&candidate, Some(&current)));
    }

    #[test]
    fn test_newer_and_equally_accurate_wins() {
        let current = at(0, 20.0, Some("network"));
        let candidate = at(1_000, 20.0, Some("gps"));
        assert!(is_better(&candidate, Some(&current)));
    }

    #[test]
    fn test_same_timestamp_same_accuracy_loses() {
        let current = at(0, 20.0, Some("gps"));
        let candidate = at(0, 20.0, Some("gps"));
        assert!(!is_better(&candidate, Some(&current)));
    }

    #[test]
    fn test_newer_slightly_worse_same_provider_wins() {
        let current = at(0, 10.0, Some("gps"));
        let candidate = at(1_000, 150.0, Some("gps"));
        assert!(is_better(&candidate, Some(&current)));
    }

    #[test]
    fn test_newer_slightly_worse_other_provider_loses() {
        let current = at(0, 10.0, Some("gps"));
        let candidate = at(1_000, 150.0, Some("network"));
        assert!(!is_better(&candidate, Some(&current)));
    }

    #[test]
    fn test_newer_significantly_worse_same_provider_loses() {
        let current = at(0, 10.0, Some("gps"));
        let candidate = at(1_000, 211.0, Some("gps"));
        assert!(!is_better(&candidate, Some(&current)));
    }

    #[test]
    fn test_absent_provider_never_matches() {
        let current = at(0, 10.0, None);
        let candidate = at(1_000, 50.0, None);
        assert!(!is_better(&candidate, Some(&current)));
    }

    #[test]
    fn test_truncation_treats_sub_meter_loss_as_equal() {
        // 0.9m worse truncates to 0, so a newer reading is "not less accurate"
        let current = at(0, 10.0, Some("gps"));
        let candidate = at(1_000, 10.9, Some("network"));
        assert_eq!(truncated_accuracy_delta(&candidate, &current), 0);
        assert!(is_better(&candidate, Some(&current)));
    }

    #[test]
    fn test_truncation_at_significance_boundary() {
        let current = at(0, 10.0, Some("gps"));

        // 200.9m worse truncates to 200, still within the limit
        let candidate = at(1_000, 210.9, Some("gps"));
        assert_eq!(truncated_accuracy_delta(&candidate, &current), 200);
        assert!(is_better(&candidate, Some(&current)));

        let candidate = at(1_000, 211.0, Some("gps"));
        assert_eq!(truncated_accuracy_delta(&candidate, &current), 201);
        assert!(!is_better(&candidate, Some(&current)));
    }

    #[test]
    fn test_truncation_of_sub_meter_gain() {
        // 0.5m better truncates to 0: an older reading is not "more accurate"
        let current = at(1_000, 10.5, Some("gps"));
        let candidate = at(0, 10.0, Some("gps"));
        assert_eq!(truncated_accuracy_delta(&candidate, &current), 0);
        assert!(!is_better(&candidate, Some(&current)));
    }

    #[test]
    fn test_trait_delegates_to_policy() {
        let comparator = RecencyAccuracyComparator;
        let current = at(0, 50.0, None);
        let candidate = at(1_000, 10.0, None);
        assert!(comparator.is_better(&candidate, Some(&current)));
        assert!(!comparator.is_better(&current, Some(&candidate)));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use chrono::{DateTime, Utc};
    use proptest::prelude::*;

    const WINDOW_MS: i64 = 120_000;

    fn reading(offset_ms: i64, accuracy: f32, provider: Option<String>) -> Reading {
        let base = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        let r = Reading::new(0.0, 0.0, accuracy, base + TimeDelta::milliseconds(offset_ms));
        match provider {
            Some(p) => r.with_provider(p),
            None => r,
        }
    }

    fn provider() -> impl Strategy<Value = Option<String>> {
        prop::option::of(prop::sample::select(vec![
            "gps".to_string(),
            "network".to_string(),
            "fused".to_string(),
        ]))
    }

    proptest! {
        /// Nothing loses against an empty best.
        #[test]
        fn absent_current_always_accepts(
            offset in -1_000_000i64..1_000_000,
            acc in 0.0f32..100_000.0,
            p in provider(),
        ) {
            prop_assert!(is_better(&reading(offset, acc, p), None));
        }

        /// Beyond the window, newer wins regardless of accuracy or provider.
        #[test]
        fn significantly_newer_always_wins(
            gap in (WINDOW_MS + 1)..10_000_000,
            a_acc in 0.0f32..100_000.0,
            b_acc in 0.0f32..100_000.0,
            a_p in provider(),
            b_p in provider(),
        ) {
            let current = reading(0, b_acc, b_p);
            let candidate = reading(gap, a_acc, a_p);
            prop_assert!(is_better(&candidate, Some(&current)));
        }

        /// Beyond the window, older loses regardless of accuracy or provider.
        #[test]
        fn significantly_older_always_loses(
            gap in (WINDOW_MS + 1)..10_000_000,
            a_acc in 0.0f32..100_000.0,
            b_acc in 0.0f32..100_000.0,
            a_p in provider(),
            b_p in provider(),
        ) {
            let current = reading(gap, b_acc, b_p);
            let candidate = reading(0, a_acc, a_p);
            prop_assert!(!is_better(&candidate, Some(&current)));
        }

        /// Newer within the window and not less accurate always wins.
        #[test]
        fn newer_and_not_less_accurate_wins(
            gap in 1i64..=WINDOW_MS,
            b_acc in 0u32..10_000,
            gain in 0u32..10_000,
            a_p in provider(),
            b_p in provider(),
        ) {
            let b_acc = b_acc as f32;
            let a_acc = (b_acc - gain as f32).max(0.0);
            let current = reading(0, b_acc, b_p);
            let candidate = reading(gap, a_acc, a_p);
            prop_assert!(is_better(&candidate, Some(&current)));
        }

        /// Newer, slightly less accurate: provider identity decides.
        #[test]
        fn slight_loss_decided_by_provider(
            gap in 1i64..=WINDOW_MS,
            b_acc in 0u32..10_000,
            loss in 1u32..=200,
        ) {
            let current = reading(0, b_acc as f32, Some("gps".into()));
            let same = reading(gap, (b_acc + loss) as f32, Some("gps".into()));
            let other = reading(gap, (b_acc + loss) as f32, Some("network".into()));
            prop_assert!(is_better(&same, Some(&current)));
            prop_assert!(!is_better(&other, Some(&current)));
        }

        /// Never panics, even on values validation would refuse.
        #[test]
        fn total_over_any_floats(
            offset in any::<i32>(),
            a_acc in prop::num::f32::ANY,
            b_acc in prop::num::f32::ANY,
        ) {
            let current = reading(0, b_acc, None);
            let candidate = reading(offset as i64, a_acc, None);
            let _ = is_better(&candidate, Some(&current));
        }
    }
}
