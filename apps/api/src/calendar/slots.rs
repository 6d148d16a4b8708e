//! Free-Slot Calculator — pure, deterministic complement of a set of busy
//! intervals within a window. The union of emitted slots and the (implicitly
//! merged) busy intervals tiles `[window_start, window_end]`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::BusyPeriod;

/// A contiguous interval with no calendar commitment, at or above the
/// minimum usable duration. Optionally embedded into a nudge record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Whole minutes, floored. Absent on slots echoed back by the AI matcher.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i64>,
}

/// Computes the ordered free slots of at least `min_minutes` within
/// `[window_start, window_end]`, given an unordered list of busy intervals.
///
/// Sweep: sort busy ascending by start; walk a cursor from `window_start`.
/// A gap `[cursor, busy.start)` is emitted when it meets the minimum; the
/// cursor then advances to `max(cursor, busy.end)` regardless, which merges
/// overlapping intervals without an explicit merge pass. Intervals entirely
/// before the window never move the cursor backward. The trailing gap up to
/// `window_end` is emitted under the same minimum.
pub fn find_free_slots(
    busy_periods: &[BusyPeriod],
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    min_minutes: i64,
) -> Vec<CalendarSlot> {
    let mut sorted: Vec<&BusyPeriod> = busy_periods.iter().collect();
    sorted.sort_by_key(|p| p.start);

    let mut free_slots = Vec::new();
    let mut cursor = window_start;

    for busy in sorted {
        if cursor < busy.start {
            push_if_long_enough(&mut free_slots, cursor, busy.start.min(window_end), min_minutes);
        }
        if busy.end > cursor {
            cursor = busy.end;
        }
    }

    if cursor < window_end {
        push_if_long_enough(&mut free_slots, cursor, window_end, min_minutes);
    }

    free_slots
}

fn push_if_long_enough(
    slots: &mut Vec<CalendarSlot>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    min_minutes: i64,
) {
    let duration_minutes = (end - start).num_minutes(); // floor of whole minutes
    if duration_minutes >= min_minutes {
        slots.push(CalendarSlot {
            start,
            end,
            duration_minutes: Some(duration_minutes),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap()
    }

    fn busy(start_min: i64, end_min: i64) -> BusyPeriod {
        BusyPeriod {
            start: t0() + Duration::minutes(start_min),
            end: t0() + Duration::minutes(end_min),
        }
    }

    #[test]
    fn test_no_busy_periods_yields_whole_window() {
        let slots = find_free_slots(&[], t0(), t0() + Duration::minutes(120), 15);
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].start, t0());
        assert_eq!(slots[0].end, t0() + Duration::minutes(120));
        assert_eq!(slots[0].duration_minutes, Some(120));
    }

    #[test]
    fn test_window_shorter_than_minimum_yields_nothing() {
        let slots = find_free_slots(&[], t0(), t0() + Duration::minutes(10), 15);
        assert!(slots.is_empty());
    }

    #[test]
    fn test_both_gaps_too_short() {
        // busy [10,20) in a 30-minute window: gaps of 10 and 10, min 15
        let slots = find_free_slots(&[busy(10, 20)], t0(), t0() + Duration::minutes(30), 15);
        assert!(slots.is_empty());
    }

    #[test]
    fn test_overlapping_busy_periods_merge() {
        // [0,30) and [20,50) merge; only [50,80) remains, duration 30
        let slots = find_free_slots(
            &[busy(0, 30), busy(20, 50)],
            t0(),
            t0() + Duration::minutes(80),
            15,
        );
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].start, t0() + Duration::minutes(50));
        assert_eq!(slots[0].end, t0() + Duration::minutes(80));
        assert_eq!(slots[0].duration_minutes, Some(30));
    }

    #[test]
    fn test_unsorted_input_is_sorted_first() {
        let slots = find_free_slots(
            &[busy(60, 75), busy(20, 40)],
            t0(),
            t0() + Duration::minutes(120),
            15,
        );
        assert_eq!(slots.len(), 3);
        assert_eq!(slots[0].duration_minutes, Some(20)); // [0,20)
        assert_eq!(slots[1].duration_minutes, Some(20)); // [40,60)
        assert_eq!(slots[2].duration_minutes, Some(45)); // [75,120)
    }

    #[test]
    fn test_interval_entirely_before_window_is_ignored() {
        let slots = find_free_slots(
            &[busy(-60, -30)],
            t0(),
            t0() + Duration::minutes(120),
            15,
        );
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].duration_minutes, Some(120));
    }

    #[test]
    fn test_interval_straddling_window_start() {
        // busy [-30,40): cursor jumps to 40, slot is [40,120)
        let slots = find_free_slots(
            &[busy(-30, 40)],
            t0(),
            t0() + Duration::minutes(120),
            15,
        );
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].start, t0() + Duration::minutes(40));
        assert_eq!(slots[0].duration_minutes, Some(80));
    }

    #[test]
    fn test_inverted_interval_does_not_move_cursor_backward() {
        // Malformed interval with end before start. The gap [0,30) is emitted,
        // then the cursor advances only to 20 (max rule), so the trailing gap
        // is [20,60). Overlap is accepted for malformed input.
        let inverted = BusyPeriod {
            start: t0() + Duration::minutes(30),
            end: t0() + Duration::minutes(20),
        };
        let slots = find_free_slots(&[inverted], t0(), t0() + Duration::minutes(60), 15);
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].duration_minutes, Some(30));
        assert_eq!(slots[1].start, t0() + Duration::minutes(20));
        assert_eq!(slots[1].duration_minutes, Some(40));
    }

    #[test]
    fn test_duration_is_floored_not_rounded() {
        // 19 minutes 45 seconds free: floors to 19
        let busy_period = BusyPeriod {
            start: t0() + Duration::seconds(19 * 60 + 45),
            end: t0() + Duration::minutes(60),
        };
        let slots = find_free_slots(&[busy_period], t0(), t0() + Duration::minutes(60), 15);
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].duration_minutes, Some(19));
    }

    #[test]
    fn test_slots_tile_the_window_with_busy_regions() {
        // Adjacent busy [20,40) and [40,70): one merged region, two slots
        let slots = find_free_slots(
            &[busy(20, 40), busy(40, 70)],
            t0(),
            t0() + Duration::minutes(120),
            15,
        );
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].start, t0());
        assert_eq!(slots[0].end, t0() + Duration::minutes(20));
        assert_eq!(slots[1].start, t0() + Duration::minutes(70));
        assert_eq!(slots[1].end, t0() + Duration::minutes(120));
    }
}
