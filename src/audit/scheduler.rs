//! Source scheduling.
//!
//! Archived segments whose probed window overlaps the requested range are
//! kept and ordered; the live log is placed before them when reading
//! newest-first and after them when reading oldest-first.

use crate::audit::predicate::TimeRange;
use crate::audit::types::DayWindow;

/// Processing order for archived segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceOrder {
    #[default]
    OldestFirst,
    NewestFirst,
}

/// Standard interval overlap; touching boundaries count.
pub fn overlaps(window: &DayWindow, range: &TimeRange) -> bool {
    window.min <= range.end() && window.max >= range.start()
}

/// Keep the archives that overlap `range` and sort them for `order`.
///
/// Oldest-first sorts ascending by window start, newest-first descending by
/// window end. The sort is stable.
pub fn schedule_archives<T>(
    candidates: Vec<(DayWindow, T)>,
    range: &TimeRange,
    order: SourceOrder,
) -> Vec<(DayWindow, T)> {
    let mut relevant: Vec<(DayWindow, T)> = candidates
        .into_iter()
        .filter(|(window, _)| overlaps(window, range))
        .collect();

    match order {
        SourceOrder::OldestFirst => relevant.sort_by(|a, b| a.0.min.cmp(&b.0.min)),
        SourceOrder::NewestFirst => relevant.sort_by(|a, b| b.0.max.cmp(&a.0.max)),
    }
    relevant
}

/// One step of a run, in processing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanEntry<T> {
    Live(T),
    Archive {
        /// 1-based position among the scheduled archives.
        index: usize,
        window: DayWindow,
        source: T,
    },
}

/// Full processing order: scheduled archives plus the live log in its place.
pub fn plan_sources<T>(
    archives: Vec<(DayWindow, T)>,
    live: Option<T>,
    range: &TimeRange,
    order: SourceOrder,
) -> Vec<PlanEntry<T>> {
    let scheduled = schedule_archives(archives, range, order);
    let mut plan: Vec<PlanEntry<T>> = Vec::with_capacity(scheduled.len() + 1);

    let mut live = live;
    if order == SourceOrder::NewestFirst {
        if let Some(source) = live.take() {
            plan.push(PlanEntry::Live(source));
        }
    }

    plan.extend(
        scheduled
            .into_iter()
            .enumerate()
            .map(|(i, (window, source))| PlanEntry::Archive {
                index: i + 1,
                window,
                source,
            }),
    );

    if let Some(source) = live {
        plan.push(PlanEntry::Live(source));
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn window(min: &str, max: &str) -> DayWindow {
        DayWindow {
            min: day(min),
            max: day(max),
        }
    }

    fn range(start: &str, end: &str) -> TimeRange {
        TimeRange::parse(start, end).unwrap()
    }

    #[test]
    fn test_overlap_matches_interval_rule() {
        let r = range("2025-10-10", "2025-10-20");
        let cases = [
            (window("2025-10-01", "2025-10-09"), false),
            (window("2025-10-01", "2025-10-10"), true),
            (window("2025-10-12", "2025-10-15"), true),
            (window("2025-10-20", "2025-10-25"), true),
            (window("2025-10-21", "2025-10-25"), false),
            (window("2025-10-01", "2025-10-31"), true),
        ];
        for (w, expected) in cases {
            assert_eq!(overlaps(&w, &r), expected, "window {}", w);
            assert_eq!(overlaps(&w, &r), w.min <= r.end() && w.max >= r.start());
        }
    }

    #[test]
    fn test_oldest_first_is_non_decreasing_by_min() {
        let r = range("2025-10-01", "2025-11-07");
        let archives = vec![
            (window("2025-10-20", "2025-10-25"), "c"),
            (window("2025-09-01", "2025-09-05"), "skip"),
            (window("2025-10-01", "2025-10-05"), "a"),
            (window("2025-10-10", "2025-10-12"), "b"),
        ];

        let scheduled = schedule_archives(archives, &r, SourceOrder::OldestFirst);
        let names: Vec<_> = scheduled.iter().map(|(_, n)| *n).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(scheduled.windows(2).all(|p| p[0].0.min <= p[1].0.min));
    }

    #[test]
    fn test_newest_first_is_non_increasing_by_max() {
        let r = range("2025-10-01", "2025-11-07");
        let archives = vec![
            (window("2025-10-01", "2025-10-05"), "a"),
            (window("2025-10-20", "2025-10-25"), "c"),
            (window("2025-10-10", "2025-10-12"), "b"),
        ];

        let scheduled = schedule_archives(archives, &r, SourceOrder::NewestFirst);
        let names: Vec<_> = scheduled.iter().map(|(_, n)| *n).collect();
        assert_eq!(names, vec!["c", "b", "a"]);
        assert!(scheduled.windows(2).all(|p| p[0].0.max >= p[1].0.max));
    }

    #[test]
    fn test_live_placement() {
        let r = range("2025-10-01", "2025-11-07");
        let archives = || {
            vec![
                (window("2025-10-01", "2025-10-05"), "a"),
                (window("2025-10-10", "2025-10-12"), "b"),
            ]
        };

        let plan = plan_sources(archives(), Some("live"), &r, SourceOrder::NewestFirst);
        assert_eq!(plan[0], PlanEntry::Live("live"));
        assert!(matches!(plan[1], PlanEntry::Archive { index: 1, source: "b", .. }));

        let plan = plan_sources(archives(), Some("live"), &r, SourceOrder::OldestFirst);
        assert!(matches!(plan[0], PlanEntry::Archive { index: 1, source: "a", .. }));
        assert!(matches!(plan[1], PlanEntry::Archive { index: 2, source: "b", .. }));
        assert_eq!(plan[2], PlanEntry::Live("live"));
    }

    #[test]
    fn test_no_overlapping_archives_leaves_only_live() {
        let r = range("2025-12-01", "2025-12-02");
        let archives = vec![(window("2025-10-01", "2025-10-05"), "a")];

        let plan = plan_sources(archives, Some("live"), &r, SourceOrder::OldestFirst);
        assert_eq!(plan, vec![PlanEntry::Live("live")]);

        let plan = plan_sources(Vec::<(DayWindow, &str)>::new(), None, &r, SourceOrder::NewestFirst);
        assert!(plan.is_empty());
    }
}
