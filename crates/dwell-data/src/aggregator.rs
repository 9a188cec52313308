//! Dwell-time aggregation and top-K ranking.
//!
//! Sums dwell seconds per URL or domain within one session timeline and
//! ranks the resulting keys.

use std::collections::HashMap;

use dwell_core::models::{Aggregate, GroupKey, RankedTopList, SessionTimeline};

// ── DwellAggregator ───────────────────────────────────────────────────────────

/// Stateless helper that groups timeline events by key.
pub struct DwellAggregator;

impl DwellAggregator {
    /// One [`Aggregate`] per distinct key, in first-occurrence order of the
    /// key in the (sorted) timeline. Empty timeline → empty set.
    pub fn aggregate(timeline: &SessionTimeline, group_key: GroupKey) -> Vec<Aggregate> {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut aggregates: Vec<Aggregate> = Vec::new();

        for event in &timeline.events {
            let key = group_key.select(event);
            match index.get(key) {
                Some(&i) => {
                    aggregates[i].total_seconds += event.dwell_seconds;
                    aggregates[i].events += 1;
                }
                None => {
                    index.insert(key, aggregates.len());
                    aggregates.push(Aggregate {
                        key: key.to_string(),
                        total_seconds: event.dwell_seconds,
                        events: 1,
                    });
                }
            }
        }

        aggregates
    }

    /// Rank `aggregates` by total dwell seconds, heaviest first, keeping at
    /// most `k`.
    ///
    /// Ties keep the order of `aggregates`, so feeding the output of
    /// [`DwellAggregator::aggregate`] ranks ties by first occurrence.
    pub fn rank(aggregates: &[Aggregate], group_key: GroupKey, k: usize) -> RankedTopList {
        let mut entries = aggregates.to_vec();
        // Stable sort: equal totals stay in input order.
        entries.sort_by(|a, b| b.total_seconds.total_cmp(&a.total_seconds));
        entries.truncate(k);
        RankedTopList {
            group_key,
            k,
            entries,
        }
    }

    /// Aggregate then rank in one step.
    pub fn top_k(timeline: &SessionTimeline, group_key: GroupKey, k: usize) -> RankedTopList {
        Self::rank(&Self::aggregate(timeline, group_key), group_key, k)
    }

    /// Sum of totals across `aggregates`.
    pub fn total_seconds(aggregates: &[Aggregate]) -> f64 {
        aggregates.iter().map(|a| a.total_seconds).sum()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use dwell_core::models::{ClockAnomalies, DwellEvent, DwellFraming};

    fn event(t: &str, url: &str, domain: &str, secs: f64) -> DwellEvent {
        DwellEvent {
            timestamp: NaiveDateTime::parse_from_str(t, "%Y-%m-%d %H:%M:%S").unwrap(),
            url: url.to_string(),
            domain: domain.to_string(),
            dwell_seconds: secs,
        }
    }

    fn timeline(events: Vec<DwellEvent>) -> SessionTimeline {
        SessionTimeline {
            session_id: "s1".to_string(),
            framing: DwellFraming::Next,
            events,
            anomalies: ClockAnomalies::default(),
        }
    }

    fn sample() -> SessionTimeline {
        timeline(vec![
            event("2024-03-01 10:00:00", "https://a.example.com/1", "example", 10.0),
            event("2024-03-01 10:00:10", "https://news.org/x", "news", 50.0),
            event("2024-03-01 10:01:00", "https://b.example.com/2", "example", 30.0),
            event("2024-03-01 10:01:30", "https://news.org/x", "news", 5.0),
            event("2024-03-01 10:01:35", "https://shop.io/", "shop", 0.0),
        ])
    }

    // ── aggregate ─────────────────────────────────────────────────────────────

    #[test]
    fn test_aggregate_by_domain() {
        let aggs = DwellAggregator::aggregate(&sample(), GroupKey::Domain);
        let rows: Vec<(&str, f64, usize)> = aggs
            .iter()
            .map(|a| (a.key.as_str(), a.total_seconds, a.events))
            .collect();
        assert_eq!(
            rows,
            vec![("example", 40.0, 2), ("news", 55.0, 2), ("shop", 0.0, 1)]
        );
    }

    #[test]
    fn test_aggregate_by_url() {
        let aggs = DwellAggregator::aggregate(&sample(), GroupKey::Url);
        assert_eq!(aggs.len(), 4);
        let news = aggs.iter().find(|a| a.key == "https://news.org/x").unwrap();
        assert_eq!(news.total_seconds, 55.0);
    }

    #[test]
    fn test_aggregate_keys_unique_and_total_preserved() {
        let tl = sample();
        for key in [GroupKey::Url, GroupKey::Domain] {
            let aggs = DwellAggregator::aggregate(&tl, key);
            let mut keys: Vec<&str> = aggs.iter().map(|a| a.key.as_str()).collect();
            keys.sort();
            keys.dedup();
            assert_eq!(keys.len(), aggs.len());
            assert!(
                (DwellAggregator::total_seconds(&aggs) - tl.total_dwell_seconds()).abs() < 1e-9
            );
        }
    }

    #[test]
    fn test_aggregate_empty_timeline() {
        let aggs = DwellAggregator::aggregate(&timeline(vec![]), GroupKey::Domain);
        assert!(aggs.is_empty());
        assert!(DwellAggregator::top_k(&timeline(vec![]), GroupKey::Url, 5).is_empty());
    }

    #[test]
    fn test_three_distinct_domains_total_ninety() {
        let tl = timeline(vec![
            event("2024-03-01 10:00:00", "a.com", "a", 30.0),
            event("2024-03-01 10:00:30", "b.com", "b", 60.0),
            event("2024-03-01 10:01:30", "c.com", "c", 0.0),
        ]);
        let aggs = DwellAggregator::aggregate(&tl, GroupKey::Domain);
        assert_eq!(aggs.len(), 3);
        assert_eq!(DwellAggregator::total_seconds(&aggs), 90.0);
    }

    // ── rank ──────────────────────────────────────────────────────────────────

    #[test]
    fn test_rank_descending() {
        let top = DwellAggregator::top_k(&sample(), GroupKey::Domain, 5);
        let keys: Vec<&str> = top.entries.iter().map(|a| a.key.as_str()).collect();
        assert_eq!(keys, vec!["news", "example", "shop"]);
        assert_eq!(top.group_key, GroupKey::Domain);
        assert_eq!(top.k, 5);
    }

    #[test]
    fn test_rank_truncates_to_k() {
        let top = DwellAggregator::top_k(&sample(), GroupKey::Url, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top.entries[0].key, "https://news.org/x");
        assert_eq!(top.entries[1].key, "https://b.example.com/2");
    }

    #[test]
    fn test_rank_ties_keep_first_occurrence() {
        let tl = timeline(vec![
            event("2024-03-01 10:00:00", "z.com", "z", 20.0),
            event("2024-03-01 10:00:20", "m.com", "m", 20.0),
            event("2024-03-01 10:00:40", "a.com", "a", 20.0),
            event("2024-03-01 10:01:00", "big.com", "big", 40.0),
        ]);
        let top = DwellAggregator::top_k(&tl, GroupKey::Domain, 3);
        let keys: Vec<&str> = top.entries.iter().map(|a| a.key.as_str()).collect();
        assert_eq!(keys, vec!["big", "z", "m"]);
    }

    #[test]
    fn test_rank_is_idempotent() {
        let tl = sample();
        let first = DwellAggregator::top_k(&tl, GroupKey::Url, 4);
        let second = DwellAggregator::top_k(&tl, GroupKey::Url, 4);
        assert_eq!(first, second);
        assert_eq!(
            DwellAggregator::aggregate(&tl, GroupKey::Domain),
            DwellAggregator::aggregate(&tl, GroupKey::Domain)
        );
    }

    #[test]
    fn test_rank_output_is_non_increasing() {
        let top = DwellAggregator::top_k(&sample(), GroupKey::Url, 10);
        assert!(top.len() <= 10);
        assert!(top
            .entries
            .windows(2)
            .all(|w| w[0].total_seconds >= w[1].total_seconds));
    }
}
