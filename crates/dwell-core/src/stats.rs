use std::collections::HashMap;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

// ── Percentile helper ─────────────────────────────────────────────────────────

/// Compute the `p`-th percentile of a **sorted** slice using standard linear
/// interpolation (the same algorithm used by NumPy's `percentile` function).
///
/// Returns `0.0` for an empty slice.
pub fn percentile(sorted_data: &[f64], p: f64) -> f64 {
    if sorted_data.is_empty() {
        return 0.0;
    }
    let len = sorted_data.len();
    if len == 1 {
        return sorted_data[0];
    }
    let rank = (p / 100.0) * (len as f64 - 1.0);
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted_data[lo];
    }
    let frac = rank - lo as f64;
    sorted_data[lo] + frac * (sorted_data[hi] - sorted_data[lo])
}

// ── Describe ──────────────────────────────────────────────────────────────────

/// Descriptive statistics of a numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Describe {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; `None` with fewer than two values.
    pub std: Option<f64>,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

impl Describe {
    /// Summarise `values`, ignoring NaNs. Returns `None` when nothing is left.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let mean = sorted.iter().sum::<f64>() / count as f64;
        let std = if count > 1 {
            let var = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
            Some(var.sqrt())
        } else {
            None
        };

        Some(Self {
            count,
            mean,
            std,
            min: sorted[0],
            q25: percentile(&sorted, 25.0),
            median: percentile(&sorted, 50.0),
            q75: percentile(&sorted, 75.0),
            max: sorted[count - 1],
        })
    }
}

// ── Value counts ──────────────────────────────────────────────────────────────

/// Occurrences of one distinct value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueCount<T> {
    pub value: T,
    pub count: usize,
}

/// Count distinct values, most frequent first.
///
/// Ties keep the order in which values were first encountered.
pub fn value_counts<T, I>(values: I) -> Vec<ValueCount<T>>
where
    T: Eq + Hash + Clone,
    I: IntoIterator<Item = T>,
{
    let mut index: HashMap<T, usize> = HashMap::new();
    let mut counts: Vec<ValueCount<T>> = Vec::new();

    for value in values {
        match index.get(&value) {
            Some(&i) => counts[i].count += 1,
            None => {
                index.insert(value.clone(), counts.len());
                counts.push(ValueCount { value, count: 1 });
            }
        }
    }

    // Stable sort keeps first-occurrence order on ties.
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

/// The `n` most frequent values (see [`value_counts`]).
pub fn top_n<T, I>(values: I, n: usize) -> Vec<ValueCount<T>>
where
    T: Eq + Hash + Clone,
    I: IntoIterator<Item = T>,
{
    let mut counts = value_counts(values);
    counts.truncate(n);
    counts
}

/// Share of one distinct value in a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frequency<T> {
    pub value: T,
    /// Fraction in `[0, 1]`.
    pub frequency: f64,
}

/// Relative frequency of every distinct value, most frequent first.
pub fn relative_frequencies<T, I>(values: I) -> Vec<Frequency<T>>
where
    T: Eq + Hash + Clone,
    I: IntoIterator<Item = T>,
{
    let counts = value_counts(values);
    let total: usize = counts.iter().map(|c| c.count).sum();
    if total == 0 {
        return Vec::new();
    }
    counts
        .into_iter()
        .map(|c| Frequency {
            value: c.value,
            frequency: c.count as f64 / total as f64,
        })
        .collect()
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── percentile ────────────────────────────────────────────────────────────

    #[test]
    fn test_percentile_empty() {
        assert_eq!(percentile(&[], 50.0), 0.0);
    }

    #[test]
    fn test_percentile_single() {
        assert_eq!(percentile(&[42.0], 90.0), 42.0);
    }

    #[test]
    fn test_percentile_interpolates() {
        let data = [1.0, 2.0, 3.0, 4.0];
        assert!((percentile(&data, 25.0) - 1.75).abs() < 1e-9);
        assert!((percentile(&data, 50.0) - 2.5).abs() < 1e-9);
        assert!((percentile(&data, 75.0) - 3.25).abs() < 1e-9);
    }

    // ── Describe ──────────────────────────────────────────────────────────────

    #[test]
    fn test_describe_basic() {
        let d = Describe::from_values(&[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(d.count, 4);
        assert!((d.mean - 2.5).abs() < 1e-9);
        // Sample std of 1..4 is sqrt(5/3).
        assert!((d.std.unwrap() - (5.0f64 / 3.0).sqrt()).abs() < 1e-9);
        assert_eq!(d.min, 1.0);
        assert_eq!(d.max, 4.0);
        assert!((d.median - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_describe_single_value_has_no_std() {
        let d = Describe::from_values(&[7.0]).unwrap();
        assert_eq!(d.count, 1);
        assert!(d.std.is_none());
        assert_eq!(d.q25, 7.0);
    }

    #[test]
    fn test_describe_empty_and_nan() {
        assert!(Describe::from_values(&[]).is_none());
        assert!(Describe::from_values(&[f64::NAN]).is_none());
        let d = Describe::from_values(&[f64::NAN, 2.0]).unwrap();
        assert_eq!(d.count, 1);
    }

    // ── value_counts ──────────────────────────────────────────────────────────

    #[test]
    fn test_value_counts_orders_by_count() {
        let counts = value_counts(vec!["b", "a", "a", "c", "a", "b"]);
        let values: Vec<(&str, usize)> = counts.iter().map(|c| (c.value, c.count)).collect();
        assert_eq!(values, vec![("a", 3), ("b", 2), ("c", 1)]);
    }

    #[test]
    fn test_value_counts_ties_keep_first_occurrence() {
        let counts = value_counts(vec!["x", "y", "z", "y", "x", "z"]);
        let values: Vec<&str> = counts.iter().map(|c| c.value).collect();
        assert_eq!(values, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_top_n_truncates() {
        let top = top_n(vec![1, 2, 3, 4, 5, 6, 6], 5);
        assert_eq!(top.len(), 5);
        assert_eq!(top[0].value, 6);
        assert_eq!(top[0].count, 2);
    }

    #[test]
    fn test_relative_frequencies_sum_to_one() {
        let freqs = relative_frequencies(vec!["TCP", "TCP", "UDP", "ICMP"]);
        let total: f64 = freqs.iter().map(|f| f.frequency).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert_eq!(freqs[0].value, "TCP");
        assert!((freqs[0].frequency - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_relative_frequencies_empty() {
        let freqs: Vec<Frequency<&str>> = relative_frequencies(Vec::new());
        assert!(freqs.is_empty());
    }
}
