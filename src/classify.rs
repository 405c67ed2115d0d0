//! Percentile classification of one week's county rates.
//!
//! Bin edges are the requested percentiles of the week's values (linear
//! interpolation between order statistics). A value falls in class `k` when
//! `edges[k-1] < value <= edges[k]`; class 0 holds everything up to
//! `edges[0]`.

/// Percentile-based class scheme, e.g. `[90, 95, 100]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PercentileScheme {
    pub pct: Vec<f64>,
}

/// The edges computed for one week and the class of every input value.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub edges: Vec<f64>,
    pub classes: Vec<usize>,
}

impl Classification {
    pub fn class_count(&self) -> usize {
        self.edges.len()
    }
}

impl PercentileScheme {
    /// Three classes highlighting the top decile, used by the weekly images.
    pub fn top_decile() -> Self {
        Self {
            pct: vec![90.0, 95.0, 100.0],
        }
    }

    /// Seven classes spread over the full range, used by the movie.
    pub fn ranked() -> Self {
        Self {
            pct: vec![0.0, 20.0, 40.0, 60.0, 70.0, 80.0, 100.0],
        }
    }

    pub fn classify(&self, values: &[f64]) -> Classification {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        sorted.sort_by(f64::total_cmp);

        let edges: Vec<f64> = self.pct.iter().map(|p| percentile(&sorted, *p)).collect();
        let last = edges.len().saturating_sub(1);
        let classes = values
            .iter()
            .map(|v| edges.partition_point(|edge| edge < v).min(last))
            .collect();

        Classification { edges, classes }
    }
}

/// Linear-interpolation percentile of an ascending slice (`p` in 0..=100).
///
/// Returns NaN for an empty slice.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let rank = p.clamp(0.0, 100.0) * (n - 1) as f64 / 100.0;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            let frac = rank - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_to(n: usize) -> Vec<f64> {
        (1..=n).map(|v| v as f64).collect()
    }

    #[test]
    fn test_percentile_matches_linear_interpolation() {
        let values = one_to(20);
        // rank = 0.9 * 19 = 17.1 -> 18 + 0.1
        assert!((percentile(&values, 90.0) - 18.1).abs() < 1e-12);
        // rank = 0.95 * 19 = 18.05 -> 19 + 0.05
        assert!((percentile(&values, 95.0) - 19.05).abs() < 1e-12);
        assert_eq!(percentile(&values, 100.0), 20.0);
        assert_eq!(percentile(&values, 0.0), 1.0);
        assert_eq!(percentile(&[1.0, 2.0, 3.0, 4.0], 50.0), 2.5);
        assert!(percentile(&[], 50.0).is_nan());
    }

    #[test]
    fn test_top_decile_classes() {
        let values = one_to(20);
        let c = PercentileScheme::top_decile().classify(&values);

        assert_eq!(c.class_count(), 3);
        assert!(c.classes[..18].iter().all(|k| *k == 0));
        assert_eq!(c.classes[18], 1);
        assert_eq!(c.classes[19], 2);
    }

    #[test]
    fn test_classify_is_order_independent() {
        let values = vec![5.0, 1.0, 20.0, 3.0, 19.0];
        let c = PercentileScheme::top_decile().classify(&values);
        // edges: p90 = 19.6, p95 = 19.8, p100 = 20
        assert_eq!(c.classes, vec![0, 0, 2, 0, 0]);
    }

    #[test]
    fn test_ranked_scheme_uses_seven_classes() {
        let values = one_to(11);
        let c = PercentileScheme::ranked().classify(&values);

        assert_eq!(c.class_count(), 7);
        assert_eq!(c.edges, vec![1.0, 3.0, 5.0, 7.0, 8.0, 9.0, 11.0]);
        // only the minimum sits in class 0
        assert_eq!(c.classes, vec![0, 1, 1, 2, 2, 3, 3, 4, 5, 6, 6]);
    }

    #[test]
    fn test_ties_collapse_into_lowest_class() {
        let values = vec![0.0; 10];
        let c = PercentileScheme::top_decile().classify(&values);
        assert!(c.classes.iter().all(|k| *k == 0));
    }
}
