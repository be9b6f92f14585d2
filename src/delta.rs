use serde::Serialize;

use crate::models::ProjectMetrics;

/// Percentage change from `previous` to `current`.
///
/// A zero baseline yields 0 when nothing changed and a flat 100 otherwise.
pub fn compute_delta(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return if current == 0.0 { 0.0 } else { 100.0 };
    }

    ((current - previous) / previous) * 100.0
}

/// The counts tracked across windows. Repository count is deliberately absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WindowCounts {
    pub pipeline_count: u64,
    pub release_count: u64,
    pub commit_count: u64,
}

impl From<&ProjectMetrics> for WindowCounts {
    fn from(metrics: &ProjectMetrics) -> Self {
        Self {
            pipeline_count: metrics.pipeline_count,
            release_count: metrics.release_count,
            commit_count: metrics.commit_count.unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MetricDeltas {
    pub pipeline: f64,
    pub release: f64,
    pub commit: f64,
}

impl MetricDeltas {
    pub fn between(current: WindowCounts, previous: WindowCounts) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let delta = |c: u64, p: u64| compute_delta(c as f64, p as f64);

        Self {
            pipeline: delta(current.pipeline_count, previous.pipeline_count),
            release: delta(current.release_count, previous.release_count),
            commit: delta(current.commit_count, previous.commit_count),
        }
    }
}

/// Formats `value` to one decimal place, rounding exact ties away from zero.
///
/// `{:.1}` alone rounds ties to even, so `6.25` would print as `6.2`.
#[allow(clippy::float_cmp)]
pub fn one_decimal(value: f64) -> String {
    let magnitude = value.abs();
    let twentieths = magnitude * 20.0;
    // A zero residual means the product is exact, so an odd result is a true tie.
    let exact = magnitude.mul_add(20.0, -twentieths) == 0.0;
    let rounded = if exact && twentieths.fract() == 0.0 && twentieths % 2.0 == 1.0 {
        (twentieths + 1.0) / 20.0
    } else {
        magnitude
    };
    format!("{:.1}", rounded.copysign(value))
}

/// Renders a delta as an arrow and a one-decimal magnitude, e.g. `↑ 50.0%`.
pub fn format_delta(delta: f64) -> String {
    let arrow = if delta >= 0.0 { '↑' } else { '↓' };
    format!("{arrow} {}%", one_decimal(delta.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_zero_over_zero_is_zero() {
        assert_eq!(compute_delta(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_growth_from_zero_is_capped_at_hundred() {
        assert_eq!(compute_delta(5.0, 0.0), 100.0);
        assert_eq!(compute_delta(10_000.0, 0.0), 100.0);
    }

    #[test]
    fn test_decline_is_negative() {
        assert!(approx_eq(compute_delta(10.0, 20.0), -50.0));
    }

    #[test]
    fn test_increase_is_positive() {
        assert!(approx_eq(compute_delta(30.0, 20.0), 50.0));
    }

    #[test]
    fn test_matches_formula_for_positive_baselines() {
        for previous in 1..=25_u32 {
            for current in 0..=40_u32 {
                let (c, p) = (f64::from(current), f64::from(previous));
                assert!(approx_eq(compute_delta(c, p), ((c - p) / p) * 100.0));
            }
        }
    }

    #[test]
    fn test_deltas_between_windows() {
        let current = WindowCounts {
            pipeline_count: 12,
            release_count: 0,
            commit_count: 3,
        };
        let previous = WindowCounts {
            pipeline_count: 8,
            release_count: 0,
            commit_count: 0,
        };

        let deltas = MetricDeltas::between(current, previous);

        assert!(approx_eq(deltas.pipeline, 50.0));
        assert_eq!(deltas.release, 0.0);
        assert_eq!(deltas.commit, 100.0);
    }

    #[test]
    fn test_window_counts_treat_missing_commits_as_zero() {
        let metrics: ProjectMetrics = serde_json::from_str(r#"{"pipeline_runs":4}"#).unwrap();

        let counts = WindowCounts::from(&metrics);

        assert_eq!(counts.pipeline_count, 4);
        assert_eq!(counts.commit_count, 0);
    }

    #[test]
    fn test_format_delta() {
        assert_eq!(format_delta(50.0), "↑ 50.0%");
        assert_eq!(format_delta(0.0), "↑ 0.0%");
        assert_eq!(format_delta(-12.34), "↓ 12.3%");
    }

    #[test]
    fn test_one_decimal_rounds_ties_up() {
        assert_eq!(one_decimal(6.25), "6.3");
        assert_eq!(one_decimal(31.25), "31.3");
        assert_eq!(one_decimal(0.25), "0.3");
        assert_eq!(one_decimal(-6.25), "-6.3");
    }

    #[test]
    fn test_one_decimal_leaves_near_ties_alone() {
        // 0.15 and 1.45 sit just below the tie in binary.
        assert_eq!(one_decimal(0.15), "0.1");
        assert_eq!(one_decimal(1.45), "1.4");
        assert_eq!(one_decimal(2.5), "2.5");
        assert_eq!(one_decimal(12.34), "12.3");
    }

    #[test]
    fn test_tied_delta_rounds_up() {
        assert_eq!(format_delta(compute_delta(17.0, 16.0)), "↑ 6.3%");
        assert_eq!(format_delta(compute_delta(15.0, 16.0)), "↓ 6.3%");
    }
}
