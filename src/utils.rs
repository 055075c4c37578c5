use chrono::Utc;
use std::path::{Path, PathBuf};

/// Percentile of `values` using linear interpolation between the closest ranks.
/// `values` must already be sorted ascending. Returns `None` for an empty slice.
pub fn percentile_sorted(values: &[f64], percentile: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let percentile = percentile.clamp(0.0, 100.0);
    let rank = percentile / 100.0 * (values.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;

    Some(values[lower] + (values[upper] - values[lower]) * weight)
}

/// Sorts a copy of `values` and returns the requested percentile.
pub fn percentile(values: &[f64], percentile: f64) -> Option<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    percentile_sorted(&sorted, percentile)
}

pub fn median(values: &[f64]) -> Option<f64> {
    percentile(values, 50.0)
}

/// Slope of the least-squares line through `(index, value)` points.
pub fn linear_slope(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if values.len() < 2 {
        return 0.0;
    }

    let x_mean = (n - 1.0) / 2.0;
    let y_mean = values.iter().sum::<f64>() / n;

    let mut numerator = 0.0;
    let mut denominator = 0.0;

    for (i, value) in values.iter().enumerate() {
        let x_diff = i as f64 - x_mean;
        numerator += x_diff * (value - y_mean);
        denominator += x_diff * x_diff;
    }

    if denominator != 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Rescales `values` into `[low, high]`. When every value is equal the midpoint is used.
pub fn min_max_scale(values: &[f64], low: f64, high: f64) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;

    values
        .iter()
        .map(|value| {
            if span > 0.0 {
                low + (value - min) / span * (high - low)
            } else {
                (low + high) / 2.0
            }
        })
        .collect()
}

/// Appends the current UTC time to the file stem, e.g. `stats.json` becomes
/// `stats-2020-01-15_10-00-00.json`.
pub fn timestamped_path(basename: &Path) -> PathBuf {
    let timestamp = Utc::now().format("%Y-%m-%d_%H-%M-%S");
    let stem = basename
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "stats".to_string());

    let file_name = match basename.extension() {
        Some(ext) => format!("{}-{}.{}", stem, timestamp, ext.to_string_lossy()),
        None => format!("{}-{}", stem, timestamp),
    };

    basename.with_file_name(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_interpolates_between_ranks() {
        let values = vec![1.0, 1.0, 2.0, 2.0, 3.0];
        assert_eq!(percentile_sorted(&values, 60.0), Some(2.0));
        assert_eq!(percentile_sorted(&values, 100.0), Some(3.0));
        assert_eq!(percentile_sorted(&values, 20.0), Some(1.0));
        assert_eq!(percentile_sorted(&values, 0.0), Some(1.0));

        let values = vec![10.0, 20.0];
        assert_eq!(percentile_sorted(&values, 25.0), Some(12.5));
    }

    #[test]
    fn test_percentile_of_empty_slice() {
        assert_eq!(percentile(&[], 50.0), None);
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_median_sorts_input() {
        assert_eq!(median(&[9.0, 1.0, 5.0, 3.0]), Some(4.0));
    }

    #[test]
    fn test_linear_slope() {
        assert_eq!(linear_slope(&[1.0, 2.0, 3.0, 4.0]), 1.0);
        assert_eq!(linear_slope(&[4.0, 2.0, 0.0]), -2.0);
        assert_eq!(linear_slope(&[7.0]), 0.0);
    }

    #[test]
    fn test_min_max_scale() {
        assert_eq!(
            min_max_scale(&[-2.0, 0.0, 2.0], -1.0, 1.0),
            vec![-1.0, 0.0, 1.0]
        );
        assert_eq!(min_max_scale(&[3.0, 3.0], -1.0, 1.0), vec![0.0, 0.0]);
    }

    #[test]
    fn test_timestamped_path_keeps_extension() {
        let path = timestamped_path(Path::new("out/stats.json"));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("stats-"));
        assert!(name.ends_with(".json"));
        assert_eq!(path.parent(), Some(Path::new("out")));
    }
}
