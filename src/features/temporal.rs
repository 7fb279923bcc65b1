//! Lag and moving-average features over a time-ordered target series.
//!
//! These only make sense for a dataset; a single prediction record has no
//! history, so none of this runs at inference.

use super::FeatureError;

pub const DEFAULT_LAGS: [usize; 2] = [1, 24];
pub const DEFAULT_WINDOWS: [usize; 2] = [6, 24];

pub fn lag_column_name(target: &str, lag: usize) -> String {
    format!("{}_lag_{}", target, lag)
}

pub fn moving_average_column_name(target: &str, window: usize) -> String {
    format!("{}_ma_{}", target, window)
}

/// Arithmetic mean, NaN for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Shift `values` forward by `lag` positions.
///
/// The first `lag` entries have no earlier value and are filled with the mean
/// of the unshifted series.
pub fn lag_column(values: &[f64], lag: usize) -> Vec<f64> {
    let fill = mean(values);
    (0..values.len())
        .map(|i| if i < lag { fill } else { values[i - lag] })
        .collect()
}

/// Trailing mean over `window` entries, shrinking at the start of the series
/// so every row has a value.
pub fn moving_average(values: &[f64], window: usize) -> Result<Vec<f64>, FeatureError> {
    if window == 0 {
        return Err(FeatureError::ZeroWindow);
    }

    Ok((0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            mean(&values[start..=i])
        })
        .collect())
}

/// Lag and moving-average columns for a target series, in
/// `lags` then `windows` order.
pub fn series_columns(
    target_name: &str,
    values: &[f64],
    lags: &[usize],
    windows: &[usize],
) -> Result<Vec<(String, Vec<f64>)>, FeatureError> {
    let mut columns = Vec::with_capacity(lags.len() + windows.len());

    for &lag in lags {
        columns.push((lag_column_name(target_name, lag), lag_column(values, lag)));
    }
    for &window in windows {
        columns.push((
            moving_average_column_name(target_name, window),
            moving_average(values, window)?,
        ));
    }

    Ok(columns)
}
