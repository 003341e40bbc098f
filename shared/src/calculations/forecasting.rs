//! Demand forecasting over historical consumption.
//!
//! All four methods consume a per-day consumption series (oldest first,
//! zero-filled for days without movement) and project demand over a
//! horizon in days.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::UnknownEnumValue;

/// Days in one assumed season for the seasonal method
pub const SEASON_LENGTH: usize = 30;

/// Smoothing parameter for exponential smoothing
pub const SMOOTHING_ALPHA: f64 = 0.3;

/// 95% service-level factor applied to safety stock
pub const SERVICE_LEVEL_FACTOR: f64 = 1.65;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ForecastMethod {
    MovingAverage,
    ExponentialSmoothing,
    LinearRegression,
    SeasonalDecomposition,
}

impl ForecastMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForecastMethod::MovingAverage => "moving_average",
            ForecastMethod::ExponentialSmoothing => "exponential_smoothing",
            ForecastMethod::LinearRegression => "linear_regression",
            ForecastMethod::SeasonalDecomposition => "seasonal_decomposition",
        }
    }
}

impl FromStr for ForecastMethod {
    type Err = UnknownEnumValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "moving_average" => Ok(ForecastMethod::MovingAverage),
            "exponential_smoothing" => Ok(ForecastMethod::ExponentialSmoothing),
            "linear_regression" => Ok(ForecastMethod::LinearRegression),
            "seasonal_decomposition" => Ok(ForecastMethod::SeasonalDecomposition),
            other => Err(UnknownEnumValue::new("forecast_method", other)),
        }
    }
}

/// Projection produced by one forecasting method
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub projected_demand: f64,
    pub accuracy: f64,
    pub seasonality_factor: f64,
    pub trend_factor: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

/// Dispatch to the selected method.
pub fn project(method: ForecastMethod, series: &[f64], horizon_days: usize) -> Projection {
    match method {
        ForecastMethod::MovingAverage => moving_average(series, horizon_days),
        ForecastMethod::ExponentialSmoothing => exponential_smoothing(series, horizon_days),
        ForecastMethod::LinearRegression => linear_regression(series, horizon_days),
        ForecastMethod::SeasonalDecomposition => seasonal(series, horizon_days),
    }
}

/// Average daily consumption over the trailing 30-day window (shorter if
/// history is shorter), scaled by the horizon. Accuracy is penalized by
/// the window's coefficient of variation, clamped to [0.6, 0.9].
pub fn moving_average(series: &[f64], horizon_days: usize) -> Projection {
    if series.is_empty() {
        return Projection {
            projected_demand: 0.0,
            accuracy: 0.0,
            seasonality_factor: 1.0,
            trend_factor: 1.0,
        };
    }
    let window = &series[series.len().saturating_sub(SEASON_LENGTH)..];
    let daily_avg = mean(window);
    let accuracy = if daily_avg > 0.0 {
        (1.0 - std_deviation(window) / daily_avg).clamp(0.6, 0.9)
    } else {
        0.6
    };
    Projection {
        projected_demand: daily_avg * horizon_days as f64,
        accuracy,
        seasonality_factor: 1.0,
        trend_factor: 1.0,
    }
}

/// Single-parameter smoothing with α = 0.3 applied sequentially; the
/// smoothed daily level is scaled by the horizon.
pub fn exponential_smoothing(series: &[f64], horizon_days: usize) -> Projection {
    if series.is_empty() {
        return Projection {
            projected_demand: 0.0,
            accuracy: 0.0,
            seasonality_factor: 1.0,
            trend_factor: 1.0,
        };
    }
    let mut level = series[0];
    for value in &series[1..] {
        level = SMOOTHING_ALPHA * value + (1.0 - SMOOTHING_ALPHA) * level;
    }
    Projection {
        projected_demand: level * horizon_days as f64,
        accuracy: 0.75,
        seasonality_factor: 1.0,
        trend_factor: 1.0,
    }
}

/// Ordinary least-squares fit against the day index, extrapolated to
/// `n + horizon` and scaled by the horizon. The trend factor moves 10%
/// per unit of slope magnitude, up for growth and down for decline.
pub fn linear_regression(series: &[f64], horizon_days: usize) -> Projection {
    if series.len() < 2 {
        return Projection {
            projected_demand: 0.0,
            accuracy: 0.0,
            seasonality_factor: 1.0,
            trend_factor: 1.0,
        };
    }
    let n = series.len() as f64;
    let sum_x: f64 = (0..series.len()).map(|i| i as f64).sum();
    let sum_y: f64 = series.iter().sum();
    let sum_xy: f64 = series.iter().enumerate().map(|(i, y)| i as f64 * y).sum();
    let sum_xx: f64 = (0..series.len()).map(|i| (i as f64) * (i as f64)).sum();

    let denom = n * sum_xx - sum_x * sum_x;
    let slope = if denom == 0.0 {
        0.0
    } else {
        (n * sum_xy - sum_x * sum_y) / denom
    };
    let intercept = (sum_y - slope * sum_x) / n;

    let projected_daily = (intercept + slope * (n + horizon_days as f64)).max(0.0);
    let trend_factor = if slope > 0.0 {
        1.0 + slope.abs() * 0.1
    } else {
        1.0 - slope.abs() * 0.1
    };

    Projection {
        projected_demand: projected_daily * horizon_days as f64,
        accuracy: 0.7,
        seasonality_factor: 1.0,
        trend_factor,
    }
}

/// Multiplicative seasonal adjustment over a moving-average baseline.
/// Falls back to linear regression with fewer than two full seasons.
pub fn seasonal(series: &[f64], horizon_days: usize) -> Projection {
    if series.len() < SEASON_LENGTH * 2 {
        return linear_regression(series, horizon_days);
    }

    let pattern = seasonal_pattern(series);
    let seasonality_factor = pattern[horizon_days % SEASON_LENGTH];
    let trend_factor = half_over_half_trend(series);
    let baseline = moving_average(series, horizon_days);

    Projection {
        projected_demand: baseline.projected_demand * seasonality_factor * trend_factor,
        accuracy: 0.8,
        seasonality_factor,
        trend_factor,
    }
}

/// Per-day-of-season index: average for that day position divided by the
/// overall series average.
fn seasonal_pattern(series: &[f64]) -> [f64; SEASON_LENGTH] {
    let mut pattern = [1.0; SEASON_LENGTH];
    let overall_avg = mean(series);
    if overall_avg <= 0.0 {
        return pattern;
    }
    let seasons = series.len() / SEASON_LENGTH;
    for (day, slot) in pattern.iter_mut().enumerate() {
        let mut sum = 0.0;
        let mut count = 0usize;
        for season in 0..seasons {
            let index = season * SEASON_LENGTH + day;
            if index < series.len() {
                sum += series[index];
                count += 1;
            }
        }
        if count > 0 {
            *slot = (sum / count as f64) / overall_avg;
        }
    }
    pattern
}

/// Trend factor: second-half average over first-half average.
fn half_over_half_trend(series: &[f64]) -> f64 {
    if series.len() < 4 {
        return 1.0;
    }
    let mid = series.len() / 2;
    let first_avg = mean(&series[..mid]);
    let second_avg = mean(&series[mid..]);
    if first_avg > 0.0 {
        second_avg / first_avg
    } else {
        1.0
    }
}

/// Coefficient of variation of the consumption series.
pub fn demand_variability(series: &[f64]) -> f64 {
    let avg = mean(series);
    if avg <= 0.0 {
        return 0.0;
    }
    std_deviation(series) / avg
}

/// Buffer quantity for a 95% service level.
pub fn safety_stock(projected_demand: f64, variability: f64) -> f64 {
    projected_demand * variability * SERVICE_LEVEL_FACTOR
}

/// Score forecast risk from accuracy, variability, and the raw projected
/// ending stock (before flooring at zero, so projected stockouts count).
pub fn assess_risk(accuracy: f64, variability: f64, raw_ending_stock: f64) -> RiskLevel {
    let mut score = (1.0 - accuracy) + variability;
    if raw_ending_stock < 0.0 {
        score += 1.0;
    }
    if score > 1.5 {
        RiskLevel::High
    } else if score > 0.8 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn std_deviation(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let avg = mean(values);
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}
