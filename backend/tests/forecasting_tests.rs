//! Demand forecasting tests
//!
//! Tests for the forecasting methods including:
//! - Moving average over the trailing 30-day window
//! - Exponential smoothing convergence
//! - Linear regression trend extrapolation
//! - Seasonal fallback below two full seasons
//! - Risk grading from accuracy, variability, and projected stockouts

use proptest::prelude::*;

use shared::calculations::forecasting::{
    assess_risk, demand_variability, exponential_smoothing, linear_regression, mean,
    moving_average, project, safety_stock, seasonal, std_deviation, ForecastMethod, RiskLevel,
    SEASON_LENGTH, SERVICE_LEVEL_FACTOR, SMOOTHING_ALPHA,
};

const EPSILON: f64 = 1e-9;

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// A flat series projects mean × horizon with top accuracy
    #[test]
    fn test_moving_average_flat_series() {
        let series = vec![5.0; 90];
        let projection = moving_average(&series, 30);

        assert!((projection.projected_demand - 150.0).abs() < EPSILON);
        // Zero variation clamps accuracy at the upper bound
        assert!((projection.accuracy - 0.9).abs() < EPSILON);
        assert!((projection.seasonality_factor - 1.0).abs() < EPSILON);
    }

    /// Only the trailing 30 days feed the moving average
    #[test]
    fn test_moving_average_window() {
        let mut series = vec![100.0; 60];
        series.extend(vec![2.0; SEASON_LENGTH]);
        let projection = moving_average(&series, 10);

        assert!((projection.projected_demand - 20.0).abs() < EPSILON);
    }

    /// An all-zero series projects zero at the accuracy floor
    #[test]
    fn test_moving_average_zero_series() {
        let projection = moving_average(&[0.0; 45], 30);
        assert!((projection.projected_demand - 0.0).abs() < EPSILON);
        assert!((projection.accuracy - 0.6).abs() < EPSILON);
    }

    /// Smoothing a constant series returns the constant level
    #[test]
    fn test_exponential_smoothing_constant_series() {
        let projection = exponential_smoothing(&[4.0; 50], 30);
        assert!((projection.projected_demand - 120.0).abs() < EPSILON);
        assert!((projection.accuracy - 0.75).abs() < EPSILON);
    }

    /// The smoothed level follows the recursion exactly
    #[test]
    fn test_exponential_smoothing_recursion() {
        let series = [10.0, 20.0];
        let expected_level = SMOOTHING_ALPHA * 20.0 + (1.0 - SMOOTHING_ALPHA) * 10.0;
        let projection = exponential_smoothing(&series, 1);
        assert!((projection.projected_demand - expected_level).abs() < EPSILON);
    }

    /// Rising series: positive slope lifts the trend factor above 1
    #[test]
    fn test_linear_regression_rising_trend() {
        let series: Vec<f64> = (0..60).map(|i| i as f64).collect();
        let projection = linear_regression(&series, 10);

        // Slope 1, so the extrapolated day is n + horizon = 70
        assert!((projection.projected_demand - 700.0).abs() < 1e-6);
        assert!((projection.trend_factor - 1.1).abs() < EPSILON);
        assert!((projection.accuracy - 0.7).abs() < EPSILON);
    }

    /// Declining series never projects negative demand
    #[test]
    fn test_linear_regression_floors_at_zero() {
        let series: Vec<f64> = (0..30).map(|i| (30 - i) as f64).collect();
        let projection = linear_regression(&series, 60);

        assert!(projection.projected_demand >= 0.0);
        assert!(projection.trend_factor < 1.0);
    }

    /// Below two full seasons the seasonal method degrades to regression
    #[test]
    fn test_seasonal_fallback_on_short_history() {
        let series = vec![3.0; SEASON_LENGTH * 2 - 1];
        let projection = seasonal(&series, 30);
        let fallback = linear_regression(&series, 30);

        assert!((projection.projected_demand - fallback.projected_demand).abs() < EPSILON);
        assert!((projection.accuracy - 0.7).abs() < EPSILON);
    }

    /// A flat two-season series has a neutral pattern and trend
    #[test]
    fn test_seasonal_flat_series() {
        let series = vec![5.0; SEASON_LENGTH * 3];
        let projection = seasonal(&series, 30);

        assert!((projection.seasonality_factor - 1.0).abs() < EPSILON);
        assert!((projection.trend_factor - 1.0).abs() < EPSILON);
        assert!((projection.projected_demand - 150.0).abs() < EPSILON);
        assert!((projection.accuracy - 0.8).abs() < EPSILON);
    }

    /// Variability is the population coefficient of variation
    #[test]
    fn test_demand_variability() {
        let series = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let expected = std_deviation(&series) / mean(&series);
        assert!((demand_variability(&series) - expected).abs() < EPSILON);
        assert!((std_deviation(&series) - 2.0).abs() < EPSILON);
    }

    /// Safety stock applies the 95% service-level factor
    #[test]
    fn test_safety_stock() {
        let buffer = safety_stock(100.0, 0.2);
        assert!((buffer - 100.0 * 0.2 * SERVICE_LEVEL_FACTOR).abs() < EPSILON);
    }

    /// Risk grading thresholds at 0.8 and 1.5, stockouts add a full point
    #[test]
    fn test_risk_grading() {
        assert_eq!(assess_risk(0.9, 0.1, 50.0), RiskLevel::Low);
        assert_eq!(assess_risk(0.7, 0.6, 50.0), RiskLevel::Medium);
        assert_eq!(assess_risk(0.6, 1.2, 50.0), RiskLevel::High);
        // A projected stockout pushes an otherwise-low score to high
        assert_eq!(assess_risk(0.9, 0.1, -1.0), RiskLevel::Medium);
        assert_eq!(assess_risk(0.7, 0.4, -1.0), RiskLevel::High);
    }

    /// Empty history projects nothing for every method
    #[test]
    fn test_empty_series() {
        for method in [
            ForecastMethod::MovingAverage,
            ForecastMethod::ExponentialSmoothing,
            ForecastMethod::LinearRegression,
            ForecastMethod::SeasonalDecomposition,
        ] {
            let projection = project(method, &[], 30);
            assert!((projection.projected_demand - 0.0).abs() < EPSILON);
        }
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn arb_series() -> impl Strategy<Value = Vec<f64>> {
        prop::collection::vec(0.0f64..100.0, 1..365)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// No method ever projects negative demand
        #[test]
        fn prop_projection_non_negative(series in arb_series(), horizon in 1usize..365) {
            for method in [
                ForecastMethod::MovingAverage,
                ForecastMethod::ExponentialSmoothing,
                ForecastMethod::LinearRegression,
                ForecastMethod::SeasonalDecomposition,
            ] {
                let projection = project(method, &series, horizon);
                prop_assert!(projection.projected_demand >= 0.0);
                prop_assert!(projection.accuracy >= 0.0 && projection.accuracy <= 1.0);
            }
        }

        /// Moving-average accuracy stays within its clamp
        #[test]
        fn prop_moving_average_accuracy_clamped(series in arb_series(), horizon in 1usize..365) {
            let projection = moving_average(&series, horizon);
            prop_assert!(projection.accuracy >= 0.6 && projection.accuracy <= 0.9);
        }

        /// Risk never decreases when a stockout is projected
        #[test]
        fn prop_stockout_never_lowers_risk(
            accuracy in 0.0f64..1.0,
            variability in 0.0f64..2.0,
            ending in 0.0f64..100.0,
        ) {
            let without = assess_risk(accuracy, variability, ending);
            let with = assess_risk(accuracy, variability, -ending - 1.0);
            let rank = |r: RiskLevel| match r {
                RiskLevel::Low => 0,
                RiskLevel::Medium => 1,
                RiskLevel::High => 2,
            };
            prop_assert!(rank(with) >= rank(without));
        }
    }
}
