//! Feature normalization
//!
//! Fits per-column scaling parameters on a validated table and applies them
//! in place. Two strategies are supported: standard scoring `(x - mean)/std`
//! and min-max scaling `(x - min)/(max - min)`. Degenerate columns (zero
//! spread) are left untouched but their parameters are still recorded, so the
//! fitted scaler can later be applied to unseen data.
//!
//! The pipeline fits on the full validated table before splitting, which
//! leaks test-set statistics into the scaler. This is kept on purpose so
//! previously published datasets stay reproducible; fitting on the train
//! partition only and applying the result through [`apply_params`] is the
//! statistically clean alternative.

use crate::config::ScalerType;
use crate::table::DataTable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fitted scaling constants for one column.
///
/// Serializes untagged, so `scaler_params.json` reads
/// `{"col": {"mean": .., "std": ..}}` or `{"col": {"min": .., "max": ..}}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnScaler {
    Standard { mean: f64, std: f64 },
    MinMax { min: f64, max: f64 },
}

impl ColumnScaler {
    /// Scale one value with the fitted constants. Degenerate parameters
    /// (zero spread) leave the value unchanged.
    pub fn transform(&self, x: f64) -> f64 {
        match *self {
            ColumnScaler::Standard { mean, std } if std > 0.0 => (x - mean) / std,
            ColumnScaler::MinMax { min, max } if max - min > 0.0 => (x - min) / (max - min),
            _ => x,
        }
    }

    /// Invert [`ColumnScaler::transform`]
    pub fn inverse(&self, x: f64) -> f64 {
        match *self {
            ColumnScaler::Standard { mean, std } if std > 0.0 => x * std + mean,
            ColumnScaler::MinMax { min, max } if max - min > 0.0 => x * (max - min) + min,
            _ => x,
        }
    }
}

/// Fitted parameters per feature column, ordered for stable serialization
pub type ScalerParams = BTreeMap<String, ColumnScaler>;

/// Per-feature normalizer
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    scaler_type: ScalerType,
}

impl Normalizer {
    pub fn new(scaler_type: ScalerType) -> Self {
        Self { scaler_type }
    }

    /// Fit scaling parameters on the listed feature columns and transform the
    /// table in place. Columns not present in the table are skipped.
    pub fn fit_transform(
        &self,
        table: &mut DataTable,
        feature_columns: &[String],
    ) -> ScalerParams {
        let mut params = ScalerParams::new();

        for name in feature_columns {
            let Some(idx) = table.column_index(name) else {
                continue;
            };

            let scaler = match self.scaler_type {
                ScalerType::Standard => fit_standard(&table.numeric_values(name)),
                ScalerType::Minmax => fit_minmax(&table.numeric_values(name)),
            };

            table.map_numeric_column(idx, |v| scaler.transform(v));
            params.insert(name.clone(), scaler);
        }

        params
    }
}

/// Apply previously fitted parameters to another table (inference-time
/// rescaling of unseen data). Columns without fitted parameters are left
/// alone.
pub fn apply_params(table: &mut DataTable, params: &ScalerParams) {
    for (name, scaler) in params {
        if let Some(idx) = table.column_index(name) {
            table.map_numeric_column(idx, |v| scaler.transform(v));
        }
    }
}

/// Mean and sample standard deviation (n-1 denominator). Fewer than two
/// samples fit as degenerate.
fn fit_standard(values: &[f64]) -> ColumnScaler {
    let n = values.len();
    if n < 2 {
        let mean = values.first().copied().unwrap_or(0.0);
        return ColumnScaler::Standard { mean, std: 0.0 };
    }

    let mean = values.iter().sum::<f64>() / n as f64;
    let variance = values
        .iter()
        .map(|v| (v - mean) * (v - mean))
        .sum::<f64>()
        / (n - 1) as f64;

    ColumnScaler::Standard {
        mean,
        std: variance.sqrt(),
    }
}

fn fit_minmax(values: &[f64]) -> ColumnScaler {
    if values.is_empty() {
        return ColumnScaler::MinMax { min: 0.0, max: 0.0 };
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    ColumnScaler::MinMax { min, max }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Cell;

    fn single_column(values: &[f64]) -> DataTable {
        let mut table = DataTable::new(vec!["x".to_string()]);
        for &v in values {
            table.push_row(vec![Cell::Number(v)]);
        }
        table
    }

    #[test]
    fn test_standard_scaling() {
        let mut table = single_column(&[1.0, 2.0, 3.0]);
        let params = Normalizer::new(ScalerType::Standard)
            .fit_transform(&mut table, &["x".to_string()]);

        let ColumnScaler::Standard { mean, std } = params["x"] else {
            panic!("expected standard params");
        };
        assert!((mean - 2.0).abs() < 1e-12);
        // sample std of [1, 2, 3] = 1
        assert!((std - 1.0).abs() < 1e-12);

        let values = table.numeric_values("x");
        assert!((values[0] + 1.0).abs() < 1e-12);
        assert!(values[1].abs() < 1e-12);
        assert!((values[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_standard_round_trip() {
        let original = [4.2, -1.5, 0.3, 9.9];
        let mut table = single_column(&original);
        let params = Normalizer::new(ScalerType::Standard)
            .fit_transform(&mut table, &["x".to_string()]);

        let scaler = params["x"];
        for (&raw, &scaled) in original.iter().zip(table.numeric_values("x").iter()) {
            assert!((scaler.inverse(scaled) - raw).abs() < 1e-9);
        }
    }

    #[test]
    fn test_constant_column_left_untouched_but_recorded() {
        let mut table = single_column(&[7.0, 7.0, 7.0]);
        let params = Normalizer::new(ScalerType::Standard)
            .fit_transform(&mut table, &["x".to_string()]);

        assert_eq!(table.numeric_values("x"), vec![7.0, 7.0, 7.0]);
        assert_eq!(params["x"], ColumnScaler::Standard { mean: 7.0, std: 0.0 });
    }

    #[test]
    fn test_minmax_scaling() {
        let mut table = single_column(&[0.0, 5.0, 10.0]);
        let params = Normalizer::new(ScalerType::Minmax)
            .fit_transform(&mut table, &["x".to_string()]);

        assert_eq!(params["x"], ColumnScaler::MinMax { min: 0.0, max: 10.0 });
        assert_eq!(table.numeric_values("x"), vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_minmax_degenerate_range() {
        let mut table = single_column(&[3.0, 3.0]);
        let params = Normalizer::new(ScalerType::Minmax)
            .fit_transform(&mut table, &["x".to_string()]);

        assert_eq!(table.numeric_values("x"), vec![3.0, 3.0]);
        assert_eq!(params["x"], ColumnScaler::MinMax { min: 3.0, max: 3.0 });
    }

    #[test]
    fn test_missing_feature_column_skipped() {
        let mut table = single_column(&[1.0, 2.0]);
        let params = Normalizer::new(ScalerType::Standard)
            .fit_transform(&mut table, &["x".to_string(), "ghost".to_string()]);

        assert_eq!(params.len(), 1);
        assert!(params.contains_key("x"));
    }

    #[test]
    fn test_apply_params_to_unseen_data() {
        let mut train = single_column(&[0.0, 10.0]);
        let params = Normalizer::new(ScalerType::Minmax)
            .fit_transform(&mut train, &["x".to_string()]);

        let mut unseen = single_column(&[5.0, 20.0]);
        apply_params(&mut unseen, &params);
        // Scaled with the *fitted* range, so out-of-range data can exceed 1
        assert_eq!(unseen.numeric_values("x"), vec![0.5, 2.0]);
    }

    #[test]
    fn test_params_json_shape() {
        let mut table = single_column(&[1.0, 3.0]);
        let params = Normalizer::new(ScalerType::Standard)
            .fit_transform(&mut table, &["x".to_string()]);

        let json = serde_json::to_value(&params).unwrap();
        assert!(json["x"]["mean"].is_number());
        assert!(json["x"]["std"].is_number());
    }
}
