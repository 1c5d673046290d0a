//! Ordinary least squares regression over a layer's attributes.
//!
//! Fits `y = β₀ + Σ βⱼ·xⱼ` through the normal equations `(XᵀX)β = Xᵀy`,
//! inverting `XᵀX` by Gauss-Jordan elimination with partial pivoting so the
//! coefficient standard errors come out of the same pass.

use super::vector::{Feature, FeatureCollection};
use crate::errors::{GeoError, GeoResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::f64::consts::PI;
use tracing::{debug, warn};

/// Output field holding the fitted value.
pub const ESTIMATED_FIELD: &str = "Estimated";
/// Output field holding the residual.
pub const RESIDUAL_FIELD: &str = "Residual";
/// Output field holding the standardised residual.
pub const STD_RESID_FIELD: &str = "StdResid";
/// Foreign member of the output collection holding the model summary.
pub const SUMMARY_MEMBER: &str = "regression";

/// Relative pivot threshold below which `XᵀX` is treated as singular.
const SINGULAR_TOLERANCE: f64 = 1e-12;

/// One fitted coefficient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coefficient {
    /// `Intercept` or the explanatory field name.
    pub variable: String,
    /// Estimated value.
    pub estimate: f64,
    /// Standard error.
    pub std_error: f64,
    /// `estimate / std_error`; absent when the error is zero.
    pub t_statistic: Option<f64>,
}

/// Summary of a fitted model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OlsSummary {
    /// Dependent field.
    pub dependent: String,
    /// Intercept first, then one entry per explanatory field.
    pub coefficients: Vec<Coefficient>,
    /// Observations used.
    pub observations: usize,
    /// Coefficient of determination.
    pub r_squared: f64,
    /// R² adjusted for the number of parameters.
    pub adjusted_r_squared: f64,
    /// Residual variance `SSR / (n - p)`.
    pub sigma2: f64,
    /// Joint F statistic; absent for an intercept-only model or a perfect fit.
    pub f_statistic: Option<f64>,
    /// Corrected Akaike information criterion; absent for a perfect fit.
    pub aicc: Option<f64>,
}

/// A fitted model with per-observation diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct OlsFit {
    /// Model summary.
    pub summary: OlsSummary,
    /// Fitted values.
    pub estimated: Vec<f64>,
    /// `observed - estimated`.
    pub residuals: Vec<f64>,
    /// Residuals divided by `sqrt(sigma2)`.
    pub std_residuals: Vec<f64>,
}

/// Inverts a row-major `n×n` matrix in place of a copy.
fn invert(n: usize, matrix: &[f64]) -> GeoResult<Vec<f64>> {
    let mut a = matrix.to_vec();
    let mut inv = vec![0.0_f64; n * n];
    for i in 0..n {
        inv[i * n + i] = 1.0;
    }

    let scale = (0..n).map(|i| a[i * n + i].abs()).fold(0.0_f64, f64::max).max(1.0);

    for col in 0..n {
        let mut max_val = a[col * n + col].abs();
        let mut max_row = col;
        for row in (col + 1)..n {
            let val = a[row * n + col].abs();
            if val > max_val {
                max_val = val;
                max_row = row;
            }
        }

        if max_val < SINGULAR_TOLERANCE * scale {
            return Err(GeoError::Algorithm(
                "OLS: singular system (explanatory variables are collinear or constant)"
                    .to_string(),
            ));
        }

        if max_row != col {
            for j in 0..n {
                a.swap(col * n + j, max_row * n + j);
                inv.swap(col * n + j, max_row * n + j);
            }
        }

        let pivot = a[col * n + col];
        for j in 0..n {
            a[col * n + j] /= pivot;
            inv[col * n + j] /= pivot;
        }

        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = a[row * n + col];
            if factor == 0.0 {
                continue;
            }
            for j in 0..n {
                a[row * n + j] -= factor * a[col * n + j];
                inv[row * n + j] -= factor * inv[col * n + j];
            }
        }
    }

    Ok(inv)
}

/// Fits `y` against the explanatory columns of `x` (one row per observation).
pub fn fit_ols(
    dependent: &str,
    explanatory: &[String],
    y: &[f64],
    x: &[Vec<f64>],
) -> GeoResult<OlsFit> {
    let n = y.len();
    let p = explanatory.len() + 1;

    if x.len() != n || x.iter().any(|row| row.len() + 1 != p) {
        return Err(GeoError::InvalidDimensions {
            width: p,
            height: n,
        });
    }
    if n < p + 1 {
        return Err(GeoError::Algorithm(format!(
            "OLS: at least {} observations are required, got {n}",
            p + 1
        )));
    }

    let design = |i: usize, j: usize| if j == 0 { 1.0 } else { x[i][j - 1] };

    let mut xtx = vec![0.0_f64; p * p];
    let mut xty = vec![0.0_f64; p];
    for i in 0..n {
        for a in 0..p {
            let xa = design(i, a);
            xty[a] += xa * y[i];
            for b in 0..p {
                xtx[a * p + b] += xa * design(i, b);
            }
        }
    }

    let inv = invert(p, &xtx)?;
    let beta: Vec<f64> = (0..p)
        .map(|a| (0..p).map(|b| inv[a * p + b] * xty[b]).sum())
        .collect();

    let estimated: Vec<f64> = (0..n)
        .map(|i| (0..p).map(|j| beta[j] * design(i, j)).sum())
        .collect();
    let residuals: Vec<f64> = y.iter().zip(&estimated).map(|(o, e)| o - e).collect();

    let mean_y = y.iter().sum::<f64>() / n as f64;
    let sst: f64 = y.iter().map(|v| (v - mean_y).powi(2)).sum();
    let ssr: f64 = residuals.iter().map(|r| r * r).sum();
    if sst <= 0.0 {
        return Err(GeoError::Algorithm(format!(
            "OLS: dependent variable {dependent} is constant"
        )));
    }

    let nf = n as f64;
    let pf = p as f64;
    let dof = nf - pf;
    let sigma2 = ssr / dof;
    let r_squared = 1.0 - ssr / sst;
    let adjusted_r_squared = 1.0 - (1.0 - r_squared) * (nf - 1.0) / dof;

    let f_statistic = (p > 1 && sigma2 > 0.0).then(|| ((sst - ssr) / (pf - 1.0)) / sigma2);
    let aicc = (ssr > 0.0 && nf - pf - 1.0 > 0.0).then(|| {
        nf * (2.0 * PI * ssr / nf).ln() + nf + 2.0 * pf + 2.0 * pf * (pf + 1.0) / (nf - pf - 1.0)
    });

    let names = std::iter::once("Intercept").chain(explanatory.iter().map(String::as_str));
    let coefficients = names
        .zip(&beta)
        .enumerate()
        .map(|(j, (name, &estimate))| {
            let std_error = (sigma2 * inv[j * p + j]).max(0.0).sqrt();
            Coefficient {
                variable: name.to_string(),
                estimate,
                std_error,
                t_statistic: (std_error > 0.0).then(|| estimate / std_error),
            }
        })
        .collect();

    let sigma = sigma2.sqrt();
    let std_residuals = residuals
        .iter()
        .map(|r| if sigma > 0.0 { r / sigma } else { 0.0 })
        .collect();

    debug!(n, p, r_squared, sigma2, "OLS fitted");

    Ok(OlsFit {
        summary: OlsSummary {
            dependent: dependent.to_string(),
            coefficients,
            observations: n,
            r_squared,
            adjusted_r_squared,
            sigma2,
            f_statistic,
            aicc,
        },
        estimated,
        residuals,
        std_residuals,
    })
}

/// Field selection for [`regress_layer`].
#[derive(Debug, Clone, Copy)]
pub struct RegressionFields<'a> {
    /// Identifier copied onto each output feature.
    pub unique_id: &'a str,
    /// Dependent variable.
    pub dependent: &'a str,
    /// Explanatory variables.
    pub explanatory: &'a [String],
}

/// Fits the model over `layer` and builds the output layer.
///
/// Features whose dependent or explanatory value is null or non-numeric are
/// left out. Each output feature keeps its geometry and carries the unique
/// id, the model variables and the three diagnostic fields; the summary is
/// stored as the `regression` member of the collection.
pub fn regress_layer(
    layer: &FeatureCollection,
    dataset: &str,
    fields: RegressionFields<'_>,
) -> GeoResult<(FeatureCollection, OlsSummary)> {
    layer.require_field(dataset, fields.unique_id)?;
    layer.require_field(dataset, fields.dependent)?;
    for field in fields.explanatory {
        layer.require_field(dataset, field)?;
    }

    let mut used: Vec<&Feature> = Vec::with_capacity(layer.len());
    let mut y = Vec::with_capacity(layer.len());
    let mut x = Vec::with_capacity(layer.len());
    for feature in &layer.features {
        let Some(dep) = feature.number(fields.dependent) else {
            continue;
        };
        let Some(row) = fields
            .explanatory
            .iter()
            .map(|f| feature.number(f))
            .collect::<Option<Vec<f64>>>()
        else {
            continue;
        };
        used.push(feature);
        y.push(dep);
        x.push(row);
    }

    let dropped = layer.len() - used.len();
    if dropped > 0 {
        warn!(
            dropped,
            total = layer.len(),
            dataset,
            "Features with null or non-numeric model values were excluded"
        );
    }

    let fit = fit_ols(fields.dependent, fields.explanatory, &y, &x)?;

    let features = used
        .iter()
        .enumerate()
        .map(|(i, feature)| {
            let mut properties = Map::new();
            properties.insert(
                fields.unique_id.to_string(),
                feature.property(fields.unique_id).cloned().unwrap_or(Value::Null),
            );
            properties.insert(fields.dependent.to_string(), number(y[i]));
            for (name, value) in fields.explanatory.iter().zip(&x[i]) {
                properties.insert(name.clone(), number(*value));
            }
            properties.insert(ESTIMATED_FIELD.to_string(), number(fit.estimated[i]));
            properties.insert(RESIDUAL_FIELD.to_string(), number(fit.residuals[i]));
            properties.insert(STD_RESID_FIELD.to_string(), number(fit.std_residuals[i]));

            Feature {
                properties,
                ..(*feature).clone()
            }
        })
        .collect();

    let mut output = FeatureCollection::new(features);
    let summary = serde_json::to_value(&fit.summary)
        .map_err(|e| GeoError::Algorithm(format!("OLS summary: {e}")))?;
    output.foreign_members.insert(SUMMARY_MEMBER.to_string(), summary);
    Ok((output, fit.summary))
}

fn number(value: f64) -> Value {
    serde_json::Number::from_f64(value).map_or(Value::Null, Value::Number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::vector::Geometry;
    use serde_json::json;

    fn names() -> Vec<String> {
        vec!["canrate".to_string()]
    }

    #[test]
    fn test_exact_line_is_recovered() {
        let x: Vec<Vec<f64>> = (0..6).map(|i| vec![f64::from(i)]).collect();
        let y: Vec<f64> = (0..6).map(|i| 3.0 + 2.0 * f64::from(i)).collect();

        let fit = fit_ols("MEAN", &names(), &y, &x).unwrap();
        let s = &fit.summary;
        assert!((s.coefficients[0].estimate - 3.0).abs() < 1e-9);
        assert!((s.coefficients[1].estimate - 2.0).abs() < 1e-9);
        assert_eq!(s.coefficients[0].variable, "Intercept");
        assert_eq!(s.coefficients[1].variable, "canrate");
        assert!((s.r_squared - 1.0).abs() < 1e-12);
        assert!(fit.residuals.iter().all(|r| r.abs() < 1e-9));
    }

    #[test]
    fn test_noisy_fit_diagnostics() {
        let x: Vec<Vec<f64>> = [1.0, 2.0, 3.0, 4.0, 5.0].iter().map(|v| vec![*v]).collect();
        let y = vec![2.0, 4.0, 5.0, 4.0, 5.0];

        let fit = fit_ols("MEAN", &names(), &y, &x).unwrap();
        let s = &fit.summary;

        // Textbook values: y = 2.2 + 0.6x, R² = 0.6
        assert!((s.coefficients[0].estimate - 2.2).abs() < 1e-9);
        assert!((s.coefficients[1].estimate - 0.6).abs() < 1e-9);
        assert!((s.r_squared - 0.6).abs() < 1e-9);
        assert!((s.adjusted_r_squared - 0.466_666_666_666_666_7).abs() < 1e-9);
        assert!((s.sigma2 - 0.8).abs() < 1e-9);
        assert!((s.f_statistic.unwrap() - 4.5).abs() < 1e-9);
        assert!(s.aicc.is_some());
        assert_eq!(s.observations, 5);

        let residual_sum: f64 = fit.residuals.iter().sum();
        assert!(residual_sum.abs() < 1e-9);
        let expected = fit.residuals[0] / 0.8_f64.sqrt();
        assert!((fit.std_residuals[0] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_too_few_observations() {
        let err = fit_ols("MEAN", &names(), &[1.0, 2.0], &[vec![1.0], vec![2.0]]).unwrap_err();
        assert!(err.to_string().contains("at least 3 observations"));
    }

    #[test]
    fn test_constant_explanatory_is_singular() {
        let x = vec![vec![0.5]; 5];
        let y = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let err = fit_ols("MEAN", &names(), &y, &x).unwrap_err();
        assert!(err.to_string().contains("singular"));
    }

    #[test]
    fn test_constant_dependent_is_rejected() {
        let x: Vec<Vec<f64>> = (0..5).map(|i| vec![f64::from(i)]).collect();
        let err = fit_ols("MEAN", &names(), &[7.0; 5], &x).unwrap_err();
        assert!(err.to_string().contains("constant"));
    }

    fn joined_feature(id: &str, mean: Value, rate: f64) -> Feature {
        let props = json!({
            "cancer_tracts.GEOID10": id,
            "zonal_table.MEAN": mean,
            "cancer_tracts.canrate": rate,
        });
        Feature::new(
            Some(Geometry::Point(vec![0.0, 0.0])),
            props.as_object().cloned().unwrap_or_default(),
        )
    }

    #[test]
    fn test_regress_layer_skips_nulls_and_writes_diagnostics() {
        let layer = FeatureCollection::new(vec![
            joined_feature("1", json!(2.0), 1.0),
            joined_feature("2", json!(4.0), 2.0),
            joined_feature("3", Value::Null, 3.0),
            joined_feature("4", json!(5.0), 3.0),
            joined_feature("5", json!(4.0), 4.0),
            joined_feature("6", json!(5.0), 5.0),
        ]);
        let explanatory = vec!["cancer_tracts.canrate".to_string()];
        let fields = RegressionFields {
            unique_id: "cancer_tracts.GEOID10",
            dependent: "zonal_table.MEAN",
            explanatory: &explanatory,
        };

        let (output, summary) = regress_layer(&layer, "tracts_joined", fields).unwrap();

        assert_eq!(summary.observations, 5);
        assert_eq!(output.len(), 5);
        let first = &output.features[0];
        assert_eq!(first.property("cancer_tracts.GEOID10"), Some(&json!("1")));
        for field in [ESTIMATED_FIELD, RESIDUAL_FIELD, STD_RESID_FIELD] {
            assert!(first.number(field).is_some(), "{field}");
        }
        assert_eq!(output.foreign_members[SUMMARY_MEMBER]["observations"], 5);
    }

    #[test]
    fn test_regress_layer_missing_field() {
        let layer = FeatureCollection::new(vec![joined_feature("1", json!(1.0), 1.0)]);
        let explanatory = vec!["cancer_tracts.income".to_string()];
        let fields = RegressionFields {
            unique_id: "cancer_tracts.GEOID10",
            dependent: "zonal_table.MEAN",
            explanatory: &explanatory,
        };
        let err = regress_layer(&layer, "tracts_joined", fields).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Field 'cancer_tracts.income' not found in tracts_joined"
        );
    }
}
