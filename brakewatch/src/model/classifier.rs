use crate::error::InferenceError;
use ndarray::{Array1, ArrayView2};
use serde::{Deserialize, Serialize};

/// A trained binary classifier over named numeric columns.
pub trait Classifier: Send + Sync {
    /// Column order expected by `predict`.
    fn feature_names(&self) -> &[String];

    /// Class label (0 or 1) per row.
    fn predict(&self, rows: ArrayView2<'_, f64>) -> Result<Array1<u8>, InferenceError>;

    /// Positive-class probability per row, for classifiers that expose one.
    fn predict_proba(
        &self,
        _rows: ArrayView2<'_, f64>,
    ) -> Option<Result<Array1<f64>, InferenceError>> {
        None
    }

    /// Labels plus probabilities in one pass. Override when both come from
    /// the same computation.
    fn predict_with_proba(
        &self,
        rows: ArrayView2<'_, f64>,
    ) -> Result<(Array1<u8>, Option<Array1<f64>>), InferenceError> {
        let labels = self.predict(rows)?;
        let proba = self.predict_proba(rows).transpose()?;
        Ok((labels, proba))
    }
}

/// On-disk parameters of a logistic-regression artifact.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LogisticRegressionParams {
    pub feature_names: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_threshold() -> f64 {
    0.5
}

/// Serialized model document (`model.json`), tagged by flavor.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "flavor", rename_all = "snake_case")]
pub enum ModelArtifact {
    LogisticRegression(LogisticRegressionParams),
}

#[derive(Debug, Clone)]
pub struct LogisticRegression {
    feature_names: Vec<String>,
    coefficients: Array1<f64>,
    intercept: f64,
    threshold: f64,
}

impl LogisticRegression {
    pub fn new(params: LogisticRegressionParams) -> Result<Self, String> {
        if params.feature_names.is_empty() {
            return Err("model declares no features".to_string());
        }
        if params.coefficients.len() != params.feature_names.len() {
            return Err(format!(
                "{} coefficients for {} features",
                params.coefficients.len(),
                params.feature_names.len()
            ));
        }
        if params.coefficients.iter().any(|c| !c.is_finite()) || !params.intercept.is_finite() {
            return Err("model parameters must be finite".to_string());
        }
        if !(params.threshold > 0.0 && params.threshold < 1.0) {
            return Err(format!(
                "decision threshold {} outside (0, 1)",
                params.threshold
            ));
        }
        Ok(Self {
            feature_names: params.feature_names,
            coefficients: Array1::from(params.coefficients),
            intercept: params.intercept,
            threshold: params.threshold,
        })
    }

    /// Raw linear score `x·w + b` per row. Overflow saturates to `±inf`.
    pub fn decision_function(
        &self,
        rows: ArrayView2<'_, f64>,
    ) -> Result<Array1<f64>, InferenceError> {
        if rows.ncols() != self.coefficients.len() {
            return Err(InferenceError::ShapeMismatch {
                expected: self.coefficients.len(),
                got: rows.ncols(),
            });
        }
        let scores = rows.dot(&self.coefficients) + self.intercept;
        // inf - inf across opposite-signed terms; the readings are out of range.
        if scores.iter().any(|s| s.is_nan()) {
            return Err(InferenceError::InvalidInput(
                "readings too large to score".to_string(),
            ));
        }
        Ok(scores)
    }

    fn probabilities(&self, rows: ArrayView2<'_, f64>) -> Result<Array1<f64>, InferenceError> {
        Ok(self.decision_function(rows)?.mapv(sigmoid))
    }

    fn labels(&self, proba: &Array1<f64>) -> Array1<u8> {
        let threshold = self.threshold;
        proba.mapv(|p| u8::from(p > threshold))
    }
}

impl Classifier for LogisticRegression {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict(&self, rows: ArrayView2<'_, f64>) -> Result<Array1<u8>, InferenceError> {
        Ok(self.labels(&self.probabilities(rows)?))
    }

    fn predict_proba(
        &self,
        rows: ArrayView2<'_, f64>,
    ) -> Option<Result<Array1<f64>, InferenceError>> {
        Some(self.probabilities(rows))
    }

    fn predict_with_proba(
        &self,
        rows: ArrayView2<'_, f64>,
    ) -> Result<(Array1<u8>, Option<Array1<f64>>), InferenceError> {
        let proba = self.probabilities(rows)?;
        Ok((self.labels(&proba), Some(proba)))
    }
}

// Split on sign so exp() never overflows.
fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}
