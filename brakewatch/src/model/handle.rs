use crate::error::InferenceError;
use crate::model::classifier::Classifier;
use ndarray::ArrayView2;
use std::fmt;
use std::sync::Arc;

/// Labels and optional probabilities for a block of rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Scores {
    pub labels: Vec<u8>,
    pub probabilities: Option<Vec<f64>>,
}

/// Shared, read-only handle to a loaded classifier.
#[derive(Clone)]
pub struct LoadedModel {
    inner: Arc<dyn Classifier>,
}

impl LoadedModel {
    pub fn new(classifier: impl Classifier + 'static) -> Self {
        Self {
            inner: Arc::new(classifier),
        }
    }

    pub fn feature_names(&self) -> &[String] {
        self.inner.feature_names()
    }

    pub fn score(&self, rows: ArrayView2<'_, f64>) -> Result<Scores, InferenceError> {
        let (labels, probabilities) = self.inner.predict_with_proba(rows)?;
        Ok(Scores {
            labels: labels.to_vec(),
            probabilities: probabilities.map(|p| p.to_vec()),
        })
    }
}

impl fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModel")
            .field("feature_names", &self.feature_names())
            .finish()
    }
}

/// Why the startup load failed. `trace` holds the full cause chain.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadFailure {
    pub message: String,
    pub trace: String,
}

impl LoadFailure {
    pub fn from_error(err: &anyhow::Error) -> Self {
        Self {
            message: format!("{err:#}"),
            trace: format!("{err:?}"),
        }
    }
}

/// Result of the one-time startup load. Never changes afterwards.
#[derive(Debug, Clone)]
pub enum LoadOutcome {
    Loaded { model: LoadedModel, location: String },
    Failed(LoadFailure),
}

impl LoadOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadOutcome::Loaded { .. })
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            LoadOutcome::Loaded { .. } => None,
            LoadOutcome::Failed(failure) => Some(&failure.message),
        }
    }

    /// The model handle, or `ModelUnavailable` carrying the stored failure.
    pub fn model(&self) -> Result<&LoadedModel, InferenceError> {
        match self {
            LoadOutcome::Loaded { model, .. } => Ok(model),
            LoadOutcome::Failed(failure) => Err(InferenceError::ModelUnavailable {
                message: failure.message.clone(),
                trace: Some(failure.trace.clone()),
            }),
        }
    }
}
