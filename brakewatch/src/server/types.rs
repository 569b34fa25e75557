use crate::model::handle::{LoadOutcome, Scores};
use serde::Serialize;

/// Shared Application State
///
/// Built once at startup and only read afterwards.
#[derive(Clone, Debug)]
pub struct AppState {
    pub outcome: LoadOutcome,
    /// Attach diagnostic chains to error bodies.
    pub expose_details: bool,
}

impl AppState {
    pub fn new(outcome: LoadOutcome) -> Self {
        Self {
            outcome,
            expose_details: false,
        }
    }

    pub fn with_details(mut self, expose_details: bool) -> Self {
        self.expose_details = expose_details;
        self
    }
}

// --- DTOs (Data Transfer Objects) ---

#[derive(Serialize, Debug, PartialEq)]
pub struct HealthResponse {
    pub status: &'static str,
    pub error: Option<String>,
}

impl HealthResponse {
    pub fn from_outcome(outcome: &LoadOutcome) -> Self {
        match outcome.error_message() {
            None => Self {
                status: "ok",
                error: None,
            },
            Some(message) => Self {
                status: "error",
                error: Some(message.to_string()),
            },
        }
    }
}

/// Scalar fields for a single reading, arrays for a batch.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum PredictionResponse {
    Single {
        prediction: u8,
        #[serde(skip_serializing_if = "Option::is_none")]
        probability: Option<f64>,
    },
    Batch {
        prediction: Vec<u8>,
        #[serde(skip_serializing_if = "Option::is_none")]
        probability: Option<Vec<f64>>,
    },
}

impl PredictionResponse {
    pub fn from_scores(scores: Scores, batch: bool) -> Self {
        if batch {
            return PredictionResponse::Batch {
                prediction: scores.labels,
                probability: scores.probabilities,
            };
        }
        PredictionResponse::Single {
            prediction: scores.labels.first().copied().unwrap_or_default(),
            probability: scores
                .probabilities
                .as_ref()
                .and_then(|p| p.first().copied()),
        }
    }

    pub fn rows(&self) -> usize {
        match self {
            PredictionResponse::Single { .. } => 1,
            PredictionResponse::Batch { prediction, .. } => prediction.len(),
        }
    }
}
