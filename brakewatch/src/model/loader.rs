use crate::model::classifier::{Classifier, LogisticRegression, ModelArtifact};
use crate::model::handle::{LoadFailure, LoadOutcome, LoadedModel};
use crate::model::resolver::{ModelLocation, Resolver};
use crate::model::tracking::TrackingStore;
use crate::preprocessing::features::FEATURE_NAMES;
use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// File name of the serialized model inside an artifact directory.
pub const MODEL_FILE: &str = "model.json";

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("no model location found (no explicit URI, run id file or local model directory)")]
    NoLocation,

    #[error("invalid model URI: {0}")]
    InvalidUri(String),

    #[error("unsupported model URI scheme: {0}")]
    UnsupportedUri(String),

    #[error("remote tracking store {0} is not supported, point the tracking URI at a local directory")]
    RemoteStore(String),

    #[error("run {run_id} not found under {}", root.display())]
    RunNotFound { run_id: String, root: PathBuf },

    #[error("model artifact not found at {}", .0.display())]
    ArtifactNotFound(PathBuf),

    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse model artifact {}", path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("incompatible model artifact {}: {reason}", path.display())]
    IncompatibleModel { path: PathBuf, reason: String },
}

/// Maps a model URI to a filesystem path.
///
/// Understands `runs:/<run_id>/<artifact_path>`, `models:/<name>/<stage>`,
/// `file://<path>` and bare paths.
pub fn resolve_uri(uri: &str, store: &TrackingStore) -> Result<PathBuf, LoadError> {
    if let Some(rest) = uri.strip_prefix("runs:/") {
        let (run_id, artifact_path) = rest
            .trim_start_matches('/')
            .split_once('/')
            .ok_or_else(|| LoadError::InvalidUri(uri.to_string()))?;
        return store.run_artifact(run_id, artifact_path.trim_end_matches('/'));
    }

    if let Some(rest) = uri.strip_prefix("models:/") {
        let (name, version) = rest
            .trim_matches('/')
            .split_once('/')
            .ok_or_else(|| LoadError::InvalidUri(uri.to_string()))?;
        return store.registered_model(name, version);
    }

    if let Some(path) = uri.strip_prefix("file://") {
        return Ok(PathBuf::from(path));
    }

    match uri.split_once("://") {
        Some((scheme, _)) => Err(LoadError::UnsupportedUri(scheme.to_string())),
        None => Ok(PathBuf::from(uri)),
    }
}

/// Resolves `location` to an artifact path and loads it.
pub fn load_model(
    location: &ModelLocation,
    store: &TrackingStore,
) -> Result<LoadedModel, LoadError> {
    let path = match location {
        ModelLocation::LocalDirectory(dir) => dir.clone(),
        other => resolve_uri(&other.uri(), store)?,
    };
    load_artifact(&path)
}

/// Loads a model from an artifact directory or directly from its JSON file.
pub fn load_artifact(path: impl AsRef<Path>) -> Result<LoadedModel, LoadError> {
    let path = path.as_ref();
    let file = if path.is_dir() {
        path.join(MODEL_FILE)
    } else {
        path.to_path_buf()
    };
    if !file.is_file() {
        return Err(LoadError::ArtifactNotFound(path.to_path_buf()));
    }

    let content = fs::read_to_string(&file).map_err(|source| LoadError::Io {
        path: file.clone(),
        source,
    })?;
    let artifact: ModelArtifact =
        serde_json::from_str(&content).map_err(|source| LoadError::Format {
            path: file.clone(),
            source,
        })?;

    let incompatible = |reason: String| LoadError::IncompatibleModel {
        path: file.clone(),
        reason,
    };

    let model = match artifact {
        ModelArtifact::LogisticRegression(params) => {
            if let Some(unknown) = params
                .feature_names
                .iter()
                .find(|name| !FEATURE_NAMES.contains(&name.as_str()))
            {
                return Err(incompatible(format!("unknown feature `{unknown}`")));
            }
            LogisticRegression::new(params).map_err(incompatible)?
        }
    };

    info!(
        path = %file.display(),
        features = ?model.feature_names(),
        "Loaded model"
    );
    Ok(LoadedModel::new(model))
}

/// Runs resolution and loading once. Failures are recorded, never propagated.
pub fn load_at_startup(resolver: &Resolver, tracking_uri: &str) -> LoadOutcome {
    let Some(location) = resolver.resolve() else {
        let err = anyhow::Error::new(LoadError::NoLocation);
        warn!(error = %err, "Model not loaded");
        return LoadOutcome::Failed(LoadFailure::from_error(&err));
    };
    info!(location = %location, "Resolved model location");

    let result = TrackingStore::from_uri(tracking_uri)
        .and_then(|store| load_model(&location, &store))
        .with_context(|| format!("failed to load model from {}", location.uri()));

    match result {
        Ok(model) => LoadOutcome::Loaded {
            model,
            location: location.uri(),
        },
        Err(err) => {
            warn!(error = %format!("{err:#}"), "Model not loaded");
            LoadOutcome::Failed(LoadFailure::from_error(&err))
        }
    }
}
