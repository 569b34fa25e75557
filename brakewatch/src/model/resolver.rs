use crate::config::ModelConfig;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Where the model artifact comes from. Exactly one is chosen per process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelLocation {
    ExplicitUri(String),
    RecordedRun {
        id_file: PathBuf,
        run_id: String,
        artifact_path: String,
    },
    LocalDirectory(PathBuf),
}

impl ModelLocation {
    /// URI form, as understood by the loader.
    pub fn uri(&self) -> String {
        match self {
            ModelLocation::ExplicitUri(uri) => uri.clone(),
            ModelLocation::RecordedRun {
                run_id,
                artifact_path,
                ..
            } => format!("runs:/{run_id}/{artifact_path}"),
            ModelLocation::LocalDirectory(path) => path.display().to_string(),
        }
    }
}

impl fmt::Display for ModelLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelLocation::ExplicitUri(uri) => write!(f, "{uri} (explicit)"),
            ModelLocation::RecordedRun { id_file, .. } => {
                write!(f, "{} (recorded in {})", self.uri(), id_file.display())
            }
            ModelLocation::LocalDirectory(path) => write!(f, "{} (local)", path.display()),
        }
    }
}

/// Picks the model location at startup. First match wins:
/// explicit URI, then the recorded run-id file, then the local directory.
#[derive(Debug, Clone)]
pub struct Resolver {
    pub explicit_uri: Option<String>,
    pub run_id_file: PathBuf,
    pub artifact_path: String,
    pub local_dir: PathBuf,
}

impl Resolver {
    pub fn from_config(config: &ModelConfig) -> Self {
        Self {
            explicit_uri: config.uri.clone(),
            run_id_file: config.run_id_file.clone(),
            artifact_path: config.artifact_path.clone(),
            local_dir: config.local_dir.clone(),
        }
    }

    pub fn resolve(&self) -> Option<ModelLocation> {
        if let Some(uri) = self.explicit_uri.as_deref().map(str::trim) {
            if !uri.is_empty() {
                return Some(ModelLocation::ExplicitUri(uri.to_string()));
            }
        }

        match fs::read_to_string(&self.run_id_file) {
            Ok(content) => {
                let run_id = content.trim();
                if !run_id.is_empty() {
                    return Some(ModelLocation::RecordedRun {
                        id_file: self.run_id_file.clone(),
                        run_id: run_id.to_string(),
                        artifact_path: self.artifact_path.clone(),
                    });
                }
                debug!(path = %self.run_id_file.display(), "run id file is empty");
            }
            Err(e) => {
                debug!(path = %self.run_id_file.display(), error = %e, "no run id file");
            }
        }

        if self.local_dir.is_dir() {
            return Some(ModelLocation::LocalDirectory(self.local_dir.clone()));
        }

        None
    }
}
