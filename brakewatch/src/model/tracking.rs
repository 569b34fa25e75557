use crate::model::loader::LoadError;
use std::fs;
use std::path::{Path, PathBuf};

/// A file-backed experiment-tracking store.
///
/// Runs live at `<root>/<experiment_id>/<run_id>/artifacts/`, registered
/// models at `<root>/models/<name>/<stage_or_version>/`.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingStore {
    root: PathBuf,
}

impl TrackingStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Accepts `file://` URIs and bare paths. Remote stores are rejected.
    pub fn from_uri(uri: &str) -> Result<Self, LoadError> {
        let uri = uri.trim();
        if let Some(path) = uri.strip_prefix("file://") {
            return Ok(Self::new(path));
        }
        if uri.starts_with("http://") || uri.starts_with("https://") {
            return Err(LoadError::RemoteStore(uri.to_string()));
        }
        Ok(Self::new(uri))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Finds the artifact directory of `run_id` by scanning every experiment.
    /// `artifact_path` stays relative: every `/`-separated segment is checked.
    pub fn run_artifact(&self, run_id: &str, artifact_path: &str) -> Result<PathBuf, LoadError> {
        check_segment(run_id)?;
        artifact_path.split('/').try_for_each(check_segment)?;
        let entries = fs::read_dir(&self.root).map_err(|source| LoadError::Io {
            path: self.root.clone(),
            source,
        })?;

        for entry in entries.flatten() {
            let run_dir = entry.path().join(run_id);
            if run_dir.is_dir() {
                return Ok(run_dir.join("artifacts").join(artifact_path));
            }
        }

        Err(LoadError::RunNotFound {
            run_id: run_id.to_string(),
            root: self.root.clone(),
        })
    }

    pub fn registered_model(&self, name: &str, version: &str) -> Result<PathBuf, LoadError> {
        check_segment(name)?;
        check_segment(version)?;
        Ok(self.root.join("models").join(name).join(version))
    }
}

// Identifiers become single path components.
fn check_segment(segment: &str) -> Result<(), LoadError> {
    if segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(['/', '\\'])
    {
        return Err(LoadError::InvalidUri(format!(
            "invalid identifier {segment:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_from_uri() {
        assert_eq!(
            TrackingStore::from_uri("file:///srv/mlruns").unwrap().root(),
            Path::new("/srv/mlruns")
        );
        assert_eq!(
            TrackingStore::from_uri("mlruns").unwrap().root(),
            Path::new("mlruns")
        );
        assert!(matches!(
            TrackingStore::from_uri("http://tracking:5000"),
            Err(LoadError::RemoteStore(_))
        ));
    }

    #[test]
    fn test_run_artifact_found_in_any_experiment() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("0")).unwrap();
        fs::create_dir_all(dir.path().join("7/abc123/artifacts/model")).unwrap();

        let store = TrackingStore::new(dir.path());
        let path = store.run_artifact("abc123", "model").unwrap();
        assert_eq!(path, dir.path().join("7/abc123/artifacts/model"));
    }

    #[test]
    fn test_run_not_found() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("0/other")).unwrap();
        let store = TrackingStore::new(dir.path());
        assert!(matches!(
            store.run_artifact("abc123", "model"),
            Err(LoadError::RunNotFound { .. })
        ));
    }

    #[test]
    fn test_missing_root_is_io_error() {
        let store = TrackingStore::new("/nonexistent/mlruns");
        assert!(matches!(
            store.run_artifact("abc123", "model"),
            Err(LoadError::Io { .. })
        ));
    }

    #[test]
    fn test_traversal_rejected() {
        let store = TrackingStore::new("mlruns");
        assert!(store.run_artifact("..", "model").is_err());
        assert!(store.registered_model("a/b", "Production").is_err());
    }

    #[test]
    fn test_artifact_path_stays_inside_run() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("0/abc123/artifacts/nested/model")).unwrap();
        let store = TrackingStore::new(dir.path());

        for artifact_path in ["/etc/model", "", "model/../../x", "./model", "a\\b"] {
            assert!(
                matches!(
                    store.run_artifact("abc123", artifact_path),
                    Err(LoadError::InvalidUri(_))
                ),
                "accepted {artifact_path:?}"
            );
        }
        assert_eq!(
            store.run_artifact("abc123", "nested/model").unwrap(),
            dir.path().join("0/abc123/artifacts/nested/model")
        );
    }

    #[test]
    fn test_registered_model_path() {
        let store = TrackingStore::new("mlruns");
        assert_eq!(
            store
                .registered_model("BrakeFailureModel", "Production")
                .unwrap(),
            PathBuf::from("mlruns/models/BrakeFailureModel/Production")
        );
    }
}
