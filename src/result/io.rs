//! Clustering result persistence.
//!
//! Results serialize to a flat JSON document:
//! `{epsilon, invocation_sets, clusters, noise_invocations, extra}`.
//! The document round-trips structurally through a write/read cycle.

use crate::result::ClusteringInformation;
use crate::utils::error::OutputError;
use log::{debug, info};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

impl ClusteringInformation {
    /// Write this result to a JSON file
    ///
    /// **Public** - main persistence entry point
    ///
    /// # Errors
    /// * `OutputError::InvalidPath` - empty path or path is a directory
    /// * `OutputError::WriteFailed` - I/O error during write
    /// * `OutputError::SerializationFailed` - JSON serialization error
    pub fn to_file(&self, output_path: impl AsRef<Path>) -> Result<(), OutputError> {
        let output_path = output_path.as_ref();

        info!("Writing clustering result to: {}", output_path.display());

        validate_output_path(output_path)?;

        if let Some(parent) = output_path.parent() {
            if !parent.exists() {
                debug!("Creating parent directories: {}", parent.display());
                std::fs::create_dir_all(parent).map_err(|e| {
                    OutputError::InvalidPath(format!(
                        "Cannot create directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let file = File::create(output_path).map_err(OutputError::WriteFailed)?;
        let writer = BufWriter::new(file);

        serde_json::to_writer(writer, self).map_err(OutputError::SerializationFailed)?;

        Ok(())
    }

    /// Read a result back from a JSON file
    ///
    /// The partition invariant is re-validated after parsing, so a
    /// hand-edited file with overlapping clusters is rejected here.
    ///
    /// # Errors
    /// * `OutputError::WriteFailed` - file read error
    /// * `OutputError::SerializationFailed` - JSON parse error
    /// * `OutputError::InvalidResult` - partition invariant violated
    pub fn from_file(input_path: impl AsRef<Path>) -> Result<Self, OutputError> {
        let input_path = input_path.as_ref();

        debug!("Reading clustering result from: {}", input_path.display());

        let file = File::open(input_path).map_err(OutputError::WriteFailed)?;
        let info: ClusteringInformation =
            serde_json::from_reader(file).map_err(OutputError::SerializationFailed)?;

        info.validate()?;

        debug!(
            "Loaded result: {} sets, {} clusters",
            info.invocation_set_count(),
            info.cluster_count()
        );

        Ok(info)
    }
}

/// Validate that the output path is usable
///
/// **Private** - internal validation
fn validate_output_path(path: &Path) -> Result<(), OutputError> {
    if path.as_os_str().is_empty() {
        return Err(OutputError::InvalidPath("Path is empty".to_string()));
    }

    if path.exists() && path.is_dir() {
        return Err(OutputError::InvalidPath(format!(
            "Path is a directory: {}",
            path.display()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::ClusteringExtra;
    use tempfile::NamedTempFile;

    fn sample() -> ClusteringInformation {
        let mut extra = ClusteringExtra {
            instr_coverage: 0.9,
            inv_coverage: 0.8,
            ..Default::default()
        };
        extra.coverage.insert("0".to_string(), 0.9);
        extra.coverage.insert("-1".to_string(), 0.1);
        extra.centroids.insert("0".to_string(), 1);
        extra.instructions_metric.insert("0".to_string(), 1000.0);

        ClusteringInformation::new(
            Some(1.25),
            vec![vec![0, 1], vec![2], vec![3]],
            vec![vec![0, 1]],
            vec![2],
            Some(extra),
        )
        .unwrap()
    }

    #[test]
    fn test_round_trip() {
        let info = sample();
        let temp_file = NamedTempFile::new().unwrap();

        info.to_file(temp_file.path()).unwrap();
        let loaded = ClusteringInformation::from_file(temp_file.path()).unwrap();

        assert_eq!(loaded, info);
    }

    #[test]
    fn test_round_trip_without_extra() {
        let info =
            ClusteringInformation::new(None, vec![vec![0], vec![1]], vec![vec![0]], vec![1], None)
                .unwrap();
        let temp_file = NamedTempFile::new().unwrap();

        info.to_file(temp_file.path()).unwrap();
        let loaded = ClusteringInformation::from_file(temp_file.path()).unwrap();

        assert_eq!(loaded, info);
        assert_eq!(loaded.epsilon(), None);
    }

    #[test]
    fn test_corrupt_partition_rejected_on_read() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(
            temp_file.path(),
            r#"{"epsilon": 0.5, "invocation_sets": [[0], [1]], "clusters": [[0], [0]], "noise_invocations": [1], "extra": null}"#,
        )
        .unwrap();

        let result = ClusteringInformation::from_file(temp_file.path());
        assert!(matches!(result, Err(OutputError::InvalidResult(_))));
    }

    #[test]
    fn test_write_to_directory_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = sample().to_file(temp_dir.path());
        assert!(matches!(result, Err(OutputError::InvalidPath(_))));
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let temp_dir = tempfile::tempdir().unwrap();
        let nested_path = temp_dir.path().join("nested/dirs/clusters.json");

        sample().to_file(&nested_path).unwrap();

        assert!(nested_path.exists());
    }
}
