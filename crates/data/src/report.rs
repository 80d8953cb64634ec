//! JSON report artifacts.
//!
//! Every file a run writes shares one run id so that artifacts from the
//! same invocation can be matched up later.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportEnvelope<T> {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub kind: String,
    pub data: T,
}

pub struct ReportWriter {
    output_dir: PathBuf,
    run_id: Uuid,
}

impl ReportWriter {
    /// Creates the output directory if needed.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn new(output_dir: &Path) -> Result<Self> {
        fs::create_dir_all(output_dir).with_context(|| {
            format!("Failed to create output directory: {}", output_dir.display())
        })?;
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            run_id: Uuid::new_v4(),
        })
    }

    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Writes `<output_dir>/<kind>.json`, replacing any earlier file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or serialized.
    pub fn write<T: Serialize>(&self, kind: &str, data: &T) -> Result<PathBuf> {
        let path = self.output_dir.join(format!("{kind}.json"));
        let envelope = ReportEnvelope {
            run_id: self.run_id,
            generated_at: Utc::now(),
            kind: kind.to_string(),
            data,
        };
        let file = File::create(&path)
            .with_context(|| format!("Failed to create report file: {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &envelope)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
        info!(kind, path = %path.display(), "Wrote report");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn writes_enveloped_json() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(&dir.path().join("nested/out")).unwrap();

        let path = writer.write("summary", &vec![1, 2, 3]).unwrap();
        let json: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();

        assert_eq!(json["kind"], "summary");
        assert_eq!(json["run_id"], writer.run_id().to_string());
        assert_eq!(json["data"], serde_json::json!([1, 2, 3]));
        assert!(path.ends_with("summary.json"));
    }

    #[test]
    fn reports_from_one_writer_share_run_id() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path()).unwrap();
        let a: Value =
            serde_json::from_str(&fs::read_to_string(writer.write("a", &1).unwrap()).unwrap()).unwrap();
        let b: Value =
            serde_json::from_str(&fs::read_to_string(writer.write("b", &2).unwrap()).unwrap()).unwrap();
        assert_eq!(a["run_id"], b["run_id"]);
    }
}
