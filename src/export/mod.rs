//! Result files of a run.
//!
//! A run started with an output prefix gets one TSV file named after the prefix and the
//! start time, with one line per finished iteration, plus one serialized model file per
//! iteration next to it. Without a prefix results only reach the log.

use crate::model::RankedModel;
use crate::serialization::serialize;
use chrono::{DateTime, Utc};
use log::{debug, info};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

const FILE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";
const LINE_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write result file '{path}': {source}")]
    FileWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Receives the best model of every finished iteration.
pub trait ResultWriter {
    /// # Arguments
    /// * `max_nodes` - Node budget the iteration ran with
    /// * `result` - Best model of the iteration
    fn write(&mut self, max_nodes: usize, result: &RankedModel) -> Result<(), ExportError>;
}

/// Discards results; used when no output prefix is configured.
#[derive(Debug, Default)]
pub struct NullResultWriter;

impl ResultWriter for NullResultWriter {
    fn write(&mut self, max_nodes: usize, result: &RankedModel) -> Result<(), ExportError> {
        debug!("Not exporting result for max_nodes={}: {}", max_nodes, result);
        Ok(())
    }
}

/// Appends results to `<prefix>-<start>.tsv` and stores each model in
/// `<prefix>-<start>-<NNNNNN>.model`.
pub struct FileResultWriter {
    base: String,
    tsv_path: PathBuf,
    tsv: BufWriter<File>,
    sequence: usize,
}

impl FileResultWriter {
    /// Creates the TSV file for a run starting now.
    pub fn create(prefix: &str) -> Result<Self, ExportError> {
        Self::create_at(prefix, Utc::now())
    }

    /// Creates the TSV file for a run started at `started`.
    ///
    /// # Arguments
    /// * `prefix` - Path prefix of every result file
    /// * `started` - Start time embedded in the file names
    ///
    /// # Returns
    /// * `Result<Self, ExportError>` - Fails if the TSV file cannot be created
    pub fn create_at(prefix: &str, started: DateTime<Utc>) -> Result<Self, ExportError> {
        let base = format!("{}-{}", prefix, started.format(FILE_TIMESTAMP_FORMAT));
        let tsv_path = PathBuf::from(format!("{}.tsv", base));
        let file = File::create(&tsv_path).map_err(|source| ExportError::FileWriteError {
            path: tsv_path.clone(),
            source,
        })?;
        info!("Writing results to '{}'", tsv_path.display());
        Ok(Self {
            base,
            tsv_path,
            tsv: BufWriter::new(file),
            sequence: 0,
        })
    }

    pub fn tsv_path(&self) -> &Path {
        &self.tsv_path
    }

    /// Path of the model file with the given 1-based sequence number.
    pub fn model_path(&self, sequence: usize) -> PathBuf {
        PathBuf::from(format!("{}-{:06}.model", self.base, sequence))
    }

    /// Writes one result stamped with `at`.
    pub fn write_at(
        &mut self,
        max_nodes: usize,
        result: &RankedModel,
        at: DateTime<Utc>,
    ) -> Result<(), ExportError> {
        let line = format!(
            "{}\t{}\t{}\n",
            at.format(LINE_TIMESTAMP_FORMAT),
            max_nodes,
            result.to_tsv()
        );
        let tsv_error = |source| ExportError::FileWriteError {
            path: self.tsv_path.clone(),
            source,
        };
        self.tsv.write_all(line.as_bytes()).map_err(tsv_error)?;
        self.tsv.flush().map_err(tsv_error)?;

        self.sequence += 1;
        let model_path = self.model_path(self.sequence);
        fs::write(&model_path, serialize(&result.model)).map_err(|source| {
            ExportError::FileWriteError {
                path: model_path.clone(),
                source,
            }
        })?;
        debug!("Model written to '{}'", model_path.display());
        Ok(())
    }
}

impl ResultWriter for FileResultWriter {
    fn write(&mut self, max_nodes: usize, result: &RankedModel) -> Result<(), ExportError> {
        self.write_at(max_nodes, result, Utc::now())
    }
}

/// Picks the writer for an optional output prefix; an empty prefix counts as absent.
pub fn create_writer(prefix: Option<&str>) -> Result<Box<dyn ResultWriter>, ExportError> {
    match prefix.filter(|p| !p.is_empty()) {
        Some(prefix) => Ok(Box::new(FileResultWriter::create(prefix)?)),
        None => {
            info!("No result output prefix configured, results are only logged");
            Ok(Box::new(NullResultWriter))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::Node;
    use crate::model::Model;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn started() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 2, 17, 5, 57, 40).unwrap()
    }

    fn result() -> RankedModel {
        RankedModel::new(Model::from_node(Node::Constant(3.0)), 1.0)
    }

    #[test]
    fn test_file_writer_output() {
        let dir = tempdir().unwrap();
        let prefix = dir.path().join("result");
        let mut writer = FileResultWriter::create_at(&prefix.to_string_lossy(), started()).unwrap();
        assert_eq!(
            writer.tsv_path(),
            dir.path().join("result-2021-02-17-05-57-40.tsv")
        );

        let at = Utc.with_ymd_and_hms(2021, 2, 17, 5, 57, 53).unwrap();
        writer.write_at(4, &result(), at).unwrap();
        writer.write_at(5, &result(), at).unwrap();

        let tsv = fs::read_to_string(writer.tsv_path()).unwrap();
        assert_eq!(
            tsv,
            "2021-02-17T05:57:53\t4\t1.000000\t3.0\t3.0\n2021-02-17T05:57:53\t5\t1.000000\t3.0\t3.0\n"
        );
        let first = dir.path().join("result-2021-02-17-05-57-40-000001.model");
        let second = dir.path().join("result-2021-02-17-05-57-40-000002.model");
        assert_eq!(fs::read_to_string(first).unwrap(), "y000=ConstantNode(3.0)\n");
        assert!(second.exists());
    }

    #[test]
    fn test_line_keeps_fractional_seconds() {
        let dir = tempdir().unwrap();
        let prefix = dir.path().join("fraction");
        let mut writer = FileResultWriter::create_at(&prefix.to_string_lossy(), started()).unwrap();
        let at = Utc.with_ymd_and_hms(2021, 2, 17, 5, 57, 53).unwrap()
            + chrono::Duration::milliseconds(250);
        writer.write_at(4, &result(), at).unwrap();

        let tsv = fs::read_to_string(writer.tsv_path()).unwrap();
        assert_eq!(tsv, "2021-02-17T05:57:53.250\t4\t1.000000\t3.0\t3.0\n");
    }

    #[test]
    fn test_create_fails_in_missing_directory() {
        let dir = tempdir().unwrap();
        let prefix = dir.path().join("missing").join("result");
        let error = FileResultWriter::create_at(&prefix.to_string_lossy(), started());
        assert!(matches!(error, Err(ExportError::FileWriteError { .. })));
    }

    #[test]
    fn test_null_writer_accepts_everything() {
        let mut writer = create_writer(None).unwrap();
        assert!(writer.write(3, &result()).is_ok());
        let mut writer = create_writer(Some("")).unwrap();
        assert!(writer.write(3, &result()).is_ok());
    }
}
