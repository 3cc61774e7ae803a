/*!
 * Wrapper around the external DWG/DXF converter (ODA File Converter).
 *
 * The converter works on folders: it converts every matching file of an
 * input folder into an output folder. Its exit status is not reliable, so a
 * conversion is judged by the caller looking for the expected output file.
 */

use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Debug;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::app_config::ConverterConfig;
use crate::errors::PipelineError;

/// Drawing file format accepted by the converter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DrawingFormat {
    #[default]
    Dwg,
    Dxf,
}

impl DrawingFormat {
    /// File extension, without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Dwg => "dwg",
            Self::Dxf => "dxf",
        }
    }

    /// Format argument understood by the converter
    pub fn converter_arg(&self) -> &'static str {
        match self {
            Self::Dwg => "DWG",
            Self::Dxf => "DXF",
        }
    }
}

impl fmt::Display for DrawingFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// One folder-to-folder conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionJob {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// e.g. `ACAD2018`
    pub target_version: String,
    pub target_format: DrawingFormat,
    pub recurse: bool,
    pub audit: bool,
    /// Wildcard filter, e.g. `*.DWG` or a single file name
    pub file_filter: String,
}

impl ConversionJob {
    /// Positional arguments in the order the converter expects them
    pub fn args(&self) -> Vec<String> {
        vec![
            self.input_dir.to_string_lossy().to_string(),
            self.output_dir.to_string_lossy().to_string(),
            self.target_version.clone(),
            self.target_format.converter_arg().to_string(),
            if self.recurse { "1" } else { "0" }.to_string(),
            if self.audit { "1" } else { "0" }.to_string(),
            self.file_filter.clone(),
        ]
    }
}

/// Converts drawings between formats
#[async_trait]
pub trait DrawingConverter: Send + Sync + Debug {
    /// Run one conversion; success means the process ran, not that output exists
    async fn convert(&self, job: &ConversionJob) -> Result<(), PipelineError>;
}

/// The ODA File Converter command line tool
#[derive(Debug, Clone)]
pub struct OdaFileConverter {
    executable: PathBuf,
    timeout: Duration,
}

impl OdaFileConverter {
    pub fn new(executable: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            executable: executable.into(),
            timeout,
        }
    }

    pub fn from_config(config: &ConverterConfig) -> Self {
        Self::new(config.executable.clone(), Duration::from_secs(config.timeout_secs))
    }
}

#[async_trait]
impl DrawingConverter for OdaFileConverter {
    async fn convert(&self, job: &ConversionJob) -> Result<(), PipelineError> {
        let args = job.args();
        debug!("Running {:?} {}", self.executable, args.join(" "));

        let output_future = Command::new(&self.executable)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = tokio::select! {
            result = output_future => {
                result.map_err(|e| PipelineError::ConversionError(
                    format!("Failed to start converter {:?}: {}", self.executable, e)
                ))?
            },
            _ = tokio::time::sleep(self.timeout) => {
                return Err(PipelineError::ConversionError(format!(
                    "Converter timed out after {} seconds",
                    self.timeout.as_secs()
                )));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(
                "Converter exited with {} for {:?}: {}",
                output.status,
                job.input_dir,
                stderr.trim()
            );
        }

        Ok(())
    }
}
