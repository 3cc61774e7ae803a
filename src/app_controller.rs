use anyhow::{Context, Result, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Semaphore, mpsc};

use crate::app_config::Config;
use crate::converter::{ConversionJob, DrawingConverter, DrawingFormat, OdaFileConverter};
use crate::drawing::dxf::DxfCodec;
use crate::drawing::{DrawingCodec, ExtractedTextItem};
use crate::errors::{FileFailure, PipelineError};
use crate::file_utils::{FileManager, FileType};
use crate::pipeline::{FilePipeline, FileReport, PipelineSettings, PipelineState};
use crate::providers::Provider;
use crate::providers::deepl::DeepL;
use crate::translation::{DecisionEngine, GlossaryIndex, SkipPhraseFilter, TranslationOptions};

// @module: Batch controller for drawing translation

/// Name of the batch issues log written next to the outputs
pub const ISSUES_LOG_NAME: &str = "cadtranslator.issues.log";

/// Outcome of a batch
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub succeeded: Vec<FileReport>,
    pub failed: Vec<FileFailure>,
    /// Inputs whose output already existed
    pub skipped: Vec<PathBuf>,
    pub duration: Duration,
}

impl BatchSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn message(&self) -> String {
        format!(
            "Batch completed: {} translated, {} skipped, {} failed",
            self.succeeded.len(),
            self.skipped.len(),
            self.failed.len()
        )
    }
}

/// Main application controller for drawing translation
#[derive(Debug)]
pub struct Controller {
    // @field: App configuration
    config: Config,
    glossary: Arc<GlossaryIndex>,
    skip_filter: Arc<SkipPhraseFilter>,
    provider: Arc<dyn Provider>,
    converter: Arc<dyn DrawingConverter>,
    codec: Arc<dyn DrawingCodec>,
}

impl Controller {
    // @method: Create a controller with the production provider, converter and codec
    pub fn with_config(config: Config) -> Result<Self> {
        let glossary = Self::load_glossary(&config)?;
        let provider: Arc<dyn Provider> = Arc::new(DeepL::from_config(&config.translation));
        let converter: Arc<dyn DrawingConverter> = Arc::new(OdaFileConverter::from_config(&config.converter));

        Ok(Self::with_components(config, glossary, provider, converter, Arc::new(DxfCodec)))
    }

    /// Create a controller from explicit parts
    pub fn with_components(
        config: Config,
        glossary: GlossaryIndex,
        provider: Arc<dyn Provider>,
        converter: Arc<dyn DrawingConverter>,
        codec: Arc<dyn DrawingCodec>,
    ) -> Self {
        Self {
            config,
            glossary: Arc::new(glossary),
            skip_filter: Arc::new(SkipPhraseFilter::builtin()),
            provider,
            converter,
            codec,
        }
    }

    /// Load the configured glossary, or an empty one when none is set
    pub fn load_glossary(config: &Config) -> Result<GlossaryIndex> {
        match &config.glossary_path {
            Some(path) => {
                let glossary = GlossaryIndex::from_csv_path(path, &config.source_language, &config.target_language)
                    .with_context(|| format!("Failed to load glossary {:?}", path))?;
                info!("Glossary loaded: {} term(s) from {}", glossary.len(), path.display());
                Ok(glossary)
            }
            None => Ok(GlossaryIndex::empty()),
        }
    }

    /// Output folder used when none is configured: `output` next to the input
    pub fn default_output_dir(input: &Path) -> PathBuf {
        if input.is_dir() {
            input.join("output")
        } else {
            input
                .parent()
                .map(|p| p.join("output"))
                .unwrap_or_else(|| PathBuf::from("output"))
        }
    }

    /// Drawings to process for a file or folder input
    pub fn collect_inputs(input: &Path, output_dir: &Path) -> Result<Vec<PathBuf>> {
        if input.is_file() {
            return Ok(vec![input.to_path_buf()]);
        }
        if input.is_dir() {
            return FileManager::find_drawings(input, Some(output_dir));
        }
        Err(anyhow!("Input path does not exist: {:?}", input))
    }

    /// Pipeline writing into `output_dir`
    pub fn pipeline_for(&self, output_dir: PathBuf) -> Result<FilePipeline> {
        let options = TranslationOptions::from_config(&self.config)?;
        let engine = DecisionEngine::new(self.glossary.clone(), self.skip_filter.clone());
        Ok(FilePipeline::new(
            engine,
            self.provider.clone(),
            options,
            self.converter.clone(),
            self.codec.clone(),
            PipelineSettings::from_config(&self.config, output_dir),
        ))
    }

    /// Translate a drawing or every drawing of a folder
    pub async fn run(&self, input: &Path, force_overwrite: bool) -> Result<BatchSummary> {
        let start_time = Instant::now();

        let output_dir = self
            .config
            .output_dir
            .clone()
            .unwrap_or_else(|| Self::default_output_dir(input));
        let files = Self::collect_inputs(input, &output_dir)?;
        if files.is_empty() {
            return Err(anyhow!("No DWG or DXF drawings found in {:?}", input));
        }
        FileManager::ensure_dir(&output_dir)?;
        let pipeline = Arc::new(self.pipeline_for(output_dir.clone())?);

        let mut summary = BatchSummary::default();
        let mut pending = Vec::new();
        let mut claimed: HashMap<String, PathBuf> = HashMap::new();
        for file in files {
            let output_path = pipeline.output_path_for(&file);
            // Outputs are flat, so inputs from different subfolders may share a name
            let key = output_path.to_string_lossy().to_lowercase();
            if let Some(owner) = claimed.get(&key) {
                error!("{:?} writes the same output as {:?}, not translated", file, owner);
                summary.failed.push(FileFailure {
                    input: file,
                    state: PipelineState::Created,
                    error: PipelineError::OutputConflict(output_path),
                });
                continue;
            }
            claimed.insert(key, file.clone());

            if output_path.exists() && !force_overwrite {
                warn!(
                    "Skipping {:?}, translation already exists (use -f to force overwrite)",
                    file
                );
                summary.skipped.push(file);
            } else {
                pending.push(file);
            }
        }

        let progress = ProgressBar::new(pending.len() as u64);
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} drawings ({percent}%) {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress.set_style(template_result.progress_chars("█▓▒░"));
        progress.set_message("Translating drawings");

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_files.max(1)));
        let (tx, mut rx) = mpsc::channel::<Result<FileReport, FileFailure>>(pending.len().max(1));
        let mut workers = Vec::with_capacity(pending.len());

        for file in pending {
            let pipeline = Arc::clone(&pipeline);
            let semaphore = Arc::clone(&semaphore);
            let tx = tx.clone();
            let input = file.clone();

            let handle = tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                let outcome = pipeline.process_file(&input).await;
                let _ = tx.send(outcome).await;
            });
            workers.push((file, handle));
        }
        drop(tx);

        while let Some(outcome) = rx.recv().await {
            progress.inc(1);
            match outcome {
                Ok(report) => {
                    progress.set_message(format!(
                        "{} done",
                        report.input.file_name().unwrap_or_default().to_string_lossy()
                    ));
                    summary.succeeded.push(report);
                }
                Err(failure) => {
                    error!("{}", failure);
                    summary.failed.push(failure);
                }
            }
        }

        for (file, handle) in workers {
            if let Err(e) = handle.await {
                error!("Worker for {:?} stopped unexpectedly: {}", file, e);
                summary.failed.push(FileFailure {
                    input: file,
                    state: PipelineState::Failed,
                    error: PipelineError::Io(std::io::Error::other(e.to_string())),
                });
            }
        }

        progress.finish_with_message("Batch complete");
        summary.duration = start_time.elapsed();
        info!("{} in {:.1}s", summary.message(), summary.duration.as_secs_f64());

        self.write_issues_log(&output_dir, input, &summary);
        Ok(summary)
    }

    fn write_issues_log(&self, output_dir: &Path, input: &Path, summary: &BatchSummary) {
        if summary.failed.is_empty() && summary.succeeded.iter().all(|r| r.warnings.is_empty()) {
            return;
        }
        let log_path = output_dir.join(ISSUES_LOG_NAME);

        let mut lines = vec![format!("{} ({})", summary.message(), input.display())];
        for failure in &summary.failed {
            lines.push(format!("FAILED {}", failure));
        }
        for report in &summary.succeeded {
            for warning in &report.warnings {
                lines.push(format!("WARN {}: {}", report.input.display(), warning));
            }
        }

        for line in lines {
            if let Err(e) = FileManager::append_to_log_file(&log_path, &line) {
                warn!("Failed to write issues log: {}", e);
                return;
            }
        }
        info!("Issues written to {}", log_path.display());
    }

    /// List the text items of a drawing without translating
    pub async fn extract(&self, input: &Path) -> Result<Vec<ExtractedTextItem>> {
        let input = std::path::absolute(input).unwrap_or_else(|_| input.to_path_buf());
        let file_type = FileManager::detect_file_type(&input)?;
        let document = match file_type {
            FileType::Dxf => self.codec.open(&input)?,
            FileType::Dwg => {
                let temp = tempfile::Builder::new()
                    .prefix("cadtranslator-extract-")
                    .tempdir()
                    .context("Failed to create work folder")?;
                let job = ConversionJob {
                    input_dir: input.parent().map(Path::to_path_buf).unwrap_or_default(),
                    output_dir: temp.path().to_path_buf(),
                    target_version: self.config.converter.output_version.clone(),
                    target_format: DrawingFormat::Dxf,
                    recurse: false,
                    audit: self.config.converter.audit,
                    file_filter: input
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_default(),
                };
                self.converter.convert(&job).await?;

                let stem = input.file_stem().unwrap_or_default().to_string_lossy().to_string();
                let dxf = temp.path().join(format!("{}.dxf", stem));
                if !dxf.is_file() {
                    return Err(anyhow!("Converter produced no DXF for {:?}", input));
                }
                self.codec.open(&dxf)?
            }
            FileType::Unknown => return Err(anyhow!("{:?} is neither DWG nor DXF", input)),
        };

        Ok(document.text_items())
    }
}
