/*!
 * Per-file translation pipeline.
 *
 * A drawing is converted to DXF inside a private work folder, its text is
 * decided and translated item by item, written back, saved, converted to the
 * output format and moved to its final place. The work folder is removed
 * whatever the outcome.
 */

use chrono::Local;
use log::{debug, warn};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::run::PipelineRun;
use super::state::PipelineState;
use crate::app_config::Config;
use crate::converter::{ConversionJob, DrawingConverter, DrawingFormat};
use crate::drawing::DrawingCodec;
use crate::errors::{FileFailure, PipelineError};
use crate::file_utils::{FileManager, FileType};
use crate::providers::Provider;
use crate::translation::cache::truncate_text;
use crate::translation::{
    DecisionEngine, DecisionKind, LogCapture, TranslationOptions, TranslationService, TranslationStats,
};

/// Output locations and converter options shared by every file of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    pub output_dir: PathBuf,
    /// Extra copy of each result under `<archive_dir>/<TARGET>/`
    pub archive_dir: Option<PathBuf>,
    /// Parent of the per-file work folders; system temp folder when unset
    pub work_dir: Option<PathBuf>,
    /// Uppercase target language, appended to output names
    pub target_suffix: String,
    pub target_version: String,
    pub output_format: DrawingFormat,
    pub audit: bool,
    pub write_audit_log: bool,
}

impl PipelineSettings {
    pub fn from_config(config: &Config, output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            archive_dir: config.archive_dir.clone(),
            work_dir: config.work_dir.clone(),
            target_suffix: config.target_suffix(),
            target_version: config.converter.output_version.clone(),
            output_format: config.converter.output_format,
            audit: config.converter.audit,
            write_audit_log: config.write_audit_log,
        }
    }
}

/// Result of a successful file run
#[derive(Debug, Clone)]
pub struct FileReport {
    pub input: PathBuf,
    /// Absolute path of the translated drawing
    pub output_path: PathBuf,
    /// Number of items per decision
    pub counts: HashMap<DecisionKind, usize>,
    /// Elements whose text was replaced
    pub elements_written: usize,
    /// Warning lines logged during the run
    pub warnings: Vec<String>,
    pub stats: TranslationStats,
    pub duration: Duration,
}

impl FileReport {
    pub fn count(&self, kind: DecisionKind) -> usize {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn total_items(&self) -> usize {
        self.counts.values().sum()
    }
}

struct Translated {
    output_path: PathBuf,
    counts: HashMap<DecisionKind, usize>,
    elements_written: usize,
}

/// Runs drawings through the pipeline
///
/// Holds only shared, immutable parts; each call to
/// [`FilePipeline::process_file`] gets its own run state and translation cache.
#[derive(Debug, Clone)]
pub struct FilePipeline {
    engine: DecisionEngine,
    provider: Arc<dyn Provider>,
    options: TranslationOptions,
    converter: Arc<dyn DrawingConverter>,
    codec: Arc<dyn DrawingCodec>,
    settings: PipelineSettings,
}

impl FilePipeline {
    pub fn new(
        engine: DecisionEngine,
        provider: Arc<dyn Provider>,
        options: TranslationOptions,
        converter: Arc<dyn DrawingConverter>,
        codec: Arc<dyn DrawingCodec>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            engine,
            provider,
            options,
            converter,
            codec,
            settings,
        }
    }

    /// Final location of the translated drawing for `input`
    pub fn output_path_for(&self, input: &Path) -> PathBuf {
        FileManager::generate_output_path(
            input,
            &self.settings.output_dir,
            &self.settings.target_suffix,
            self.settings.output_format.extension(),
        )
    }

    /// Translate one drawing
    pub async fn process_file(&self, input: &Path) -> Result<FileReport, FileFailure> {
        let input = std::path::absolute(input).unwrap_or_else(|_| input.to_path_buf());
        let mut run = PipelineRun::start(&input, self.settings.work_dir.as_deref())?;
        let service = TranslationService::new(self.provider.clone(), self.options.clone());

        run.log().info(format!(
            "Translating {:?} to {} with {}",
            input,
            self.settings.target_suffix,
            service.provider_name()
        ));

        let outcome = match self.execute(&mut run, &service).await {
            Ok(translated) => {
                run.log().info(format!(
                    "Done in {:.1}s: {} ({})",
                    run.elapsed().as_secs_f64(),
                    translated.output_path.display(),
                    service.stats().summary()
                ));
                Ok(FileReport {
                    input: input.clone(),
                    output_path: translated.output_path,
                    counts: translated.counts,
                    elements_written: translated.elements_written,
                    warnings: run
                        .log()
                        .entries()
                        .into_iter()
                        .filter(|e| e.level == "WARN")
                        .map(|e| e.message)
                        .collect(),
                    stats: service.stats(),
                    duration: run.elapsed(),
                })
            }
            Err(error) => Err(run.fail(error)),
        };

        self.write_audit_log(&run, &service);
        run.finish();
        outcome
    }

    async fn execute(&self, run: &mut PipelineRun, service: &TranslationService) -> Result<Translated, PipelineError> {
        let input = run.input().to_path_buf();
        if !input.is_file() {
            return Err(PipelineError::InputNotFound(input));
        }
        let stem = file_stem(&input);
        let temp = run.temp_path().to_path_buf();
        let log = run.log().clone();

        run.advance(PipelineState::ConvertingIn)?;
        let intermediate = self.convert_in(&input, &stem, &temp).await?;
        log.audit(format!("intermediate DXF: {:?}", intermediate));

        run.advance(PipelineState::Extracting)?;
        let mut document = self.codec.open(&intermediate)?;
        let items = document.text_items();
        log.info(format!("Extracted {} text item(s)", items.len()));

        run.advance(PipelineState::Deciding)?;
        let mut counts: HashMap<DecisionKind, usize> = HashMap::new();
        let mut finals = Vec::with_capacity(items.len());
        for item in &items {
            let decision = self.engine.decide(&item.text, &log);
            let resolution = self.engine.resolve(decision, service, &log).await;
            *counts.entry(resolution.kind).or_insert(0) += 1;
            finals.push(resolution.text);
        }
        log.info(format!(
            "Decisions: {} skip, {} glossary-exact, {} glossary-protected, {} plain-translate",
            counts.get(&DecisionKind::Skip).unwrap_or(&0),
            counts.get(&DecisionKind::GlossaryExact).unwrap_or(&0),
            counts.get(&DecisionKind::GlossaryProtected).unwrap_or(&0),
            counts.get(&DecisionKind::PlainTranslate).unwrap_or(&0)
        ));

        run.advance(PipelineState::Reinserting)?;
        let mut elements_written = 0;
        for (item, text) in items.iter().zip(&finals) {
            if *text == item.text {
                continue;
            }
            match document.set_text(&item.handle, text) {
                Ok(()) => elements_written += 1,
                Err(e) => log.warn(format!(
                    "Could not write back {} '{}' in {}: {}",
                    item.handle.kind,
                    truncate_text(&item.text, 40),
                    item.origin(),
                    e
                )),
            }
        }
        log.info(format!("Replaced text in {} element(s)", elements_written));

        run.advance(PipelineState::SavingIntermediate)?;
        let translated_dxf = temp
            .join("translated")
            .join(format!("{}_{}.dxf", stem, self.settings.target_suffix));
        document.save(&translated_dxf)?;

        run.advance(PipelineState::ConvertingOut)?;
        let staged = self.convert_out(&input, &translated_dxf, &temp).await?;

        run.advance(PipelineState::Relocating)?;
        let output_path = self.relocate(&input, &staged, &log)?;

        run.advance(PipelineState::Done)?;
        Ok(Translated {
            output_path,
            counts,
            elements_written,
        })
    }

    /// Get a DXF copy of the input into `<temp>/intermediate`
    async fn convert_in(&self, input: &Path, stem: &str, temp: &Path) -> Result<PathBuf, PipelineError> {
        let intermediate_dir = temp.join("intermediate");
        fs::create_dir_all(&intermediate_dir)?;
        let expected = format!("{}.dxf", stem);

        let file_type = FileManager::detect_file_type(input)
            .map_err(|e| PipelineError::DrawingFormatError(e.to_string()))?;
        match file_type {
            FileType::Dxf => {
                fs::copy(input, intermediate_dir.join(&expected))?;
            }
            FileType::Dwg => {
                let job = ConversionJob {
                    input_dir: input.parent().map(Path::to_path_buf).unwrap_or_default(),
                    output_dir: intermediate_dir.clone(),
                    target_version: self.settings.target_version.clone(),
                    target_format: DrawingFormat::Dxf,
                    recurse: false,
                    audit: self.settings.audit,
                    file_filter: file_name(input),
                };
                self.converter.convert(&job).await?;
            }
            FileType::Unknown => {
                return Err(PipelineError::DrawingFormatError(format!(
                    "{:?} is neither DWG nor DXF",
                    input
                )));
            }
        }

        find_output(&intermediate_dir, &expected).ok_or_else(|| {
            PipelineError::ConversionError(format!("converter produced no {} for {:?}", expected, input))
        })
    }

    /// Produce the output drawing in `<temp>/converted`; returns the staged file
    ///
    /// The output folder is not touched here, so a failed conversion leaves any
    /// earlier result in place.
    async fn convert_out(&self, input: &Path, translated_dxf: &Path, temp: &Path) -> Result<PathBuf, PipelineError> {
        let staging_dir = temp.join("converted");
        fs::create_dir_all(&staging_dir)?;
        let expected = file_name(&self.output_path_for(input));

        match self.settings.output_format {
            DrawingFormat::Dxf => {
                fs::copy(translated_dxf, staging_dir.join(&expected))?;
            }
            DrawingFormat::Dwg => {
                let job = ConversionJob {
                    input_dir: translated_dxf.parent().map(Path::to_path_buf).unwrap_or_default(),
                    output_dir: staging_dir.clone(),
                    target_version: self.settings.target_version.clone(),
                    target_format: DrawingFormat::Dwg,
                    recurse: false,
                    audit: self.settings.audit,
                    file_filter: file_name(translated_dxf),
                };
                self.converter.convert(&job).await?;
            }
        }

        find_output(&staging_dir, &expected)
            .ok_or_else(|| PipelineError::ConversionError(format!("converter produced no {}", expected)))
    }

    /// Move the staged output into the output folder and file the archive copy
    ///
    /// An existing file at the target is replaced; nothing else in the output
    /// folder is touched.
    fn relocate(&self, input: &Path, staged: &Path, log: &LogCapture) -> Result<PathBuf, PipelineError> {
        let target = self.output_path_for(input);
        if target.exists() {
            log.info(format!("Replacing existing {}", target.display()));
        }
        debug!("Moving {:?} to {:?}", staged, target);
        FileManager::move_file(staged, &target).map_err(to_pipeline_error)?;

        if let Some(archive_dir) = &self.settings.archive_dir {
            let archived = archive_dir.join(&self.settings.target_suffix).join(file_name(&target));
            match FileManager::copy_file(&target, &archived) {
                Ok(()) => log.info(format!("Archived copy at {}", archived.display())),
                Err(e) => log.warn(format!("Could not archive {:?}: {:#}", target, e)),
            }
        }

        Ok(std::path::absolute(&target).unwrap_or(target))
    }

    fn write_audit_log(&self, run: &PipelineRun, service: &TranslationService) {
        if !self.settings.write_audit_log {
            return;
        }
        let log_path = self.settings.output_dir.join(format!(
            "{}_{}.translation.log",
            file_stem(run.input()),
            self.settings.target_suffix
        ));

        let mut content = String::new();
        content.push_str(&format!("Translation Log - {}\n", Local::now().format("%Y-%m-%d %H:%M:%S")));
        content.push_str(&format!(
            "Context: {} -> {} ({}, state: {})\n\n",
            run.input().display(),
            self.settings.target_suffix,
            service.provider_name(),
            run.state()
        ));
        for entry in run.log().entries() {
            content.push_str(&format!("[{}] {}\n", entry.level, entry.message));
        }

        if let Err(e) = FileManager::write_to_file(&log_path, &content) {
            warn!("Failed to write audit log {:?}: {}", log_path, e);
        }
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn to_pipeline_error(error: anyhow::Error) -> PipelineError {
    PipelineError::Io(std::io::Error::other(format!("{:#}", error)))
}

/// Look for `name` in a work folder or one folder below it, ignoring case
fn find_output(dir: &Path, name: &str) -> Option<PathBuf> {
    let direct = dir.join(name);
    if direct.is_file() {
        return Some(direct);
    }

    let matches = |path: &Path| {
        path.is_file()
            && path
                .file_name()
                .is_some_and(|n| n.to_string_lossy().eq_ignore_ascii_case(name))
    };

    let entries: Vec<PathBuf> = fs::read_dir(dir).ok()?.flatten().map(|e| e.path()).collect();
    if let Some(found) = entries.iter().find(|p| matches(p)) {
        return Some(found.clone());
    }
    entries
        .iter()
        .filter(|p| p.is_dir())
        .filter_map(|sub| fs::read_dir(sub).ok())
        .flat_map(|rd| rd.flatten().map(|e| e.path()))
        .find(|p| matches(p))
}
