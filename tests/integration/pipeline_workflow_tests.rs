/*!
 * End-to-end tests of the per-file pipeline with a fake converter
 */

use anyhow::Result;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use cadtranslator::app_config::Config;
use cadtranslator::converter::DrawingFormat;
use cadtranslator::drawing::DrawingCodec;
use cadtranslator::drawing::dxf::DxfCodec;
use cadtranslator::errors::PipelineError;
use cadtranslator::pipeline::{FilePipeline, PipelineSettings, PipelineState};
use cadtranslator::providers::Provider;
use cadtranslator::providers::mock::MockProvider;
use cadtranslator::translation::{DecisionEngine, DecisionKind, GlossaryIndex, SkipPhraseFilter, TranslationOptions};

use crate::common::{self, DxfBuilder, FakeConverter, FakeConverterMode, FlakyCodec};

fn pipeline(config: &Config, provider: Arc<dyn Provider>, converter: FakeConverter) -> Result<FilePipeline> {
    pipeline_with_codec(config, provider, converter, Arc::new(DxfCodec))
}

fn pipeline_with_codec(
    config: &Config,
    provider: Arc<dyn Provider>,
    converter: FakeConverter,
    codec: Arc<dyn DrawingCodec>,
) -> Result<FilePipeline> {
    let glossary = GlossaryIndex::from_pairs([("shaft", "Welle")])?;
    let engine = DecisionEngine::new(Arc::new(glossary), Arc::new(SkipPhraseFilter::builtin()));
    let output_dir = config.output_dir.clone().unwrap_or_default();

    Ok(FilePipeline::new(
        engine,
        provider,
        TranslationOptions::from_config(config)?,
        Arc::new(converter),
        codec,
        PipelineSettings::from_config(config, output_dir),
    ))
}

fn title_block_drawing(dir: &Path, filename: &str) -> Result<std::path::PathBuf> {
    DxfBuilder::new()
        .text("AMS SRL")
        .mtext("Shaft Diameter 25mm")
        .text("General Tolerances")
        .write(dir, filename)
}

#[tokio::test]
async fn test_process_file_withDwgInput_shouldTranslateAndConvertBack() -> Result<()> {
    common::init_test_logging();
    let temp_dir = common::create_temp_dir()?;
    let output_dir = temp_dir.path().join("output");
    let work_dir = temp_dir.path().join("work");
    let input = title_block_drawing(temp_dir.path(), "plan.dwg")?;

    let config = common::test_config(&output_dir, &work_dir);
    let converter = FakeConverter::new(FakeConverterMode::Copy);
    let provider = Arc::new(MockProvider::identity());
    let pipeline = pipeline(&config, provider.clone(), converter.clone())?;

    let report = pipeline.process_file(&input).await?;

    assert_eq!(report.output_path, output_dir.join("plan_DE.dwg"));
    let written = fs::read_to_string(&report.output_path)?;
    assert!(written.contains("Welle Diameter 25mm"));
    assert!(written.contains("AMS SRL"));
    assert!(written.contains("General Tolerances"));

    assert_eq!(report.count(DecisionKind::Skip), 2);
    assert_eq!(report.count(DecisionKind::GlossaryProtected), 1);
    assert_eq!(report.total_items(), 3);
    assert_eq!(report.elements_written, 1);
    assert_eq!(provider.call_count(), 1);

    let jobs = converter.jobs();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].target_format, DrawingFormat::Dxf);
    assert_eq!(jobs[0].file_filter, "plan.dwg");
    assert_eq!(jobs[1].target_format, DrawingFormat::Dwg);
    assert_eq!(jobs[1].file_filter, "plan_DE.dxf");

    assert_eq!(common::entry_count(&work_dir), 0);
    Ok(())
}

#[tokio::test]
async fn test_process_file_withServiceFailureOnOneItem_shouldStillFinish() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let output_dir = temp_dir.path().join("output");
    let work_dir = temp_dir.path().join("work");
    let input = DxfBuilder::new()
        .text("Surface finish")
        .text("Material")
        .write(temp_dir.path(), "part.dwg")?;

    let config = common::test_config(&output_dir, &work_dir);
    let provider = Arc::new(MockProvider::fail_on("Surface finish"));
    let pipeline = pipeline(&config, provider, FakeConverter::new(FakeConverterMode::Copy))?;

    let report = pipeline.process_file(&input).await?;

    let written = fs::read_to_string(&report.output_path)?;
    assert!(written.contains("  1\nSurface finish\n"));
    assert!(written.contains("[DE] Material"));
    assert_eq!(report.stats.failures, 1);
    assert!(report.warnings.iter().any(|w| w.contains("Surface finish")));
    Ok(())
}

#[tokio::test]
async fn test_process_file_withConverterProducingNothing_shouldFailAndCleanUp() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let output_dir = temp_dir.path().join("output");
    let work_dir = temp_dir.path().join("work");
    let input = title_block_drawing(temp_dir.path(), "plan.dwg")?;

    let config = common::test_config(&output_dir, &work_dir);
    let pipeline = pipeline(
        &config,
        Arc::new(MockProvider::identity()),
        FakeConverter::new(FakeConverterMode::NoOutput),
    )?;

    let failure = pipeline.process_file(&input).await.unwrap_err();

    assert_eq!(failure.state, PipelineState::ConvertingIn);
    assert!(matches!(failure.error, PipelineError::ConversionError(_)));
    assert!(!output_dir.join("plan_DE.dwg").exists());
    assert_eq!(common::entry_count(&work_dir), 0);
    Ok(())
}

#[tokio::test]
async fn test_process_file_withCrashingConverter_shouldReportStateAndWriteAuditLog() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let output_dir = temp_dir.path().join("output");
    let work_dir = temp_dir.path().join("work");
    let input = title_block_drawing(temp_dir.path(), "plan.dwg")?;

    let config = common::test_config(&output_dir, &work_dir);
    let pipeline = pipeline(
        &config,
        Arc::new(MockProvider::identity()),
        FakeConverter::new(FakeConverterMode::Fail),
    )?;

    let failure = pipeline.process_file(&input).await.unwrap_err();
    assert_eq!(failure.state, PipelineState::ConvertingIn);
    assert_eq!(common::entry_count(&work_dir), 0);

    let audit = fs::read_to_string(output_dir.join("plan_DE.translation.log"))?;
    assert!(audit.starts_with("Translation Log - "));
    assert!(audit.contains("state: failed"));
    assert!(audit.contains("[ERROR]"));
    Ok(())
}

#[tokio::test]
async fn test_process_file_withMissingInput_shouldFailBeforeConverting() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let output_dir = temp_dir.path().join("output");
    let work_dir = temp_dir.path().join("work");

    let config = common::test_config(&output_dir, &work_dir);
    let converter = FakeConverter::new(FakeConverterMode::Copy);
    let pipeline = pipeline(&config, Arc::new(MockProvider::identity()), converter.clone())?;

    let failure = pipeline.process_file(&temp_dir.path().join("missing.dwg")).await.unwrap_err();

    assert_eq!(failure.state, PipelineState::Created);
    assert!(matches!(failure.error, PipelineError::InputNotFound(_)));
    assert!(converter.jobs().is_empty());
    assert_eq!(common::entry_count(&work_dir), 0);
    Ok(())
}

#[tokio::test]
async fn test_process_file_withNestedConverterOutput_shouldRelocateIntoOutputFolder() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let output_dir = temp_dir.path().join("output");
    let work_dir = temp_dir.path().join("work");
    let input = title_block_drawing(temp_dir.path(), "plan.dwg")?;

    let config = common::test_config(&output_dir, &work_dir);
    let pipeline = pipeline(
        &config,
        Arc::new(MockProvider::identity()),
        FakeConverter::new(FakeConverterMode::Nested),
    )?;

    let report = pipeline.process_file(&input).await?;

    assert_eq!(report.output_path, output_dir.join("plan_DE.dwg"));
    assert!(report.output_path.is_file());
    assert!(!output_dir.join("converted").exists());
    Ok(())
}

#[tokio::test]
async fn test_process_file_withDxfInputAndOutput_shouldSkipConverterAndArchive() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let output_dir = temp_dir.path().join("output");
    let work_dir = temp_dir.path().join("work");
    let archive_dir = temp_dir.path().join("archive");
    let input = title_block_drawing(temp_dir.path(), "plan.dxf")?;

    let mut config = common::test_config(&output_dir, &work_dir);
    config.converter.output_format = DrawingFormat::Dxf;
    config.archive_dir = Some(archive_dir.clone());
    let converter = FakeConverter::new(FakeConverterMode::Fail);
    let pipeline = pipeline(&config, Arc::new(MockProvider::identity()), converter.clone())?;

    let report = pipeline.process_file(&input).await?;

    assert_eq!(report.output_path, output_dir.join("plan_DE.dxf"));
    assert!(converter.jobs().is_empty());
    let archived = fs::read_to_string(archive_dir.join("DE").join("plan_DE.dxf"))?;
    assert!(archived.contains("Welle Diameter 25mm"));

    let audit = fs::read_to_string(output_dir.join("plan_DE.translation.log"))?;
    assert!(audit.contains("state: done"));
    assert!(audit.contains("[AUDIT]"));
    Ok(())
}

#[tokio::test]
async fn test_process_file_withExistingOutput_shouldReplaceIt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let output_dir = temp_dir.path().join("output");
    let work_dir = temp_dir.path().join("work");
    let input = title_block_drawing(temp_dir.path(), "plan.dwg")?;
    common::create_test_file(&output_dir, "plan_DE.dwg", "stale")?;

    let config = common::test_config(&output_dir, &work_dir);
    let pipeline = pipeline(
        &config,
        Arc::new(MockProvider::identity()),
        FakeConverter::new(FakeConverterMode::Copy),
    )?;

    let report = pipeline.process_file(&input).await?;

    assert!(fs::read_to_string(&report.output_path)?.contains("Welle Diameter 25mm"));
    Ok(())
}

#[tokio::test]
async fn test_process_file_withFailedConvertOut_shouldLeaveOutputFolderUntouched() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let output_dir = temp_dir.path().join("output");
    let work_dir = temp_dir.path().join("work");
    let input = title_block_drawing(temp_dir.path(), "plan.dxf")?;
    let stale = common::create_test_file(&output_dir.join("old"), "plan_DE.dwg", "stale")?;
    let keep = common::create_test_file(&output_dir.join("old"), "keep.txt", "user notes")?;

    let config = common::test_config(&output_dir, &work_dir);
    let converter = FakeConverter::new(FakeConverterMode::NoOutput);
    let pipeline = pipeline(&config, Arc::new(MockProvider::identity()), converter.clone())?;

    let failure = pipeline.process_file(&input).await.unwrap_err();

    assert_eq!(failure.state, PipelineState::ConvertingOut);
    assert!(matches!(failure.error, PipelineError::ConversionError(_)));
    assert_eq!(converter.jobs().len(), 1);
    assert_eq!(fs::read_to_string(&keep)?, "user notes");
    assert_eq!(fs::read_to_string(&stale)?, "stale");
    assert!(!output_dir.join("plan_DE.dwg").exists());
    assert_eq!(common::entry_count(&work_dir), 0);
    Ok(())
}

#[tokio::test]
async fn test_process_file_withElementRefusingText_shouldWarnAndWriteTheRest() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let output_dir = temp_dir.path().join("output");
    let work_dir = temp_dir.path().join("work");
    let input = DxfBuilder::new()
        .text("Surface finish")
        .text("Material")
        .text("Cover plate")
        .write(temp_dir.path(), "part.dwg")?;

    let config = common::test_config(&output_dir, &work_dir);
    let pipeline = pipeline_with_codec(
        &config,
        Arc::new(MockProvider::working()),
        FakeConverter::new(FakeConverterMode::Copy),
        Arc::new(FlakyCodec::new("Material")),
    )?;

    let report = pipeline.process_file(&input).await?;

    assert_eq!(report.elements_written, 2);
    assert!(report
        .warnings
        .iter()
        .any(|w| w.contains("Could not write back") && w.contains("Material")));

    let written = fs::read_to_string(&report.output_path)?;
    assert!(written.contains("[DE] Surface finish"));
    assert!(written.contains("[DE] Cover plate"));
    assert!(written.contains("  1\nMaterial\n"));
    Ok(())
}
