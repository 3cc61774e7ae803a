/*!
 * Common test utilities for the cadtranslator test suite
 */

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use cadtranslator::app_config::Config;
use cadtranslator::converter::{ConversionJob, DrawingConverter};
use cadtranslator::drawing::dxf::DxfDocument;
use cadtranslator::drawing::{DrawingCodec, DrawingDocument, ElementHandle, ExtractedTextItem};
use cadtranslator::errors::PipelineError;

/// Route library logs to the test output
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Builder for small ASCII DXF files
#[derive(Debug, Default)]
pub struct DxfBuilder {
    entities: Vec<String>,
    blocks: Vec<String>,
}

impl DxfBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, text: &str) -> Self {
        self.entities
            .push(format!("  0\nTEXT\n  8\n0\n 10\n0.0\n 20\n0.0\n 40\n2.5\n  1\n{}\n", text));
        self
    }

    pub fn mtext(mut self, raw: &str) -> Self {
        self.entities
            .push(format!("  0\nMTEXT\n  8\n0\n 10\n0.0\n 20\n0.0\n 40\n2.5\n  1\n{}\n", raw));
        self
    }

    pub fn dimension(mut self, raw: &str) -> Self {
        self.entities.push(format!("  0\nDIMENSION\n  8\n0\n  1\n{}\n", raw));
        self
    }

    pub fn table(mut self, name: &str, cells: &[&str]) -> Self {
        let mut entity = format!("  0\nACAD_TABLE\n  8\n0\n  2\n{}\n", name);
        for cell in cells {
            entity.push_str(&format!("  1\n{}\n", cell));
        }
        self.entities.push(entity);
        self
    }

    pub fn multileader(mut self, raw: &str) -> Self {
        self.entities
            .push(format!("  0\nMULTILEADER\n  8\n0\n300\nCONTEXT_DATA{{\n304\n{}\n301\n}}\n", raw));
        self
    }

    /// A block holding one TEXT and one ATTDEF
    pub fn block(mut self, name: &str, text: &str, attdef_default: &str) -> Self {
        self.blocks.push(format!(
            "  0\nBLOCK\n  8\n0\n  2\n{name}\n 70\n0\n  0\nTEXT\n  8\n0\n  1\n{text}\n  0\nATTDEF\n  8\n0\n  1\n{attdef_default}\n  2\nTAG\n  0\nENDBLK\n  8\n0\n"
        ));
        self
    }

    pub fn build(&self) -> String {
        let mut out = String::from("  0\nSECTION\n  2\nHEADER\n  9\n$ACADVER\n  1\nAC1032\n  0\nENDSEC\n");
        out.push_str("  0\nSECTION\n  2\nBLOCKS\n");
        out.push_str("  0\nBLOCK\n  8\n0\n  2\n*Model_Space\n 70\n0\n  0\nENDBLK\n  8\n0\n");
        for block in &self.blocks {
            out.push_str(block);
        }
        out.push_str("  0\nENDSEC\n  0\nSECTION\n  2\nENTITIES\n");
        for entity in &self.entities {
            out.push_str(entity);
        }
        out.push_str("  0\nENDSEC\n  0\nEOF\n");
        out
    }

    pub fn write(&self, dir: &Path, filename: &str) -> Result<PathBuf> {
        create_test_file(dir, filename, &self.build())
    }
}

/// How the fake converter behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeConverterMode {
    /// Copies the matching file, changing its extension
    Copy,
    /// Like `Copy`, but writes into a subfolder of the output folder
    Nested,
    /// Runs but writes nothing
    NoOutput,
    /// Returns an error
    Fail,
}

/// Converter stand-in: the test "DWG" files already hold DXF content, so a
/// conversion is a copy
#[derive(Debug, Clone)]
pub struct FakeConverter {
    mode: FakeConverterMode,
    jobs: Arc<Mutex<Vec<ConversionJob>>>,
}

impl FakeConverter {
    pub fn new(mode: FakeConverterMode) -> Self {
        Self {
            mode,
            jobs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn jobs(&self) -> Vec<ConversionJob> {
        self.jobs.lock().clone()
    }
}

#[async_trait]
impl DrawingConverter for FakeConverter {
    async fn convert(&self, job: &ConversionJob) -> Result<(), PipelineError> {
        self.jobs.lock().push(job.clone());

        let source = job.input_dir.join(&job.file_filter);
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let target_name = format!("{}.{}", stem, job.target_format.extension());

        match self.mode {
            FakeConverterMode::Fail => Err(PipelineError::ConversionError("converter crashed".to_string())),
            FakeConverterMode::NoOutput => Ok(()),
            FakeConverterMode::Copy => {
                fs::create_dir_all(&job.output_dir)?;
                fs::copy(&source, job.output_dir.join(target_name))?;
                Ok(())
            }
            FakeConverterMode::Nested => {
                let nested = job.output_dir.join("converted");
                fs::create_dir_all(&nested)?;
                fs::copy(&source, nested.join(target_name))?;
                Ok(())
            }
        }
    }
}

/// DXF codec whose documents refuse new text for one element
#[derive(Debug, Clone)]
pub struct FlakyCodec {
    fail_text: String,
}

impl FlakyCodec {
    /// Writing back fails for the element whose text equals `fail_text`
    pub fn new(fail_text: impl Into<String>) -> Self {
        Self {
            fail_text: fail_text.into(),
        }
    }
}

impl DrawingCodec for FlakyCodec {
    fn open(&self, path: &Path) -> Result<Box<dyn DrawingDocument>, PipelineError> {
        let inner = DxfDocument::load(path)?;
        let failing = inner
            .text_items()
            .into_iter()
            .find(|item| item.text == self.fail_text)
            .map(|item| item.handle);
        Ok(Box::new(FlakyDocument { inner, failing }))
    }
}

struct FlakyDocument {
    inner: DxfDocument,
    failing: Option<ElementHandle>,
}

impl DrawingDocument for FlakyDocument {
    fn text_items(&self) -> Vec<ExtractedTextItem> {
        self.inner.text_items()
    }

    fn set_text(&mut self, handle: &ElementHandle, text: &str) -> Result<(), PipelineError> {
        if self.failing.as_ref() == Some(handle) {
            return Err(PipelineError::ReinsertionError("element is locked".to_string()));
        }
        self.inner.set_text(handle, text)
    }

    fn save(&self, path: &Path) -> Result<(), PipelineError> {
        self.inner.save(path)
    }
}

/// Config writing into `output_dir`, work folders under `work_dir`
pub fn test_config(output_dir: &Path, work_dir: &Path) -> Config {
    let mut config = Config::default();
    config.source_language = "en".to_string();
    config.target_language = "de".to_string();
    config.output_dir = Some(output_dir.to_path_buf());
    config.work_dir = Some(work_dir.to_path_buf());
    config.translation.api_key = "test-key".to_string();
    config
}

/// Number of entries left in a folder
pub fn entry_count(dir: &Path) -> usize {
    fs::read_dir(dir).map(|rd| rd.count()).unwrap_or(0)
}

/// Minimal HTTP server answering each request with the next scripted response
///
/// The last response repeats once the script runs out. Returns the base URL
/// and a shared list of received request bodies.
pub async fn spawn_http_stub(responses: Vec<(u16, String)>) -> Result<(String, Arc<Mutex<Vec<String>>>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let address = listener.local_addr()?;
    let bodies = Arc::new(Mutex::new(Vec::new()));
    let received = Arc::clone(&bodies);

    tokio::spawn(async move {
        let mut served = 0usize;
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut buffer = Vec::new();
            let mut chunk = [0u8; 4096];
            let body = loop {
                let Ok(read) = socket.read(&mut chunk).await else { break String::new() };
                if read == 0 {
                    break String::new();
                }
                buffer.extend_from_slice(&chunk[..read]);
                let text = String::from_utf8_lossy(&buffer).to_string();
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if buffer.len() >= header_end + 4 + content_length {
                        break text[header_end + 4..].to_string();
                    }
                }
            };
            received.lock().push(body);

            let (status, payload) = responses
                .get(served)
                .or_else(|| responses.last())
                .cloned()
                .unwrap_or((500, String::new()));
            served += 1;

            let response = format!(
                "HTTP/1.1 {} STUB\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                payload.len(),
                payload
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    Ok((format!("http://{}", address), bodies))
}
