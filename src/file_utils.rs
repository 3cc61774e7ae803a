use anyhow::{Context, Result, anyhow};
use chrono::Local;
use std::fs::{self, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// @module: File and directory utilities

/// Drawing file extensions picked up when scanning folders
pub const DRAWING_EXTENSIONS: &[&str] = &["dwg", "dxf"];

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    // @generates: Output path for a translated drawing, `<stem>_<TARGET>.<ext>`
    pub fn generate_output_path<P1: AsRef<Path>, P2: AsRef<Path>>(
        input_file: P1,
        output_dir: P2,
        target_suffix: &str,
        extension: &str,
    ) -> PathBuf {
        let stem = input_file.as_ref().file_stem().unwrap_or_default();

        let mut output_filename = stem.to_string_lossy().to_string();
        output_filename.push('_');
        output_filename.push_str(target_suffix);
        output_filename.push('.');
        output_filename.push_str(extension);

        output_dir.as_ref().join(output_filename)
    }

    /// Find DWG and DXF drawings below a directory, sorted by path
    ///
    /// Files inside `skip_dir` (typically the output folder) are ignored so a
    /// second run does not pick up its own results.
    pub fn find_drawings<P: AsRef<Path>>(dir: P, skip_dir: Option<&Path>) -> Result<Vec<PathBuf>> {
        let mut result = Vec::new();

        for entry in WalkDir::new(dir.as_ref()).follow_links(true) {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if !path.is_file() {
                continue;
            }
            if skip_dir.is_some_and(|skip| path.starts_with(skip)) {
                continue;
            }
            let is_drawing = path
                .extension()
                .map(|ext| ext.to_string_lossy().to_lowercase())
                .is_some_and(|ext| DRAWING_EXTENSIONS.contains(&ext.as_str()));
            if is_drawing {
                result.push(path.to_path_buf());
            }
        }

        result.sort();
        Ok(result)
    }

    /// Copy a file from one location to another, ensuring the target directory exists
    pub fn copy_file<P1: AsRef<Path>, P2: AsRef<Path>>(from: P1, to: P2) -> Result<()> {
        let from = from.as_ref();
        let to = to.as_ref();

        if !from.exists() {
            return Err(anyhow!("Source file does not exist: {:?}", from));
        }

        if let Some(parent) = to.parent() {
            Self::ensure_dir(parent)?;
        }

        fs::copy(from, to).with_context(|| format!("Failed to copy {:?} to {:?}", from, to))?;

        Ok(())
    }

    /// Write content to a file, creating parent directories
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Move a file, replacing the destination; falls back to copy and delete
    /// when a rename is not possible (e.g. across devices)
    pub fn move_file<P1: AsRef<Path>, P2: AsRef<Path>>(from: P1, to: P2) -> Result<()> {
        let from = from.as_ref();
        let to = to.as_ref();

        if let Some(parent) = to.parent() {
            Self::ensure_dir(parent)?;
        }
        if to.exists() {
            fs::remove_file(to).with_context(|| format!("Failed to replace {:?}", to))?;
        }

        if fs::rename(from, to).is_err() {
            Self::copy_file(from, to)?;
            fs::remove_file(from).with_context(|| format!("Failed to remove {:?}", from))?;
        }

        Ok(())
    }

    /// Append content to a log file with timestamp
    pub fn append_to_log_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file: {:?}", path.as_ref()))?;

        writeln!(file, "[{}] {}", timestamp, content)
            .with_context(|| format!("Failed to write to log file: {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Detect whether a file is a DWG or a DXF drawing
    ///
    /// The extension decides first; files with other extensions are sniffed:
    /// DWG starts with an `AC10xx` version tag, ASCII DXF with a `0 / SECTION`
    /// pair, binary DXF with its sentinel.
    pub fn detect_file_type<P: AsRef<Path>>(path: P) -> Result<FileType> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(anyhow!("File does not exist: {:?}", path));
        }

        if let Some(ext) = path.extension() {
            match ext.to_string_lossy().to_lowercase().as_str() {
                "dwg" => return Ok(FileType::Dwg),
                "dxf" => return Ok(FileType::Dxf),
                _ => {}
            }
        }

        let mut head = [0u8; 64];
        let read = fs::File::open(path)
            .and_then(|mut f| f.read(&mut head))
            .with_context(|| format!("Failed to read file: {:?}", path))?;
        let head = &head[..read];

        if head.starts_with(b"AC10") {
            return Ok(FileType::Dwg);
        }
        if head.starts_with(b"AutoCAD Binary DXF") {
            return Ok(FileType::Dxf);
        }
        let text = String::from_utf8_lossy(head);
        let mut lines = text.lines().map(str::trim);
        if lines.next() == Some("0") && lines.next() == Some("SECTION") {
            return Ok(FileType::Dxf);
        }

        Ok(FileType::Unknown)
    }
}

/// Enum representing different file types
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum FileType {
    /// AutoCAD binary drawing
    Dwg,
    /// Drawing exchange format
    Dxf,
    /// Unknown file type
    Unknown,
}
