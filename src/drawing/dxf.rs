/*!
 * ASCII DXF reader and writer for text elements.
 *
 * A DXF file is a flat list of group-code/value line pairs. The document
 * keeps every pair exactly as read and only regenerates the pairs holding
 * text that was replaced, so untouched content (including code padding and
 * line endings) is written back byte for byte.
 */

use log::debug;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use super::text_codes::{self, decode_literal, decode_paragraph, encode_literal, encode_paragraph};
use super::{DrawingCodec, DrawingDocument, ElementHandle, EntityKind, ExtractedTextItem, SourceKind};
use crate::errors::PipelineError;

const BINARY_SENTINEL: &[u8] = b"AutoCAD Binary DXF";

/// How the file bytes were decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DxfEncoding {
    /// R2007 and later
    Utf8,
    /// Older ANSI files, read byte for byte
    Latin1,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Pair {
    /// Code line as written, padding included
    code_line: String,
    code: i32,
    value: String,
}

impl Pair {
    /// New pair whose code line is padded like `like`
    fn formatted_like(like: &Pair, code: i32, value: String) -> Self {
        let width = like.code_line.len();
        Self {
            code_line: format!("{:>width$}", code, width = width),
            code,
            value,
        }
    }
}

#[derive(Debug, Clone)]
struct TextElement {
    kind: EntityKind,
    source_kind: SourceKind,
    container: Option<String>,
    /// Pairs that hold the text, in order; for MTEXT the code 3 chunks then code 1
    slots: Vec<usize>,
    plain: String,
    replacement: Option<Vec<Pair>>,
}

/// Parsed DXF document
#[derive(Debug, Clone)]
pub struct DxfDocument {
    pairs: Vec<Pair>,
    elements: Vec<TextElement>,
    encoding: DxfEncoding,
    line_ending: &'static str,
    trailing_newline: bool,
}

impl DxfDocument {
    /// Read and parse a DXF file
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        if !path.exists() {
            return Err(PipelineError::InputNotFound(path.to_path_buf()));
        }
        let bytes = fs::read(path)?;
        Self::parse(&bytes)
            .map_err(|e| PipelineError::DrawingFormatError(format!("{:?}: {}", path, e)))
    }

    /// Parse DXF content
    pub fn parse(bytes: &[u8]) -> Result<Self, PipelineError> {
        if bytes.starts_with(BINARY_SENTINEL) {
            return Err(PipelineError::DrawingFormatError(
                "binary DXF is not supported".to_string(),
            ));
        }

        let (content, encoding) = match std::str::from_utf8(bytes) {
            Ok(text) => (text.to_string(), DxfEncoding::Utf8),
            Err(_) => (bytes.iter().map(|&b| b as char).collect(), DxfEncoding::Latin1),
        };
        let content = content.strip_prefix('\u{feff}').unwrap_or(&content);

        let line_ending = if content.contains("\r\n") { "\r\n" } else { "\n" };
        let trailing_newline = content.ends_with('\n');

        let mut lines: Vec<&str> = content
            .split('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .collect();
        if trailing_newline {
            lines.pop();
        }
        if lines.len() % 2 != 0 {
            return Err(PipelineError::DrawingFormatError(format!(
                "odd number of lines ({}), group codes and values must pair up",
                lines.len()
            )));
        }

        let mut pairs = Vec::with_capacity(lines.len() / 2);
        for (n, chunk) in lines.chunks(2).enumerate() {
            let code = chunk[0].trim().parse::<i32>().map_err(|_| {
                PipelineError::DrawingFormatError(format!(
                    "invalid group code '{}' at line {}",
                    chunk[0].trim(),
                    n * 2 + 1
                ))
            })?;
            pairs.push(Pair {
                code_line: chunk[0].to_string(),
                code,
                value: chunk[1].to_string(),
            });
        }

        let elements = collect_text_elements(&pairs);
        debug!("Parsed DXF: {} pairs, {} text elements", pairs.len(), elements.len());

        Ok(Self {
            pairs,
            elements,
            encoding,
            line_ending,
            trailing_newline,
        })
    }

    pub fn encoding(&self) -> DxfEncoding {
        self.encoding
    }

    /// Serialize the document with all replacements applied
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut anchors: HashMap<usize, &Vec<Pair>> = HashMap::new();
        let mut dropped: HashSet<usize> = HashSet::new();
        for element in &self.elements {
            if let Some(replacement) = &element.replacement {
                if let Some(first) = element.slots.first() {
                    anchors.insert(*first, replacement);
                }
                dropped.extend(element.slots.iter().copied());
            }
        }

        let mut out = String::new();
        let mut first_line = true;
        let mut push_line = |out: &mut String, line: &str| {
            if !first_line {
                out.push_str(self.line_ending);
            }
            out.push_str(line);
            first_line = false;
        };

        for (index, pair) in self.pairs.iter().enumerate() {
            if let Some(replacement) = anchors.get(&index) {
                for new_pair in replacement.iter() {
                    push_line(&mut out, &new_pair.code_line);
                    push_line(&mut out, &new_pair.value);
                }
            } else if !dropped.contains(&index) {
                push_line(&mut out, &pair.code_line);
                push_line(&mut out, &pair.value);
            }
        }
        if self.trailing_newline {
            out.push_str(self.line_ending);
        }

        match self.encoding {
            DxfEncoding::Utf8 => out.into_bytes(),
            DxfEncoding::Latin1 => out
                .chars()
                .map(|c| u8::try_from(c as u32).unwrap_or(b'?'))
                .collect(),
        }
    }

    fn encode_replacement(&self, element: &TextElement, text: &str) -> Result<Vec<Pair>, PipelineError> {
        let latin1 = self.encoding == DxfEncoding::Latin1;
        let first = element
            .slots
            .first()
            .map(|i| &self.pairs[*i])
            .ok_or_else(|| PipelineError::ReinsertionError("element has no text group".to_string()))?;

        match &element.kind {
            EntityKind::MText => {
                let encoded = encode_paragraph(text, latin1);
                let chunks = text_codes::split_chunks(&encoded);
                let last = chunks.len() - 1;
                Ok(chunks
                    .into_iter()
                    .enumerate()
                    .map(|(i, chunk)| Pair::formatted_like(first, if i == last { 1 } else { 3 }, chunk))
                    .collect())
            }
            EntityKind::TableCell | EntityKind::Multileader => {
                Ok(vec![Pair::formatted_like(first, first.code, encode_paragraph(text, latin1))])
            }
            EntityKind::Text | EntityKind::Attrib | EntityKind::AttDef | EntityKind::Dimension => {
                Ok(vec![Pair::formatted_like(first, first.code, encode_literal(text, latin1))])
            }
            EntityKind::Other(name) => Err(PipelineError::ReinsertionError(format!(
                "unsupported entity type {}",
                name
            ))),
        }
    }
}

impl DrawingDocument for DxfDocument {
    fn text_items(&self) -> Vec<ExtractedTextItem> {
        let mut items: Vec<ExtractedTextItem> = self
            .elements
            .iter()
            .enumerate()
            .map(|(index, element)| ExtractedTextItem {
                text: element.plain.clone(),
                source_kind: element.source_kind,
                container_name: element.container.clone(),
                handle: ElementHandle::new(index, element.kind.clone()),
            })
            .collect();
        // stable: file order within each source kind
        items.sort_by_key(|item| item.source_kind.rank());
        items
    }

    fn set_text(&mut self, handle: &ElementHandle, text: &str) -> Result<(), PipelineError> {
        if let EntityKind::Other(name) = &handle.kind {
            return Err(PipelineError::ReinsertionError(format!(
                "unsupported entity type {}",
                name
            )));
        }
        let element = self.elements.get(handle.index).ok_or_else(|| {
            PipelineError::ReinsertionError(format!("unknown element handle {}", handle.index))
        })?;
        if element.kind != handle.kind {
            return Err(PipelineError::ReinsertionError(format!(
                "handle kind {} does not match element kind {}",
                handle.kind, element.kind
            )));
        }

        let replacement = self.encode_replacement(element, text)?;
        let element = &mut self.elements[handle.index];
        element.plain = text.to_string();
        element.replacement = Some(replacement);
        Ok(())
    }

    fn save(&self, path: &Path) -> Result<(), PipelineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_bytes())?;
        Ok(())
    }
}

/// Codec for ASCII DXF files
#[derive(Debug, Clone, Copy, Default)]
pub struct DxfCodec;

impl DrawingCodec for DxfCodec {
    fn open(&self, path: &Path) -> Result<Box<dyn DrawingDocument>, PipelineError> {
        Ok(Box::new(DxfDocument::load(path)?))
    }
}

/// Walk the pairs entity by entity and record every text-bearing element
fn collect_text_elements(pairs: &[Pair]) -> Vec<TextElement> {
    let mut elements = Vec::new();
    let mut section: Option<String> = None;
    let mut block: Option<String> = None;
    let mut last_insert: Option<String> = None;

    let starts: Vec<usize> = pairs
        .iter()
        .enumerate()
        .filter(|(_, p)| p.code == 0)
        .map(|(i, _)| i)
        .collect();

    for (n, &start) in starts.iter().enumerate() {
        let end = starts.get(n + 1).copied().unwrap_or(pairs.len());
        let entity = &pairs[start..end];
        let entity_type = entity[0].value.trim();

        match entity_type {
            "SECTION" => {
                section = first_value(entity, 2).map(|v| v.trim().to_uppercase());
                continue;
            }
            "ENDSEC" => {
                section = None;
                continue;
            }
            _ => {}
        }

        let in_blocks = match section.as_deref() {
            Some("ENTITIES") => false,
            Some("BLOCKS") => true,
            _ => continue,
        };

        match entity_type {
            "BLOCK" if in_blocks => {
                block = first_value(entity, 2).map(|v| v.trim().to_string());
                continue;
            }
            "ENDBLK" if in_blocks => {
                block = None;
                continue;
            }
            "INSERT" => {
                last_insert = first_value(entity, 2).map(|v| v.trim().to_string());
                continue;
            }
            _ => {}
        }

        // layout blocks duplicate what the ENTITIES section holds
        if in_blocks
            && block
                .as_deref()
                .is_some_and(|b| b.eq_ignore_ascii_case("*Model_Space"))
        {
            continue;
        }

        let paper_space = entity.iter().any(|p| p.code == 67 && p.value.trim() == "1");
        let (source_kind, container) = if in_blocks {
            let kind = if entity_type == "ATTDEF" {
                SourceKind::AttributeDefinition
            } else {
                SourceKind::Block
            };
            (kind, block.clone())
        } else {
            match entity_type {
                "ACAD_TABLE" => (SourceKind::Table, first_value(entity, 2).map(|v| v.trim().to_string())),
                "MULTILEADER" | "MLEADER" => (SourceKind::Multileader, None),
                "ATTRIB" => (SourceKind::Modelspace, last_insert.clone()),
                _ if paper_space => (SourceKind::Modelspace, Some("*Paper_Space".to_string())),
                _ => (SourceKind::Modelspace, None),
            }
        };

        let push = |elements: &mut Vec<TextElement>, kind: EntityKind, slots: Vec<usize>| {
            let raw: String = slots.iter().map(|i| pairs[*i].value.as_str()).collect();
            let plain = if kind.is_paragraph() {
                decode_paragraph(&raw)
            } else {
                decode_literal(&raw)
            };
            elements.push(TextElement {
                kind,
                source_kind,
                container: container.clone(),
                slots,
                plain,
                replacement: None,
            });
        };

        match entity_type {
            "TEXT" | "ATTRIB" | "ATTDEF" => {
                let kind = match entity_type {
                    "TEXT" => EntityKind::Text,
                    "ATTRIB" => EntityKind::Attrib,
                    _ => EntityKind::AttDef,
                };
                if in_blocks && kind == EntityKind::Attrib && block.is_none() {
                    continue;
                }
                if let Some(slot) = text_slots(entity, start, &[1]).into_iter().next() {
                    push(&mut elements, kind, vec![slot]);
                }
            }
            "MTEXT" => {
                let slots = mtext_slots(entity, start);
                if !slots.is_empty() {
                    push(&mut elements, EntityKind::MText, slots);
                }
            }
            "DIMENSION" if !in_blocks => {
                if let Some(slot) = text_slots(entity, start, &[1])
                    .into_iter()
                    .find(|i| !pairs[*i].value.trim().is_empty())
                {
                    push(&mut elements, EntityKind::Dimension, vec![slot]);
                }
            }
            "ACAD_TABLE" if !in_blocks => {
                for slot in text_slots(entity, start, &[1]) {
                    push(&mut elements, EntityKind::TableCell, vec![slot]);
                }
            }
            "MULTILEADER" | "MLEADER" if !in_blocks => {
                if let Some(slot) = text_slots(entity, start, &[304])
                    .into_iter()
                    .find(|i| !pairs[*i].value.trim().ends_with('{') && !pairs[*i].value.trim().is_empty())
                {
                    push(&mut elements, EntityKind::Multileader, vec![slot]);
                }
            }
            _ => {}
        }
    }

    elements
}

fn first_value(entity: &[Pair], code: i32) -> Option<&str> {
    entity.iter().find(|p| p.code == code).map(|p| p.value.as_str())
}

/// Absolute indices of pairs with one of `codes`, stopping at an embedded object (code 101)
fn text_slots(entity: &[Pair], offset: usize, codes: &[i32]) -> Vec<usize> {
    entity
        .iter()
        .enumerate()
        .skip(1)
        .take_while(|(_, p)| p.code != 101)
        .filter(|(_, p)| codes.contains(&p.code))
        .map(|(i, _)| offset + i)
        .collect()
}

/// MTEXT text: every code 3 chunk before the first code 1, then that code 1
fn mtext_slots(entity: &[Pair], offset: usize) -> Vec<usize> {
    let mut slots = Vec::new();
    for (i, pair) in entity.iter().enumerate().skip(1) {
        match pair.code {
            101 => break,
            3 => slots.push(offset + i),
            1 => {
                slots.push(offset + i);
                return slots;
            }
            _ => {}
        }
    }
    // chunks without a closing code 1 are not valid text
    Vec::new()
}
