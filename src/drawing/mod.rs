/*!
 * Drawing text access.
 *
 * A `DrawingCodec` opens a drawing file as a `DrawingDocument`, which lists
 * its text-bearing elements and accepts replacement text for them through
 * opaque handles. `dxf::DxfCodec` is the production codec.
 */

use serde::Serialize;
use std::fmt;
use std::fmt::Debug;
use std::path::Path;

use crate::errors::PipelineError;

pub mod dxf;
pub mod text_codes;

/// Where in the drawing a text item lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Modelspace,
    Table,
    Multileader,
    Block,
    AttributeDefinition,
}

impl SourceKind {
    /// Extraction order: modelspace, tables, multileaders, blocks, attribute definitions
    pub fn rank(&self) -> u8 {
        match self {
            Self::Modelspace => 0,
            Self::Table => 1,
            Self::Multileader => 2,
            Self::Block => 3,
            Self::AttributeDefinition => 4,
        }
    }
}

/// Entity type of a text element; decides how new text is encoded
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Text,
    MText,
    Attrib,
    AttDef,
    Dimension,
    TableCell,
    Multileader,
    /// Anything the writer does not know how to encode
    Other(String),
}

impl EntityKind {
    /// Kinds whose text uses paragraph formatting codes (`\P`, braces, escapes)
    pub fn is_paragraph(&self) -> bool {
        matches!(self, Self::MText | Self::TableCell | Self::Multileader)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("TEXT"),
            Self::MText => f.write_str("MTEXT"),
            Self::Attrib => f.write_str("ATTRIB"),
            Self::AttDef => f.write_str("ATTDEF"),
            Self::Dimension => f.write_str("DIMENSION"),
            Self::TableCell => f.write_str("ACAD_TABLE cell"),
            Self::Multileader => f.write_str("MULTILEADER"),
            Self::Other(name) => f.write_str(name),
        }
    }
}

/// Opaque reference to one text element of a document
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ElementHandle {
    pub(crate) index: usize,
    pub kind: EntityKind,
}

impl ElementHandle {
    pub fn new(index: usize, kind: EntityKind) -> Self {
        Self { index, kind }
    }
}

/// One piece of text found in a drawing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedTextItem {
    /// Plain text, formatting codes removed
    pub text: String,
    pub source_kind: SourceKind,
    /// Block, table or insert the element belongs to
    pub container_name: Option<String>,
    pub handle: ElementHandle,
}

impl ExtractedTextItem {
    /// Short origin tag for logs, e.g. `block:TITLE` or `modelspace`
    pub fn origin(&self) -> String {
        let container = self.container_name.as_deref().unwrap_or("?");
        match self.source_kind {
            SourceKind::Modelspace => "modelspace".to_string(),
            SourceKind::Table => "table".to_string(),
            SourceKind::Multileader => "multileader".to_string(),
            SourceKind::Block => format!("block:{}", container),
            SourceKind::AttributeDefinition => format!("attdef:{}", container),
        }
    }
}

/// An open drawing whose text can be read and replaced
pub trait DrawingDocument: Send {
    /// Text items in extraction order
    fn text_items(&self) -> Vec<ExtractedTextItem>;

    /// Replace the text of one element
    fn set_text(&mut self, handle: &ElementHandle, text: &str) -> Result<(), PipelineError>;

    /// Write the document, including replaced text, to a file
    fn save(&self, path: &Path) -> Result<(), PipelineError>;
}

/// Opens drawing files
pub trait DrawingCodec: Send + Sync + Debug {
    fn open(&self, path: &Path) -> Result<Box<dyn DrawingDocument>, PipelineError>;
}
