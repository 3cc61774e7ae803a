/*!
 * Glossary index built from a delimited terminology file.
 *
 * The file has a header row naming one column per language code. Only the
 * source and target columns are read. Keys are normalized like skip phrases
 * so that lookups ignore case and spacing; each term also carries a
 * precompiled case-insensitive pattern used for in-text protection.
 */

use log::debug;
use regex::Regex;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::errors::PipelineError;
use crate::language_utils;
use crate::translation::skip_phrases::normalize_phrase;

/// One approved term pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlossaryEntry {
    /// Normalized source term (lower-case, single spaces, trimmed)
    pub source_term: String,
    /// Approved translation, as written in the file
    pub target_term: String,
}

/// A glossary entry with its match pattern
#[derive(Debug, Clone)]
pub struct GlossaryTerm {
    pub entry: GlossaryEntry,
    pattern: Regex,
}

impl GlossaryTerm {
    fn new(entry: GlossaryEntry) -> Result<Self, PipelineError> {
        let pattern = build_term_pattern(&entry.source_term)?;
        Ok(Self { entry, pattern })
    }

    /// Case-insensitive pattern matching the term on word boundaries
    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }
}

/// Word boundaries are only required on sides where the term starts or ends
/// with a word character; `\b` next to punctuation would never match.
fn build_term_pattern(term: &str) -> Result<Regex, PipelineError> {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let body = term
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+");

    let mut pattern = String::from("(?i)");
    if term.chars().next().is_some_and(is_word) {
        pattern.push_str(r"\b");
    }
    pattern.push_str(&body);
    if term.chars().last().is_some_and(is_word) {
        pattern.push_str(r"\b");
    }

    Regex::new(&pattern).map_err(|e| {
        PipelineError::GlossaryFormatError(format!("Invalid glossary term '{}': {}", term, e))
    })
}

/// Immutable term lookup, shared read-only by every file worker
#[derive(Debug, Clone, Default)]
pub struct GlossaryIndex {
    lookup: HashMap<String, String>,
    // longest first, ties alphabetical
    terms: Vec<GlossaryTerm>,
}

impl GlossaryIndex {
    /// An index with no terms
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build an index from raw source/target pairs
    ///
    /// Pairs with an empty side are dropped; a repeated source term replaces
    /// the earlier one.
    pub fn from_pairs<I, S, T>(pairs: I) -> Result<Self, PipelineError>
    where
        I: IntoIterator<Item = (S, T)>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let mut lookup: HashMap<String, String> = HashMap::new();
        for (source, target) in pairs {
            let key = normalize_phrase(source.as_ref());
            let value = target.as_ref().trim();
            if key.is_empty() || value.is_empty() {
                continue;
            }
            lookup.insert(key, value.to_string());
        }

        let mut terms = lookup
            .iter()
            .map(|(key, value)| {
                GlossaryTerm::new(GlossaryEntry {
                    source_term: key.clone(),
                    target_term: value.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        terms.sort_by(|a, b| {
            let (a, b) = (&a.entry.source_term, &b.entry.source_term);
            b.chars().count().cmp(&a.chars().count()).then_with(|| a.cmp(b))
        });

        Ok(Self { lookup, terms })
    }

    /// Load a glossary file for a language pair
    pub fn from_csv_path<P: AsRef<Path>>(
        path: P,
        source_language: &str,
        target_language: &str,
    ) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            PipelineError::GlossaryFormatError(format!("Cannot open glossary {:?}: {}", path, e))
        })?;
        let index = Self::from_csv_reader(file, source_language, target_language)?;
        debug!("Loaded {} glossary terms from {:?}", index.len(), path);
        Ok(index)
    }

    /// Parse delimited glossary content with a header row
    ///
    /// The delimiter (`;`, `,` or tab) is taken from the header line. Columns
    /// are matched to the requested languages by name, ignoring case, then by
    /// language equivalence so that a `de-DE` column serves a `deu` request.
    pub fn from_csv_reader<R: Read>(
        mut reader: R,
        source_language: &str,
        target_language: &str,
    ) -> Result<Self, PipelineError> {
        let mut content = String::new();
        reader.read_to_string(&mut content).map_err(|e| {
            PipelineError::GlossaryFormatError(format!("Glossary is not readable text: {}", e))
        })?;
        let content = content.trim_start_matches('\u{feff}');

        let header_line = content.lines().find(|l| !l.trim().is_empty()).ok_or_else(|| {
            PipelineError::GlossaryFormatError("Glossary has no header row".to_string())
        })?;
        let delimiter = sniff_delimiter(header_line);

        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .quote(b'"')
            .flexible(true)
            .has_headers(true)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = csv_reader
            .headers()
            .map_err(|e| PipelineError::GlossaryFormatError(format!("Bad glossary header: {}", e)))?
            .iter()
            .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
            .collect();

        let source_idx = find_language_column(&headers, source_language);
        let target_idx = find_language_column(&headers, target_language);
        let (Some(source_idx), Some(target_idx)) = (source_idx, target_idx) else {
            return Err(PipelineError::GlossaryFormatError(format!(
                "Glossary does not contain '{}' and '{}' columns",
                source_language, target_language
            )));
        };

        let mut pairs = Vec::new();
        for (row, record) in csv_reader.records().enumerate() {
            let record = record.map_err(|e| {
                PipelineError::GlossaryFormatError(format!("Bad glossary row {}: {}", row + 2, e))
            })?;
            let source = record.get(source_idx).unwrap_or_default();
            let target = record.get(target_idx).unwrap_or_default();
            pairs.push((source.to_string(), target.to_string()));
        }

        Self::from_pairs(pairs)
    }

    /// Approved translation for a string that is, once normalized, exactly a glossary term
    pub fn lookup(&self, text: &str) -> Option<&str> {
        self.lookup.get(&normalize_phrase(text)).map(String::as_str)
    }

    /// Terms longest first
    pub fn terms(&self) -> &[GlossaryTerm] {
        &self.terms
    }

    /// Term entries longest first
    pub fn entries(&self) -> impl Iterator<Item = &GlossaryEntry> {
        self.terms.iter().map(|t| &t.entry)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

fn sniff_delimiter(header_line: &str) -> u8 {
    [b';', b',', b'\t']
        .into_iter()
        .map(|d| (d, header_line.bytes().filter(|b| *b == d).count()))
        .filter(|(_, count)| *count > 0)
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
        .map(|(d, _)| d)
        .unwrap_or(b';')
}

fn find_language_column(headers: &[String], language: &str) -> Option<usize> {
    let wanted = language.trim();
    headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(wanted))
        .or_else(|| {
            headers
                .iter()
                .position(|h| language_utils::language_codes_match(h, wanted))
        })
}
