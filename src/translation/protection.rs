/*!
 * Glossary term protection for machine translation.
 *
 * Glossary terms found inside a longer string are swapped for opaque
 * placeholder tokens before the string goes to the translation service, and
 * the approved translations are put back in place of the tokens afterwards.
 * Longer terms claim their span first, so "general tolerance" wins over
 * "tolerance" when both match.
 */

use std::ops::Range;

use crate::translation::glossary::{GlossaryEntry, GlossaryIndex};
use crate::translation::skip_phrases::normalize_phrase;

/// Token that stands in for the n-th protected span
pub fn placeholder_token(index: usize) -> String {
    format!("[[G{}]]", index)
}

/// One protected span
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    /// Token inserted into the text
    pub token: String,
    /// Span of the input the token replaced, in its original case
    pub original: String,
    /// Approved glossary translation the token is restored to
    pub replacement: String,
}

/// Placeholders in the order they appear in the protected text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderMap {
    entries: Vec<Placeholder>,
}

impl PlaceholderMap {
    pub fn iter(&self) -> impl Iterator<Item = &Placeholder> {
        self.entries.iter()
    }

    pub fn get(&self, token: &str) -> Option<&Placeholder> {
        self.entries.iter().find(|p| p.token == token)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of [`protect`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedText {
    /// Input with every claimed span replaced by its token
    pub text: String,
    pub placeholders: PlaceholderMap,
    /// Glossary entries that claimed a span, in text order
    pub matched: Vec<GlossaryEntry>,
}

impl ProtectedText {
    pub fn has_matches(&self) -> bool {
        !self.placeholders.is_empty()
    }

    /// Comma-separated source terms, sent to the service as context
    pub fn context_hint(&self) -> String {
        self.matched
            .iter()
            .map(|e| e.source_term.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Result of [`restore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoredText {
    pub text: String,
    /// Tokens the translation no longer contained; they were not restored
    pub missing: Vec<String>,
}

impl RestoredText {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Replace glossary terms inside `text` with placeholder tokens
///
/// Candidates are the terms that occur in the normalized text, tried longest
/// first. Each one claims the first match in the original text that does
/// not overlap a span already claimed. Only that first occurrence is
/// protected.
pub fn protect(text: &str, glossary: &GlossaryIndex) -> ProtectedText {
    let normalized = normalize_phrase(text);

    let mut claimed: Vec<(Range<usize>, &GlossaryEntry)> = Vec::new();
    for term in glossary.terms() {
        if !normalized.contains(term.entry.source_term.as_str()) {
            continue;
        }
        let free_match = term.pattern().find_iter(text).find(|m| {
            claimed
                .iter()
                .all(|(span, _)| m.end() <= span.start || m.start() >= span.end)
        });
        if let Some(m) = free_match {
            claimed.push((m.range(), &term.entry));
        }
    }

    if claimed.is_empty() {
        return ProtectedText {
            text: text.to_string(),
            placeholders: PlaceholderMap::default(),
            matched: Vec::new(),
        };
    }

    claimed.sort_by_key(|(span, _)| span.start);

    let mut output = String::with_capacity(text.len());
    let mut placeholders = Vec::with_capacity(claimed.len());
    let mut matched = Vec::with_capacity(claimed.len());
    let mut cursor = 0;
    let mut next_index = 0;

    for (span, entry) in claimed {
        // never hand out a token the input already contains
        let mut token = placeholder_token(next_index);
        while text.contains(&token) {
            next_index += 1;
            token = placeholder_token(next_index);
        }
        next_index += 1;

        output.push_str(&text[cursor..span.start]);
        output.push_str(&token);
        placeholders.push(Placeholder {
            token,
            original: text[span.clone()].to_string(),
            replacement: entry.target_term.clone(),
        });
        matched.push(entry.clone());
        cursor = span.end;
    }
    output.push_str(&text[cursor..]);

    ProtectedText {
        text: output,
        placeholders: PlaceholderMap { entries: placeholders },
        matched,
    }
}

/// Put approved translations back in place of their tokens
///
/// Tokens the service dropped or rewrote are reported in
/// [`RestoredText::missing`]; whatever text came back is kept as is.
pub fn restore(translated: &str, placeholders: &PlaceholderMap) -> RestoredText {
    let mut text = translated.to_string();
    let mut missing = Vec::new();

    for placeholder in placeholders.iter() {
        if text.contains(&placeholder.token) {
            text = text.replace(&placeholder.token, &placeholder.replacement);
        } else {
            missing.push(placeholder.token.clone());
        }
    }

    RestoredText { text, missing }
}

/// Whether a string is worth sending to the translation service: more than
/// one visible character and at least one letter
pub fn is_translatable(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.chars().count() > 1 && trimmed.chars().any(char::is_alphabetic)
}
