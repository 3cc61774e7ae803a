/*!
 * Boilerplate phrases that must never be translated.
 *
 * Title blocks and legal notices repeat the same fixed strings on every
 * sheet. They are matched after normalization and kept verbatim.
 */

use std::collections::HashSet;

/// Title-block labels, company names and legal notices (EN/DE)
const BUILTIN_PHRASES: &[&str] = &[
    "industry automation",
    "manufacturing & service s.r.l.",
    "ams s.r.l.",
    "ams srl",
    "ams srl.",
    "industry automation manufacturing & service s.r.l.",
    "this drawing is the property of industry ams srl.",
    "any reproduction, exploitation or communication to",
    "third parties will result in civil and penal consequences.",
    "do not manually modify the cad drawing.",
    "diese zeichnung ist eigentum von industry ams srl.",
    "jede vervielfältigung, verwertung oder mitteilung an",
    "dritte personen hat zivilund strafrechtliche folgen.",
    "cad-erstellte zeichnung nicht manuell ändern.",
    "author / verfasser",
    "date / datum",
    "approval / genehmigung",
    "description / beschreibung",
    "description / benennung",
    "drawing no. / zeichnungs-nr.",
    "general tolerances",
    "allgemeintoleranzen",
    "size",
    "format",
    "sheet n.",
    "blatt-nr",
    "scale",
    "maßstab",
    "weight (kg)",
    "gewicht (kg)",
];

/// Lower-case, collapse runs of whitespace to one space and trim
pub fn normalize_phrase(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Immutable set of normalized boilerplate phrases
#[derive(Debug, Clone)]
pub struct SkipPhraseFilter {
    phrases: HashSet<String>,
}

impl SkipPhraseFilter {
    /// The compiled-in boilerplate set
    pub fn builtin() -> Self {
        Self::with_phrases(BUILTIN_PHRASES.iter().copied())
    }

    /// Build a filter from arbitrary phrases; they are normalized on the way in
    pub fn with_phrases<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let phrases = phrases
            .into_iter()
            .map(|p| normalize_phrase(p.as_ref()))
            .filter(|p| !p.is_empty())
            .collect();
        Self { phrases }
    }

    /// Whether the text, once normalized, is exactly one of the phrases
    pub fn should_skip(&self, text: &str) -> bool {
        self.phrases.contains(&normalize_phrase(text))
    }

    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }
}

impl Default for SkipPhraseFilter {
    fn default() -> Self {
        Self::builtin()
    }
}
