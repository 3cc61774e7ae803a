/*!
 * Per-string translation decisions.
 *
 * Every extracted string goes through the same ordered checks; the first
 * that applies wins:
 *
 * 1. boilerplate phrase: kept verbatim
 * 2. exact glossary term: replaced with the approved translation
 * 3. glossary terms inside the string: protected, machine-translated, restored
 * 4. anything else: machine-translated as is
 *
 * Strings too short or without letters never reach the service.
 */

use std::fmt;
use std::sync::Arc;

use super::cache::truncate_text;
use super::core::{LogCapture, TranslationService};
use super::glossary::GlossaryIndex;
use super::protection::{self, ProtectedText};
use super::skip_phrases::SkipPhraseFilter;

/// What to do with one string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationDecision {
    /// Boilerplate, keep the original
    Skip(String),
    /// Whole string is a glossary term; holds the replacement
    GlossaryExact(String),
    /// Glossary terms protected by placeholders before translation
    GlossaryProtectedTranslate {
        original: String,
        protected: ProtectedText,
    },
    /// Translate the original as is
    PlainTranslate(String),
}

/// Decision tag without payload, used for counting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecisionKind {
    Skip,
    GlossaryExact,
    GlossaryProtected,
    PlainTranslate,
}

impl fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Skip => "skip",
            Self::GlossaryExact => "glossary-exact",
            Self::GlossaryProtected => "glossary-protected",
            Self::PlainTranslate => "plain-translate",
        };
        f.write_str(name)
    }
}

impl TranslationDecision {
    pub fn kind(&self) -> DecisionKind {
        match self {
            Self::Skip(_) => DecisionKind::Skip,
            Self::GlossaryExact(_) => DecisionKind::GlossaryExact,
            Self::GlossaryProtectedTranslate { .. } => DecisionKind::GlossaryProtected,
            Self::PlainTranslate(_) => DecisionKind::PlainTranslate,
        }
    }
}

/// Final text for one string, with how it was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub text: String,
    pub kind: DecisionKind,
    /// The service was asked and failed; `text` is the original
    pub service_failed: bool,
    /// Placeholder tokens that could not be restored
    pub missing_placeholders: Vec<String>,
}

impl Resolution {
    fn unchanged(text: &str, kind: DecisionKind) -> Self {
        Self {
            text: text.to_string(),
            kind,
            service_failed: false,
            missing_placeholders: Vec::new(),
        }
    }
}

/// Decision engine over an immutable glossary and skip set
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    glossary: Arc<GlossaryIndex>,
    skip_filter: Arc<SkipPhraseFilter>,
}

impl DecisionEngine {
    pub fn new(glossary: Arc<GlossaryIndex>, skip_filter: Arc<SkipPhraseFilter>) -> Self {
        Self { glossary, skip_filter }
    }

    /// Classify one string
    pub fn decide(&self, text: &str, log: &LogCapture) -> TranslationDecision {
        let short = truncate_text(text, 60);

        if self.skip_filter.should_skip(text) {
            log.audit(format!("skip: boilerplate '{}'", short));
            return TranslationDecision::Skip(text.to_string());
        }

        if let Some(replacement) = self.glossary.lookup(text) {
            log.audit(format!("glossary-exact: '{}' -> '{}'", short, replacement));
            return TranslationDecision::GlossaryExact(replacement.to_string());
        }

        let protected = protection::protect(text, &self.glossary);
        if protected.has_matches() {
            log.audit(format!(
                "glossary-protected: '{}' as '{}' ({} term(s): {})",
                short,
                truncate_text(&protected.text, 60),
                protected.placeholders.len(),
                protected.context_hint()
            ));
            return TranslationDecision::GlossaryProtectedTranslate {
                original: text.to_string(),
                protected,
            };
        }

        log.audit(format!("plain-translate: '{}'", short));
        TranslationDecision::PlainTranslate(text.to_string())
    }

    /// Turn a decision into final text, calling the service where needed
    ///
    /// Service failures are logged and leave the original text in place.
    pub async fn resolve(
        &self,
        decision: TranslationDecision,
        service: &TranslationService,
        log: &LogCapture,
    ) -> Resolution {
        let kind = decision.kind();

        match decision {
            TranslationDecision::Skip(original) => Resolution::unchanged(&original, kind),

            TranslationDecision::GlossaryExact(replacement) => Resolution::unchanged(&replacement, kind),

            TranslationDecision::PlainTranslate(original) => {
                if !protection::is_translatable(&original) {
                    log.audit(format!("passthrough: '{}' has nothing to translate", original.trim()));
                    return Resolution::unchanged(&original, kind);
                }
                match service.translate(&original, None).await {
                    Ok(translated) => {
                        log.audit(format!(
                            "translated: '{}' -> '{}'",
                            truncate_text(&original, 60),
                            truncate_text(&translated, 60)
                        ));
                        Resolution::unchanged(&translated, kind)
                    }
                    Err(e) => {
                        log.warn(format!(
                            "Translation failed for '{}', keeping original: {}",
                            truncate_text(&original, 60),
                            e
                        ));
                        Resolution {
                            service_failed: true,
                            ..Resolution::unchanged(&original, kind)
                        }
                    }
                }
            }

            TranslationDecision::GlossaryProtectedTranslate { original, protected } => {
                if !protection::is_translatable(&original) {
                    log.audit(format!("passthrough: '{}' has nothing to translate", original.trim()));
                    return Resolution::unchanged(&original, kind);
                }
                let residual = protected
                    .placeholders
                    .iter()
                    .fold(protected.text.clone(), |acc, p| acc.replace(&p.token, ""));
                if !protection::is_translatable(&residual) {
                    // nothing left but placeholders: restore without a service call
                    let restored = protection::restore(&protected.text, &protected.placeholders);
                    log.audit(format!(
                        "glossary-only: '{}' -> '{}'",
                        truncate_text(&original, 60),
                        restored.text
                    ));
                    return Resolution::unchanged(&restored.text, kind);
                }

                let hint = protected.context_hint();
                match service.translate(&protected.text, Some(&hint)).await {
                    Ok(translated) => {
                        let restored = protection::restore(&translated, &protected.placeholders);
                        if !restored.is_complete() {
                            log.warn(format!(
                                "Placeholders {} lost in translation of '{}'",
                                restored.missing.join(", "),
                                truncate_text(&original, 60)
                            ));
                        }
                        log.audit(format!(
                            "translated (protected): '{}' -> '{}'",
                            truncate_text(&original, 60),
                            truncate_text(&restored.text, 60)
                        ));
                        Resolution {
                            text: restored.text,
                            kind,
                            service_failed: false,
                            missing_placeholders: restored.missing,
                        }
                    }
                    Err(e) => {
                        log.warn(format!(
                            "Translation failed for '{}', keeping original: {}",
                            truncate_text(&original, 60),
                            e
                        ));
                        Resolution {
                            service_failed: true,
                            ..Resolution::unchanged(&original, kind)
                        }
                    }
                }
            }
        }
    }
}
