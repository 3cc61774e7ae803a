/*!
 * Glossary-aware translation of drawing text.
 *
 * - `skip_phrases`: fixed boilerplate that is never translated
 * - `glossary`: approved term pairs loaded from a delimited file
 * - `protection`: placeholder substitution of glossary terms
 * - `decision`: per-string decision engine
 * - `core`: translation gateway over a provider, and run log capture
 * - `cache`: per-run translation cache
 */

// Re-export main types for easier usage
pub use self::core::{LogCapture, LogEntry, TranslationOptions, TranslationService, TranslationStats};
pub use self::decision::{DecisionEngine, DecisionKind, Resolution, TranslationDecision};
pub use self::glossary::{GlossaryEntry, GlossaryIndex};
pub use self::protection::{PlaceholderMap, ProtectedText, RestoredText, is_translatable, protect, restore};
pub use self::skip_phrases::{SkipPhraseFilter, normalize_phrase};

// Submodules
pub mod cache;
pub mod core;
pub mod decision;
pub mod glossary;
pub mod protection;
pub mod skip_phrases;
