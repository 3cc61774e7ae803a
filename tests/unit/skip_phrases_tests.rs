/*!
 * Tests for the boilerplate phrase filter
 */

use cadtranslator::translation::{SkipPhraseFilter, normalize_phrase};

#[test]
fn test_should_skip_withBuiltinPhrasesInAnyCase_shouldSkip() {
    let filter = SkipPhraseFilter::builtin();

    assert!(filter.should_skip("AMS SRL"));
    assert!(filter.should_skip("  General   Tolerances "));
    assert!(filter.should_skip("Date / Datum"));
    assert!(filter.should_skip("Maßstab"));
}

#[test]
fn test_should_skip_withSentenceContainingPhrase_shouldNotSkip() {
    let filter = SkipPhraseFilter::builtin();

    assert!(!filter.should_skip("General tolerances according to ISO 2768"));
    assert!(!filter.should_skip("Shaft"));
    assert!(!filter.should_skip(""));
}

#[test]
fn test_with_phrases_withCustomSet_shouldNormalizeEntries() {
    let filter = SkipPhraseFilter::with_phrases(["  Project   X ", "", "CONFIDENTIAL"]);

    assert_eq!(filter.len(), 2);
    assert!(filter.should_skip("project x"));
    assert!(filter.should_skip("Confidential"));
    assert!(!filter.should_skip("AMS SRL"));
}

#[test]
fn test_normalize_phrase_withTabsAndNewlines_shouldProduceSingleSpaces() {
    assert_eq!(normalize_phrase("Weight\t(KG)\n"), "weight (kg)");
    assert_eq!(normalize_phrase("   "), "");
}
