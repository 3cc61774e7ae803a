/*!
 * Tests for language code utilities
 */

use anyhow::Result;
use cadtranslator::language_utils::{
    LanguageCodeType, get_language_name, is_auto_detect, language_codes_match, normalize_to_part2t,
    split_region, to_deepl_code, validate_language_code,
};

#[test]
fn test_validate_language_code_withEachCodeForm_shouldReportType() -> Result<()> {
    assert_eq!(validate_language_code("de")?, LanguageCodeType::Part1);
    assert_eq!(validate_language_code("deu")?, LanguageCodeType::Part2T);
    assert_eq!(validate_language_code("ger")?, LanguageCodeType::Part2B);
    assert_eq!(validate_language_code("de-AT")?, LanguageCodeType::Part1);
    assert!(validate_language_code("xx").is_err());
    assert!(validate_language_code("german").is_err());
    Ok(())
}

#[test]
fn test_split_region_withMixedSeparators_shouldNormalizeCase() {
    assert_eq!(split_region("EN_gb"), ("en".to_string(), Some("GB".to_string())));
    assert_eq!(split_region(" it "), ("it".to_string(), None));
    assert_eq!(split_region("pt-"), ("pt-".to_string(), None));
}

#[test]
fn test_language_codes_match_withEquivalentCodes_shouldMatch() {
    assert!(language_codes_match("de", "DEU"));
    assert!(language_codes_match("de-DE", "ger"));
    assert!(language_codes_match("it", "ita"));
    assert!(!language_codes_match("de", "en"));
    assert!(!language_codes_match("de", "zz"));
}

#[test]
fn test_to_deepl_code_withVariousInputs_shouldProduceUppercaseCodes() -> Result<()> {
    assert_eq!(to_deepl_code("de")?, "DE");
    assert_eq!(to_deepl_code("fra")?, "FR");
    assert_eq!(to_deepl_code("pt-br")?, "PT-BR");
    assert!(to_deepl_code("nonsense").is_err());
    Ok(())
}

#[test]
fn test_is_auto_detect_withAutoOrBlank_shouldReturnTrue() {
    assert!(is_auto_detect("auto"));
    assert!(is_auto_detect(" AUTO "));
    assert!(is_auto_detect(""));
    assert!(!is_auto_detect("en"));
}

#[test]
fn test_get_language_name_withCodes_shouldReturnEnglishName() -> Result<()> {
    assert_eq!(get_language_name("de")?, "German");
    assert_eq!(normalize_to_part2t("it-IT")?, "ita");
    Ok(())
}
