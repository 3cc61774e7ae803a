use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for ISO language code handling
///
/// Glossary headers, configuration and the translation service all name
/// languages by code, but not always in the same form: `de`, `DE`, `deu`,
/// `ger` and `de-DE` all denote German. These helpers validate such codes,
/// compare them, and render them in the form the DeepL API expects.
/// Language code type
#[derive(Debug, PartialEq, Eq)]
pub enum LanguageCodeType {
    /// ISO 639-1 (2-letter) code
    Part1,
    /// ISO 639-2/T (3-letter) code
    Part2T,
    /// ISO 639-2/B (3-letter) code
    Part2B,
}

/// Source language value meaning "let the service detect it"
pub const AUTO_DETECT: &str = "auto";

// ISO 639-2/B codes that differ from their 639-2/T counterpart
const PART2B_TO_PART2T: &[(&str, &str)] = &[
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

fn part2b_to_part2t(code: &str) -> Option<&'static str> {
    PART2B_TO_PART2T
        .iter()
        .find(|(b, _)| *b == code)
        .map(|(_, t)| *t)
}

/// Split a code such as `de-DE`, `EN_gb` or `pt-br` into its language and region parts
pub fn split_region(code: &str) -> (String, Option<String>) {
    let trimmed = code.trim();
    match trimmed.split_once(['-', '_']) {
        Some((lang, region)) if !region.is_empty() => {
            (lang.to_lowercase(), Some(region.to_uppercase()))
        }
        _ => (trimmed.to_lowercase(), None),
    }
}

/// Whether the code asks for source language auto-detection
pub fn is_auto_detect(code: &str) -> bool {
    let trimmed = code.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case(AUTO_DETECT)
}

/// Validate if a language code is a valid ISO 639-1 or ISO 639-2 code
///
/// A region suffix (`de-AT`) is accepted and ignored.
pub fn validate_language_code(code: &str) -> Result<LanguageCodeType> {
    let (lang, _) = split_region(code);

    match lang.len() {
        2 if Language::from_639_1(&lang).is_some() => return Ok(LanguageCodeType::Part1),
        3 if Language::from_639_3(&lang).is_some() => return Ok(LanguageCodeType::Part2T),
        3 if part2b_to_part2t(&lang).is_some() => return Ok(LanguageCodeType::Part2B),
        _ => {}
    }

    Err(anyhow!("Invalid language code: {}", code))
}

/// Normalize a language code to ISO 639-2/T (3-letter) format
pub fn normalize_to_part2t(code: &str) -> Result<String> {
    let (lang, _) = split_region(code);

    if lang.len() == 2 {
        if let Some(language) = Language::from_639_1(&lang) {
            return Ok(language.to_639_3().to_string());
        }
    } else if lang.len() == 3 {
        if Language::from_639_3(&lang).is_some() {
            return Ok(lang);
        }
        if let Some(part2t) = part2b_to_part2t(&lang) {
            return Ok(part2t.to_string());
        }
    }

    Err(anyhow!("Cannot normalize invalid language code: {}", code))
}

/// Normalize a language code to ISO 639-1 (2-letter) format if possible
/// Falls back to ISO 639-2/T if no ISO 639-1 code exists
pub fn normalize_to_part1_or_part2t(code: &str) -> Result<String> {
    let part2t = normalize_to_part2t(code)?;
    let language = Language::from_639_3(&part2t)
        .ok_or_else(|| anyhow!("Cannot normalize invalid language code: {}", code))?;

    Ok(language
        .to_639_1()
        .map(|c| c.to_string())
        .unwrap_or(part2t))
}

/// Render a code the way DeepL expects it: upper-case ISO 639-1, keeping
/// a region variant (`EN-GB`, `PT-BR`) when one was given
pub fn to_deepl_code(code: &str) -> Result<String> {
    let (_, region) = split_region(code);
    let base = normalize_to_part1_or_part2t(code)?.to_uppercase();

    Ok(match region {
        Some(region) => format!("{}-{}", base, region),
        None => base,
    })
}

/// Render a source language for DeepL; `None` means auto-detection
///
/// DeepL rejects region variants on the source side, so only the base code is kept.
pub fn to_deepl_source_code(code: &str) -> Result<Option<String>> {
    if is_auto_detect(code) {
        return Ok(None);
    }
    Ok(Some(normalize_to_part1_or_part2t(code)?.to_uppercase()))
}

/// Check if two language codes match (represent the same language)
///
/// Region suffixes are ignored, so `de-DE` matches `DE` and `deu`.
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (normalize_to_part2t(code1), normalize_to_part2t(code2)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Get the language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let normalized = normalize_to_part2t(code)?;
    let lang = Language::from_639_3(&normalized)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", normalized))?;

    Ok(lang.to_name().to_string())
}
