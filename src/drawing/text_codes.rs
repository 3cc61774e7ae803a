/*!
 * Conversion between stored drawing text and plain text.
 *
 * Stored text may contain `%%` control codes, `\U+XXXX` escapes and, for
 * paragraph entities, MTEXT inline formatting. Extraction strips all of it;
 * encoding produces text that reads back to the same plain string.
 */

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Maximum characters per MTEXT text group
pub const MTEXT_CHUNK_LEN: usize = 250;

static UNICODE_ESCAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\[Uu]\+([0-9A-Fa-f]{4})").expect("valid unicode escape pattern"));

static CONTROL_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%%(\d{3}|[cCdDpPuUoOkK%])").expect("valid control code pattern"));

fn decode_control_codes(text: &str) -> String {
    let text = UNICODE_ESCAPE.replace_all(text, |caps: &Captures| {
        u32::from_str_radix(&caps[1], 16)
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_default()
    });

    CONTROL_CODE
        .replace_all(&text, |caps: &Captures| match &caps[1] {
            "c" | "C" => "\u{00D8}".to_string(),
            "d" | "D" => "\u{00B0}".to_string(),
            "p" | "P" => "\u{00B1}".to_string(),
            "%" => "%".to_string(),
            code if code.len() == 3 => code
                .parse::<u32>()
                .ok()
                .and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_default(),
            // underline, overline and strike-through toggles
            _ => String::new(),
        })
        .into_owned()
}

/// Plain text of a single-line entity (TEXT, ATTRIB, ATTDEF)
pub fn decode_literal(raw: &str) -> String {
    decode_control_codes(raw)
}

/// Plain text of a paragraph entity (MTEXT and friends)
pub fn decode_paragraph(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    let mut out = String::with_capacity(raw.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '{' || c == '}' {
            i += 1;
            continue;
        }
        if c != '\\' || i + 1 >= chars.len() {
            out.push(c);
            i += 1;
            continue;
        }

        let code = chars[i + 1];
        match code {
            'P' | 'X' | 'N' => {
                out.push('\n');
                i += 2;
            }
            '~' => {
                out.push(' ');
                i += 2;
            }
            '\\' | '{' | '}' => {
                out.push(code);
                i += 2;
            }
            'L' | 'l' | 'O' | 'o' | 'K' | 'k' => i += 2,
            'S' => {
                // stacked fraction up to ';', rendered as a/b
                let end = find_semicolon(&chars, i + 2);
                let stacked: String = chars[i + 2..end].iter().collect();
                out.push_str(&stacked.replace(['^', '#'], "/"));
                i = end + 1;
            }
            'f' | 'F' | 'H' | 'W' | 'C' | 'c' | 'A' | 'T' | 'Q' | 'p' => {
                i = find_semicolon(&chars, i + 2) + 1;
            }
            _ => {
                // \U+XXXX and unknown codes are left for the control code pass
                out.push(c);
                i += 1;
            }
        }
    }

    decode_control_codes(&out)
}

fn find_semicolon(chars: &[char], from: usize) -> usize {
    chars[from.min(chars.len())..]
        .iter()
        .position(|c| *c == ';')
        .map(|p| from + p)
        .unwrap_or(chars.len())
}

fn push_encoded_char(out: &mut String, c: char, latin1: bool) {
    if !latin1 || (c as u32) <= 0xFF {
        out.push(c);
    } else if (c as u32) <= 0xFFFF {
        out.push_str(&format!("\\U+{:04X}", c as u32));
    } else {
        out.push('?');
    }
}

/// Stored form of new text for a single-line entity
///
/// Line breaks become spaces. With `latin1`, characters outside Latin-1 are
/// written as `\U+XXXX`.
pub fn encode_literal(text: &str, latin1: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\r' => {}
            '\n' => out.push(' '),
            _ => push_encoded_char(&mut out, c, latin1),
        }
    }
    out
}

/// Stored form of new text for a paragraph entity
pub fn encode_paragraph(text: &str, latin1: bool) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '\r' => {}
            '\n' => out.push_str("\\P"),
            '\\' => out.push_str("\\\\"),
            '{' => out.push_str("\\{"),
            '}' => out.push_str("\\}"),
            _ => push_encoded_char(&mut out, c, latin1),
        }
    }
    out
}

/// Split stored text into MTEXT groups of at most [`MTEXT_CHUNK_LEN`] characters
///
/// Always returns at least one chunk.
pub fn split_chunks(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars
        .chunks(MTEXT_CHUNK_LEN)
        .map(|chunk| chunk.iter().collect())
        .collect()
}
