// SPDX-License-Identifier: Apache-2.0

//! Script-aware character validation for place names.
//!
//! Each declared language maps its primary subtag to the script its
//! names are expected in; a tag with no known script falls back to
//! "any letter" so an unrecognized language never fails a country on
//! script grounds alone.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Latin,
    Arabic,
    Cyrillic,
    Greek,
    Ethiopic,
    Thai,
    Myanmar,
    Georgian,
    Armenian,
    Any,
}

pub fn script_for(tag: &str) -> Script {
    let primary = tag.split('-').next().unwrap_or(tag).to_ascii_lowercase();
    match primary.as_str() {
        "az" | "cs" | "da" | "de" | "en" | "es" | "et" | "fi" | "fr" | "ha" | "hr" | "ht"
        | "hu" | "id" | "it" | "lt" | "lv" | "ms" | "nl" | "no" | "pl" | "pt" | "ro" | "sk"
        | "sl" | "so" | "sq" | "sv" | "sw" | "tl" | "tr" | "uz" | "vi" => Script::Latin,
        "ar" | "fa" | "ps" | "ur" => Script::Arabic,
        "be" | "bg" | "kk" | "ky" | "mk" | "ru" | "sr" | "tg" | "uk" => Script::Cyrillic,
        "el" => Script::Greek,
        "am" | "ti" => Script::Ethiopic,
        "th" => Script::Thai,
        "my" => Script::Myanmar,
        "ka" => Script::Georgian,
        "hy" => Script::Armenian,
        _ => Script::Any,
    }
}

pub fn is_script_letter(script: Script, c: char) -> bool {
    match script {
        Script::Latin => {
            c.is_ascii_alphabetic()
                || matches!(c, '\u{00C0}'..='\u{00FF}' if c != '\u{00D7}' && c != '\u{00F7}')
                || matches!(c, '\u{0100}'..='\u{024F}' | '\u{1E00}'..='\u{1EFF}')
        }
        Script::Arabic => matches!(
            c,
            '\u{0600}'..='\u{06FF}'
                | '\u{0750}'..='\u{077F}'
                | '\u{FB50}'..='\u{FDFF}'
                | '\u{FE70}'..='\u{FEFF}'
        ),
        Script::Cyrillic => matches!(c, '\u{0400}'..='\u{052F}'),
        Script::Greek => matches!(c, '\u{0370}'..='\u{03FF}' | '\u{1F00}'..='\u{1FFF}'),
        Script::Ethiopic => matches!(c, '\u{1200}'..='\u{137F}'),
        Script::Thai => matches!(c, '\u{0E00}'..='\u{0E7F}'),
        Script::Myanmar => matches!(c, '\u{1000}'..='\u{109F}'),
        Script::Georgian => matches!(c, '\u{10A0}'..='\u{10FF}'),
        Script::Armenian => matches!(c, '\u{0530}'..='\u{058F}'),
        Script::Any => c.is_alphabetic(),
    }
}

/// Combining diacritics appear in decomposed names and are never
/// findings on their own.
fn is_combining_mark(c: char) -> bool {
    matches!(c, '\u{0300}'..='\u{036F}')
}

fn is_name_punctuation(c: char) -> bool {
    matches!(c, ' ' | '-' | '\'' | '\u{2019}' | '.' | ',')
}

/// Characters a name may not contain for its declared language.
/// Digits are excluded here; embedded digits are a separate finding.
pub fn invalid_chars(script: Script, name: &str) -> Vec<char> {
    name.chars()
        .filter(|&c| {
            !is_script_letter(script, c)
                && !is_combining_mark(c)
                && !is_name_punctuation(c)
                && !c.is_ascii_digit()
        })
        .collect()
}

/// A non-empty name with no letter content at all (punctuation-only).
pub fn is_punctuation_only(script: Script, name: &str) -> bool {
    let trimmed = name.trim();
    !trimmed.is_empty() && !trimmed.chars().any(|c| is_script_letter(script, c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latin_accepts_diacritics_and_rejects_foreign_scripts() {
        let script = script_for("fr");
        assert_eq!(script, Script::Latin);
        assert!(invalid_chars(script, "N'Djaména").is_empty());
        assert!(invalid_chars(script, "Sélibaby").is_empty());
        assert_eq!(invalid_chars(script, "Bangui\u{0416}"), vec!['\u{0416}']);
    }

    #[test]
    fn arabic_names_are_valid_under_an_arabic_tag_only() {
        assert!(invalid_chars(script_for("ar"), "\u{0628}\u{063A}\u{062F}\u{0627}\u{062F}").is_empty());
        assert!(!invalid_chars(script_for("en"), "\u{0628}\u{063A}\u{062F}\u{0627}\u{062F}").is_empty());
    }

    #[test]
    fn unknown_language_accepts_any_letter() {
        let script = script_for("zz");
        assert_eq!(script, Script::Any);
        assert!(invalid_chars(script, "Κιλκίς").is_empty());
    }

    #[test]
    fn punctuation_only_names_are_flagged() {
        let script = script_for("en");
        assert!(is_punctuation_only(script, "---"));
        assert!(!is_punctuation_only(script, "Bimbo"));
        assert!(!is_punctuation_only(script, "   "));
    }
}
