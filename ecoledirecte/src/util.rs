//! Payload normalization utilities.
use std::string::FromUtf8Error;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Failure to decode a single homework description.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The content is not valid base64.
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The decoded bytes are not UTF-8.
    #[error("invalid utf-8: {0}")]
    Utf8(#[from] FromUtf8Error),
}

/// Unescape HTML entities, then remove tags and newlines.
#[must_use]
pub fn strip_markup(html: &str) -> String {
    lazy_static! {
        static ref MARKUP: Regex = Regex::new(r"</?[A-Za-z][^<>]*>|\r?\n").unwrap();
    }

    let text = html_escape::decode_html_entities(html);
    MARKUP.replace_all(&text, "").into_owned()
}

/// Turn the base64 `contenu` of a homework entry into plain text.
///
/// # Errors
///
/// Fails if the content is not base64 or does not decode to UTF-8.
pub fn decode_description(content: &str) -> Result<String, DecodeError> {
    let compact: String = content
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = base64::decode(compact)?;
    let html = String::from_utf8(bytes)?;
    Ok(strip_markup(&html))
}

/// Parse a portal mark such as `"12,5"`. Non-numeric marks (`"Abs"`,
/// `"Disp"`, empty) yield `None`.
#[must_use]
pub fn parse_mark(mark: &str) -> Option<f64> {
    mark.trim().replace(',', ".").parse().ok()
}

/// The portal sends some numeric fields as strings and some as numbers.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Lenient {
        Str(String),
        Num(serde_json::Number),
        Bool(bool),
        Null(()),
    }

    Ok(match Lenient::deserialize(deserializer)? {
        Lenient::Str(s) => s,
        Lenient::Num(n) => n.to_string(),
        Lenient::Bool(b) => b.to_string(),
        Lenient::Null(()) => String::new(),
    })
}

/// `YYYY-MM-DD HH:MM` timestamps, local to the school.
pub(crate) mod portal_datetime {
    use chrono::NaiveDateTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub(crate) const FORMAT: &str = "%Y-%m-%d %H:%M";

    pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&s, FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S"))
            .map_err(de::Error::custom)
    }

    pub(crate) fn serialize<S>(dt: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&dt.format(FORMAT))
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_description, parse_mark, strip_markup, DecodeError};

    #[test]
    fn decode_paragraph() {
        let content = base64::encode("<p>Lire chapitre 3</p>\n");
        assert_eq!(decode_description(&content).unwrap(), "Lire chapitre 3");
    }

    #[test]
    fn plain_text_round_trip() {
        for text in ["Exercice 4 page 12", "  deux espaces", "é à ç ù", "3 < 4 & 5 > 2", ""] {
            let content = base64::encode(text);
            assert_eq!(decode_description(&content).unwrap(), text);
        }
    }

    #[test]
    fn entities_are_unescaped_before_stripping() {
        assert_eq!(
            strip_markup("<p>Rendre l&#39;exercice &amp; la fiche</p>\r\n<br />"),
            "Rendre l'exercice & la fiche"
        );
        assert_eq!(strip_markup("&lt;b&gt;gras&lt;/b&gt;"), "gras");
        assert_eq!(strip_markup("<span style=\"color: red\">x</span>"), "x");
    }

    #[test]
    fn wrapped_base64() {
        let content = base64::encode("<p>Faire les exercices 1 à 5 de la page 42</p>");
        let (head, tail) = content.split_at(20);
        let wrapped = format!("{head}\r\n{tail}\n");
        assert_eq!(
            decode_description(&wrapped).unwrap(),
            "Faire les exercices 1 à 5 de la page 42"
        );
    }

    #[test]
    fn invalid_content() {
        assert!(matches!(
            decode_description("not base64 !!"),
            Err(DecodeError::Base64(_))
        ));
        assert!(matches!(
            decode_description(&base64::encode([0xff, 0xfe])),
            Err(DecodeError::Utf8(_))
        ));
    }

    #[test]
    fn marks() {
        assert_eq!(parse_mark("12,5"), Some(12.5));
        assert_eq!(parse_mark("17"), Some(17.0));
        assert_eq!(parse_mark("Abs"), None);
        assert_eq!(parse_mark(""), None);
    }
}
