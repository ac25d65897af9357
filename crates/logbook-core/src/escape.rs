//! Stardate → file name escaping.
//!
//! Percent-encoding over UTF-8 bytes. Lowercase ASCII letters, digits, `-`,
//! `_` and `.` pass through. A leading or trailing `.` is always encoded, so
//! no name can be `.`, `..`, a hidden file, or lose a trailing dot on
//! Windows. Uppercase letters are encoded too, which keeps names distinct on
//! case-insensitive file systems. Every other byte becomes `%XX` (uppercase
//! hex). [`unescape`] inverts [`escape`] exactly and refuses any name that is
//! not in canonical form, so distinct stardates never share a file name.

use crate::error::{LogbookError, Result};

/// Longest file name accepted by common file systems, in bytes.
pub const MAX_FILE_NAME_LEN: usize = 255;

fn passes_through(index: usize, len: usize, byte: u8) -> bool {
    match byte {
        b'.' => index != 0 && index + 1 != len,
        b'-' | b'_' => true,
        _ => byte.is_ascii_lowercase() || byte.is_ascii_digit(),
    }
}

pub fn escape(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for (index, byte) in id.bytes().enumerate() {
        if passes_through(index, id.len(), byte) {
            out.push(byte as char);
        } else {
            out.push('%');
            out.push_str(&hex::encode_upper([byte]));
        }
    }
    out
}

/// Recover the stardate from a file name, or `None` if the name was not
/// produced by [`escape`].
pub fn unescape(name: &str) -> Option<String> {
    let bytes = name.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let pair = name.get(i + 1..i + 3)?;
            let byte = hex::decode(pair).ok()?;
            decoded.extend_from_slice(&byte);
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }
    let id = String::from_utf8(decoded).ok()?;
    (escape(&id) == name).then_some(id)
}

/// Blank means empty or whitespace only.
pub fn is_blank(id: &str) -> bool {
    id.trim().is_empty()
}

/// File name for a stardate, validating that it is usable as a key.
pub fn file_name_for(id: &str) -> Result<String> {
    if is_blank(id) {
        return Err(LogbookError::Validation("stardate must not be blank".into()));
    }
    let name = escape(id);
    if name.len() > MAX_FILE_NAME_LEN {
        return Err(LogbookError::Validation(format!(
            "stardate escapes to {} bytes, limit is {MAX_FILE_NAME_LEN}",
            name.len()
        )));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const AWKWARD: &[&str] = &[
        "2259.42",
        "2259%2E42",
        "2259 42",
        "2259+42",
        "a/b",
        "a%2Fb",
        "a\\b",
        ".",
        "..",
        ".hidden",
        "%2Ehidden",
        "x.",
        "Ünïcødé ✨",
        "UPPER",
        "upper",
        "%",
        "%25",
        "tab\there",
        "line\nbreak",
    ];

    #[test]
    fn plain_stardate_stays_readable() {
        assert_eq!(escape("2259.42"), "2259.42");
        assert_eq!(escape("log-entry_7"), "log-entry_7");
    }

    #[test]
    fn separators_and_dots_are_encoded() {
        assert_eq!(escape("a/b"), "a%2Fb");
        assert_eq!(escape(".."), "%2E%2E");
        assert_eq!(escape("."), "%2E");
        assert_eq!(escape("50%"), "50%25");
        assert_eq!(escape("a b"), "a%20b");
    }

    #[test]
    fn unescape_inverts_escape() {
        for id in AWKWARD {
            assert_eq!(unescape(&escape(id)).as_deref(), Some(*id), "{id:?}");
        }
    }

    #[test]
    fn distinct_ids_never_collide() {
        let names: HashSet<String> = AWKWARD.iter().map(|id| escape(id)).collect();
        assert_eq!(names.len(), AWKWARD.len());
    }

    #[test]
    fn names_stay_distinct_on_case_insensitive_file_systems() {
        let folded: HashSet<String> = AWKWARD
            .iter()
            .chain(["Log", "log", "LOG", "x", "x..", "Captain", "captain"].iter())
            .map(|id| escape(id).to_ascii_lowercase())
            .collect();
        let distinct: HashSet<&str> = AWKWARD
            .iter()
            .chain(["Log", "log", "LOG", "x", "x..", "Captain", "captain"].iter())
            .copied()
            .collect();
        assert_eq!(folded.len(), distinct.len());
    }

    #[test]
    fn uppercase_and_trailing_dots_are_encoded() {
        assert_eq!(escape("Log"), "%4Cog");
        assert_eq!(escape("x."), "x%2E");
        assert_eq!(escape("x..y"), "x..y");
        assert_eq!(unescape("%4Cog").as_deref(), Some("Log"));
    }

    #[test]
    fn non_canonical_names_are_refused() {
        assert_eq!(unescape("%61"), None); // 'a' must not be encoded
        assert_eq!(unescape("Log"), None); // uppercase must be encoded
        assert_eq!(unescape("x."), None);
        assert_eq!(unescape("a%2fb"), None); // lowercase hex
        assert_eq!(unescape(".hidden"), None);
        assert_eq!(unescape("a b"), None);
        assert_eq!(unescape("trailing%2"), None);
        assert_eq!(unescape("%FF"), None); // not UTF-8
    }

    #[test]
    fn file_name_validation() {
        assert!(matches!(file_name_for(""), Err(LogbookError::Validation(_))));
        assert!(matches!(file_name_for("   "), Err(LogbookError::Validation(_))));
        assert!(matches!(
            file_name_for(&"/".repeat(100)),
            Err(LogbookError::Validation(_))
        ));
        assert_eq!(file_name_for("2259.42").unwrap(), "2259.42");
    }
}
