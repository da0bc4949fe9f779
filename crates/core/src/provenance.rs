//! Provenance markers recorded in replayed commit messages.
//!
//! A replayed commit is titled `🔄 <short hash>: <escaped subject>`. The
//! marker is both the audit trail and the input to already-applied
//! detection, so its shape must not change between releases.

use crate::models::Commit;

/// Glyph that opens every provenance marker.
pub const MARKER_GLYPH: &str = "🔄";

/// Shortest abbreviated hash git will print.
const MIN_HASH_LEN: usize = 4;

/// Build the commit message for a replayed upstream commit.
pub fn format_marker(commit: &Commit) -> String {
    format!(
        "{} {}: {}",
        MARKER_GLYPH,
        commit.hash,
        escape_subject(&commit.message)
    )
}

/// Backslash-escape quote and backslash characters.
pub fn escape_subject(subject: &str) -> String {
    let mut out = String::with_capacity(subject.len());
    for ch in subject.chars() {
        if matches!(ch, '"' | '\'' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Hashes recorded by every marker in `message`, in order of appearance.
pub fn marker_hashes(message: &str) -> Vec<&str> {
    message
        .match_indices(MARKER_GLYPH)
        .filter_map(|(idx, glyph)| {
            let rest = message[idx + glyph.len()..].trim_start();
            let end = rest
                .find(|c: char| !c.is_ascii_hexdigit())
                .unwrap_or(rest.len());
            let hash = &rest[..end];
            (hash.len() >= MIN_HASH_LEN && rest[end..].starts_with(':')).then_some(hash)
        })
        .collect()
}

/// Whether `message` carries a marker for `hash`.
///
/// Abbreviations may grow between runs as the repository does, so a marker
/// matches when either hash is a prefix of the other.
pub fn marks_hash(message: &str, hash: &str) -> bool {
    marker_hashes(message)
        .into_iter()
        .any(|recorded| hashes_match(recorded, hash))
}

/// Whether two abbreviations of possibly different length name the same commit.
pub fn hashes_match(recorded: &str, hash: &str) -> bool {
    recorded.len() >= MIN_HASH_LEN
        && hash.len() >= MIN_HASH_LEN
        && (recorded.starts_with(hash) || hash.starts_with(recorded))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_marker() {
        let commit = Commit::new("abc1234", "Fix bug", 0);
        assert_eq!(format_marker(&commit), "🔄 abc1234: Fix bug");
    }

    #[test]
    fn test_format_marker_escapes_quotes_and_backslashes() {
        let commit = Commit::new("abc1234", r#"Use "strict" mode in C:\src, don't"#, 0);
        assert_eq!(
            format_marker(&commit),
            r#"🔄 abc1234: Use \"strict\" mode in C:\\src, don\'t"#
        );
    }

    #[test]
    fn test_marker_hashes() {
        assert_eq!(marker_hashes("🔄 abc1234: Fix bug"), vec!["abc1234"]);
        assert_eq!(
            marker_hashes("Squash of 🔄 abc1234: one and 🔄 def5678: two"),
            vec!["abc1234", "def5678"]
        );
        assert!(marker_hashes("🔄 not-a-hash: nope").is_empty());
        assert!(marker_hashes("🔄 abc1234 missing colon").is_empty());
        assert!(marker_hashes("Fix bug abc1234").is_empty());
    }

    #[test]
    fn test_marks_hash_tolerates_abbreviation_growth() {
        let message = "🔄 abc1234: Fix bug";
        assert!(marks_hash(message, "abc1234"));
        assert!(marks_hash(message, "abc12345"));
        assert!(marks_hash("🔄 abc12345: Fix bug", "abc1234"));
        assert!(!marks_hash(message, "abd1234"));
        assert!(!marks_hash(message, "abc"));
    }

    #[test]
    fn test_marker_from_formatted_message_round_trips() {
        let commit = Commit::new("0f3e9a1", "Bump lodash from 4.17.15 to 4.17.21", 0);
        assert!(marks_hash(&format_marker(&commit), &commit.hash));
    }
}
