//! Terminal styling for sync output: status lines, commit hashes,
//! provenance markers and dependency bumps.

use console::Style;

use forksync_core::bump::DependencyBump;
use forksync_core::models::Commit;
use forksync_core::provenance::MARKER_GLYPH;

/// Leading glyph and colour of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Done,
    Failed,
    Attention,
    Skipped,
}

impl Status {
    fn glyph(self) -> &'static str {
        match self {
            Status::Done => "✓",
            Status::Failed => "✗",
            Status::Attention => "⚠",
            Status::Skipped => "–",
        }
    }

    fn style(self) -> Style {
        match self {
            Status::Done => Style::new().green(),
            Status::Failed => Style::new().red(),
            Status::Attention => Style::new().yellow(),
            Status::Skipped => Style::new().dim(),
        }
    }

    /// `msg` prefixed with the coloured glyph. Skipped lines are dimmed whole.
    pub fn line(self, msg: &str) -> String {
        let style = self.style();
        if self == Status::Skipped {
            return style.apply_to(format!("{} {}", self.glyph(), msg)).to_string();
        }
        format!("{} {}", style.apply_to(self.glyph()), msg)
    }
}

pub fn heading(msg: &str) -> String {
    Style::new().bold().apply_to(msg).to_string()
}

/// Captured tool output echoed back to the user.
pub fn muted(msg: &str) -> String {
    Style::new().dim().apply_to(msg).to_string()
}

/// Short commit hash (yellow, like `git log --oneline`).
pub fn hash(hash: &str) -> String {
    Style::new().yellow().apply_to(hash).to_string()
}

/// `[3/7]` position of an update within the run.
pub fn progress(index: usize, total: usize) -> String {
    heading(&format!("[{}/{}]", index + 1, total))
}

/// The provenance marker a commit is recorded under, e.g. `🔄 abc1234: Fix bug`.
pub fn marker(commit: &Commit) -> String {
    format!("{} {}: {}", MARKER_GLYPH, hash(&commit.hash), commit.message)
}

/// Dependency bump label, e.g. `⬆ react → 18.2.0`.
pub fn bump(bump: &DependencyBump) -> String {
    Style::new()
        .cyan()
        .apply_to(format!("⬆ {}", bump))
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use console::strip_ansi_codes;

    #[test]
    fn test_marker_label_matches_provenance_format() {
        let commit = Commit::new("abc1234", "Fix bug", 1_700_000_000);
        assert_eq!(strip_ansi_codes(&marker(&commit)), "🔄 abc1234: Fix bug");
    }

    #[test]
    fn test_bump_label() {
        let bump = DependencyBump::parse("Bump react from 18.1.0 to 18.2.0").expect("bump subject");
        assert_eq!(strip_ansi_codes(&self::bump(&bump)), "⬆ react → 18.2.0");
    }

    #[test]
    fn test_status_lines() {
        assert_eq!(strip_ansi_codes(&Status::Done.line("fetched")), "✓ fetched");
        assert_eq!(strip_ansi_codes(&Status::Skipped.line("empty")), "– empty");
        assert_eq!(strip_ansi_codes(&progress(2, 7)), "[3/7]");
    }
}
