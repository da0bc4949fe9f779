//! Dependency-bump classification and package-manager upgrade commands.
//!
//! Automated bump commits ("Bump lodash from 4.17.15 to 4.17.21") touch
//! lockfiles whose upstream diff rarely applies cleanly to a fork, so they
//! are replayed by asking the package manager for the target version instead
//! of cherry-picking.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

/// Matches `Bump <package> from <old> to <new>`, optionally behind a
/// conventional-commit prefix such as `chore(deps): `.
static BUMP_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:[a-z]+(?:\([^)]*\))?!?:\s*)?bump\s+(\S+)\s+from\s+(\S+)\s+to\s+(\S+)")
        .expect("Invalid dependency bump regex")
});

/// A single dependency pinned to a new version by an upstream commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyBump {
    pub package: String,
    pub version: String,
}

impl DependencyBump {
    /// Classify a commit subject, returning the bump it describes if any.
    pub fn parse(subject: &str) -> Option<Self> {
        let caps = BUMP_REGEX.captures(subject.trim())?;
        Some(Self {
            package: caps[1].to_string(),
            version: caps[3].to_string(),
        })
    }

    /// `<package>@<version>`, accepted by every supported manager.
    pub fn pinned_spec(&self) -> String {
        format!("{}@{}", self.package, self.version)
    }
}

impl fmt::Display for DependencyBump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {}", self.package, self.version)
    }
}

// ---------------------------------------------------------------------------
// Package managers
// ---------------------------------------------------------------------------

/// Package manager used to re-resolve dependency bumps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    #[default]
    Yarn,
    Npm,
    Pnpm,
}

impl PackageManager {
    pub fn program(&self) -> &'static str {
        match self {
            Self::Yarn => "yarn",
            Self::Npm => "npm",
            Self::Pnpm => "pnpm",
        }
    }

    /// Arguments that pin `bump.package` to exactly `bump.version`.
    pub fn upgrade_args(&self, bump: &DependencyBump) -> Vec<String> {
        let verb = match self {
            Self::Yarn => "upgrade",
            Self::Npm => "install",
            Self::Pnpm => "update",
        };
        vec![verb.to_string(), bump.pinned_spec()]
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}

impl FromStr for PackageManager {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yarn" => Ok(Self::Yarn),
            "npm" => Ok(Self::Npm),
            "pnpm" => Ok(Self::Pnpm),
            other => Err(format!(
                "unknown package manager '{}': use yarn, npm or pnpm",
                other
            )),
        }
    }
}
