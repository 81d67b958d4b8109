//! Test-spec file selection
//!
//! Each spec file belongs to a check category derived from its file name
//! (`accessibility.cy.js` -> accessibility, `lighthouse.cy.js` ->
//! performance, ...). Excluded categories are simply not passed to the runner.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::DispatchError;

/// Category of checks a spec file performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckCategory {
    Accessibility,
    Seo,
    Visual,
    #[serde(alias = "lighthouse")]
    Performance,
    BrokenLinks,
    GeneralErrors,
}

impl CheckCategory {
    pub const ALL: [CheckCategory; 6] = [
        Self::Accessibility,
        Self::Seo,
        Self::Visual,
        Self::Performance,
        Self::BrokenLinks,
        Self::GeneralErrors,
    ];

    /// Categories skipped by a quick run
    pub const QUICK_EXCLUDES: [CheckCategory; 4] = [
        Self::Accessibility,
        Self::Seo,
        Self::Visual,
        Self::Performance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accessibility => "accessibility",
            Self::Seo => "seo",
            Self::Visual => "visual",
            Self::Performance => "performance",
            Self::BrokenLinks => "broken-links",
            Self::GeneralErrors => "general-errors",
        }
    }

    /// Lower-cased file-name stem of the spec files in this category
    fn file_key(&self) -> &'static str {
        match self {
            Self::Accessibility => "accessibility",
            Self::Seo => "seo",
            Self::Visual => "visual",
            Self::Performance => "lighthouse",
            Self::BrokenLinks => "brokenlinks",
            Self::GeneralErrors => "generalerrors",
        }
    }

    /// Category of a spec file, `None` for uncategorized files
    pub fn of_file(file_name: &str) -> Option<Self> {
        let stem = file_name.split('.').next()?.to_lowercase();
        Self::ALL.into_iter().find(|c| c.file_key() == stem)
    }
}

impl fmt::Display for CheckCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CheckCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "accessibility" | "a11y" => Ok(Self::Accessibility),
            "seo" => Ok(Self::Seo),
            "visual" => Ok(Self::Visual),
            "performance" | "lighthouse" => Ok(Self::Performance),
            "broken-links" | "brokenlinks" | "links" => Ok(Self::BrokenLinks),
            "general-errors" | "generalerrors" | "errors" => Ok(Self::GeneralErrors),
            other => Err(format!(
                "Unknown check category '{other}'. Valid options: {}",
                Self::ALL.map(|c| c.as_str()).join(", ")
            )),
        }
    }
}

/// List the spec files in `spec_dir`, sorted by name, without those whose
/// category is excluded
///
/// `listing_root` is where `spec_dir` is resolved for listing (the runner's
/// working directory); returned paths stay relative to it.
///
/// # Errors
///
/// - `DispatchError::SpecDir` if the directory cannot be read
/// - `DispatchError::NoSpecFiles` if nothing is left to run
pub fn select_spec_files(
    listing_root: Option<&Path>,
    spec_dir: &Path,
    excluded: &[CheckCategory],
) -> Result<Vec<PathBuf>, DispatchError> {
    let listing_dir = match listing_root {
        Some(root) if spec_dir.is_relative() => root.join(spec_dir),
        _ => spec_dir.to_path_buf(),
    };

    let entries = std::fs::read_dir(&listing_dir).map_err(|source| DispatchError::SpecDir {
        dir: listing_dir.clone(),
        source,
    })?;

    let mut names: Vec<String> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| DispatchError::SpecDir {
            dir: listing_dir.clone(),
            source,
        })?;
        if !entry.path().is_file() {
            continue;
        }
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();

    let selected: Vec<PathBuf> = names
        .into_iter()
        .filter(|name| match CheckCategory::of_file(name) {
            Some(category) if excluded.contains(&category) => {
                tracing::debug!(spec = %name, category = %category, "Excluding spec file");
                false
            }
            _ => true,
        })
        .map(|name| spec_dir.join(name))
        .collect();

    if selected.is_empty() {
        return Err(DispatchError::NoSpecFiles { dir: listing_dir });
    }

    Ok(selected)
}
