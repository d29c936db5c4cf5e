//! Settings file for javaflow.
//!
//! Every key is optional; a missing file behaves like an empty one.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::render::Theme;

/// Settings file names searched for in the working directory, in order.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["javaflow.yaml", ".javaflow.yaml"];

/// Contents of the file written by `javaflow init`.
pub const DEFAULT_TEMPLATE: &str = include_str!("templates/default.yaml");

/// Top-level settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Placeholder class wrapped around bare statement snippets.
    pub wrapper_class: String,
    /// Maximum characters quoted per annotated source line.
    pub max_line_chars: usize,
    pub theme: Theme,
    /// Glob patterns for paths to exclude from directory walks (e.g., "**/generated/**")
    pub excluded_paths: Vec<String>,
    /// Translate constructors as standalone subgraphs.
    pub include_constructors: bool,
    pub comment_batch_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            wrapper_class: "Snippet".to_string(),
            max_line_chars: 100,
            theme: Theme::Light,
            excluded_paths: Vec::new(),
            include_constructors: true,
            comment_batch_size: 8,
        }
    }
}

impl Settings {
    /// Parse settings from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::parse_str(&content)
    }

    pub fn parse_str(content: &str) -> anyhow::Result<Self> {
        // An empty document deserializes as null.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Settings = serde_yaml::from_str(content)?;
        Ok(settings)
    }

    /// Check if a path should be excluded based on excluded_paths patterns.
    /// Uses globset for matching, which supports `**` for recursive directory matching.
    pub fn is_path_excluded(&self, path: &Path) -> bool {
        if self.excluded_paths.is_empty() {
            return false;
        }

        let path_str = path.to_string_lossy();
        self.excluded_paths.iter().any(|pattern| {
            globset::Glob::new(pattern)
                .map(|glob| glob.compile_matcher().is_match(&*path_str))
                .unwrap_or(false)
        })
    }

    /// Validate settings for correctness.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !is_java_identifier(&self.wrapper_class) {
            anyhow::bail!(
                "invalid wrapper_class {:?}, must be a Java identifier",
                self.wrapper_class
            );
        }
        if self.max_line_chars == 0 {
            anyhow::bail!("max_line_chars must be greater than 0");
        }
        if self.comment_batch_size == 0 {
            anyhow::bail!("comment_batch_size must be greater than 0");
        }
        for pattern in &self.excluded_paths {
            globset::Glob::new(pattern).map_err(|e| {
                anyhow::anyhow!("invalid excluded_paths pattern {:?}: {}", pattern, e)
            })?;
        }
        Ok(())
    }
}

fn is_java_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Find a settings file in `dir`.
pub fn discover(dir: &Path) -> Option<PathBuf> {
    DEFAULT_CONFIG_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Load settings from an explicit path, else from a discovered file, else
/// defaults. The result is validated.
pub fn load(explicit: Option<&Path>, dir: &Path) -> anyhow::Result<Settings> {
    let path = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => discover(dir),
    };
    let settings = match path {
        Some(p) => {
            tracing::debug!(path = %p.display(), "loading settings");
            Settings::parse_file(&p)
                .map_err(|e| anyhow::anyhow!("failed to parse {}: {}", p.display(), e))?
        }
        None => Settings::default(),
    };
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_settings() {
        let yaml = r#"
wrapper_class: Wrapper
max_line_chars: 60
theme: dark
excluded_paths:
  - "**/gen/**"
"#;
        let settings = Settings::parse_str(yaml).unwrap();
        assert_eq!(settings.wrapper_class, "Wrapper");
        assert_eq!(settings.max_line_chars, 60);
        assert_eq!(settings.theme, Theme::Dark);
        assert_eq!(settings.excluded_paths.len(), 1);
        // Unset keys keep their defaults.
        assert!(settings.include_constructors);
        assert_eq!(settings.comment_batch_size, 8);
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(Settings::parse_str("").unwrap(), Settings::default());
    }

    #[test]
    fn test_default_template_is_valid() {
        let settings = Settings::parse_str(DEFAULT_TEMPLATE).unwrap();
        settings.validate().unwrap();
        assert_eq!(settings.wrapper_class, "Snippet");
        assert!(settings.is_path_excluded(Path::new("app/build/Gen.java")));
    }

    #[test]
    fn test_validate() {
        let mut settings = Settings::default();
        assert!(settings.validate().is_ok());

        settings.wrapper_class = "1Bad".to_string();
        assert!(settings.validate().is_err());

        settings = Settings {
            max_line_chars: 0,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());

        settings = Settings {
            excluded_paths: vec!["[".to_string()],
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_is_path_excluded() {
        let settings = Settings {
            excluded_paths: vec!["**/generated/**".to_string()],
            ..Settings::default()
        };
        assert!(settings.is_path_excluded(Path::new("src/generated/Foo.java")));
        assert!(!settings.is_path_excluded(Path::new("src/main/Foo.java")));
    }

    #[test]
    fn test_discover_and_load() {
        let dir = TempDir::new().unwrap();
        assert!(discover(dir.path()).is_none());
        assert_eq!(load(None, dir.path()).unwrap(), Settings::default());

        fs::write(dir.path().join(".javaflow.yaml"), "max_line_chars: 42\n").unwrap();
        let found = discover(dir.path()).unwrap();
        assert!(found.ends_with(".javaflow.yaml"));
        assert_eq!(load(None, dir.path()).unwrap().max_line_chars, 42);

        let explicit = dir.path().join("custom.yaml");
        fs::write(&explicit, "wrapper_class: \"not valid\"\n").unwrap();
        assert!(load(Some(&explicit), dir.path()).is_err());
    }
}
