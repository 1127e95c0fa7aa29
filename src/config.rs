//! Optional YAML settings and credential checks.
//!
//! Credentials come from the environment (or `.env`) through clap. Everything
//! else has a default reproducing the standalone scripts and can be overridden
//! from `config.yaml`:
//!
//! ```yaml
//! state_dir: ~/sync-state
//! browser:
//!   command: firefox
//!   args: ["--new-tab"]
//! pocketcasts:
//!   tags: [podcast, pocketcasts]
//! todoist:
//!   labels: [readwise]
//!   due_string: tomorrow
//! ```

use crate::error::ConfigError;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

const APP_DIR: &str = "reader-sync";
const CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Directory for processed-id files; `$HOME` when unset.
    pub state_dir: Option<PathBuf>,
    pub browser: BrowserSettings,
    pub pocketcasts: ForwardSettings,
    pub mastodon: ForwardSettings,
    pub todoist: TodoistSettings,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct BrowserSettings {
    pub command: String,
    pub args: Vec<String>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            command: "firefox".to_string(),
            args: vec!["--new-tab".to_string()],
        }
    }
}

/// Settings for a command that saves items into Reader.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ForwardSettings {
    /// Tags put on saved documents; built-in tags when unset.
    pub tags: Option<Vec<String>>,
    pub state_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct TodoistSettings {
    pub labels: Vec<String>,
    pub due_string: String,
    pub state_file: Option<PathBuf>,
}

impl Default for TodoistSettings {
    fn default() -> Self {
        Self {
            labels: vec!["readwise".to_string(), "reader".to_string()],
            due_string: "today".to_string(),
            state_file: None,
        }
    }
}

/// The commands that keep a processed-id file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKind {
    Pocketcasts,
    Mastodon,
    Todoist,
}

impl StateKind {
    fn default_file_name(self) -> &'static str {
        match self {
            StateKind::Pocketcasts => ".pocketcasts_transferred",
            StateKind::Mastodon => ".mastodon_transferred",
            StateKind::Todoist => ".readwise_todoist_transferred",
        }
    }
}

impl Settings {
    /// Read settings from `path`, or from the default location when present.
    ///
    /// An explicit path must exist. A missing default file means defaults.
    #[instrument(level = "debug")]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match default_config_path() {
                Some(p) => (p, false),
                None => return Ok(Self::default()),
            },
        };

        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No settings file; using defaults");
                return Ok(Self::default());
            }
            Err(source) => return Err(ConfigError::ReadSettings { path, source }),
        };

        let settings = Self::parse(&text).map_err(|source| ConfigError::ParseSettings {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    pub fn parse(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    pub fn pocketcasts_tags(&self) -> Vec<String> {
        self.pocketcasts.tags.clone().unwrap_or_else(|| {
            to_strings(&["podcast", "friday", "pocketcasts", "pocketcasts-to-readwise"])
        })
    }

    pub fn mastodon_tags(&self) -> Vec<String> {
        self.mastodon.tags.clone().unwrap_or_else(|| {
            to_strings(&["mastodon", "bookmark", "social", "mastodon-to-readwise"])
        })
    }

    /// Processed-id file for `kind`.
    pub fn state_path(&self, kind: StateKind) -> Result<PathBuf, ConfigError> {
        let explicit = match kind {
            StateKind::Pocketcasts => &self.pocketcasts.state_file,
            StateKind::Mastodon => &self.mastodon.state_file,
            StateKind::Todoist => &self.todoist.state_file,
        };
        if let Some(path) = explicit {
            return Ok(expand_home(path));
        }
        let dir = match &self.state_dir {
            Some(dir) => expand_home(dir),
            None => home_dir().ok_or(ConfigError::NoHomeDir)?,
        };
        Ok(dir.join(kind.default_file_name()))
    }
}

/// The credential's value, unless absent or blank.
pub fn require<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, ConfigError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingCredential(name))
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

fn default_config_path() -> Option<PathBuf> {
    let base = env::var_os("XDG_CONFIG_HOME")
        .filter(|d| !d.is_empty())
        .map(PathBuf::from)
        .or_else(|| home_dir().map(|h| h.join(".config")))?;
    Some(base.join(APP_DIR).join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_settings_use_defaults() {
        let s = Settings::parse("").unwrap();
        assert_eq!(s, Settings::default());
        assert_eq!(s.browser.command, "firefox");
        assert_eq!(s.todoist.labels, vec!["readwise", "reader"]);
        assert_eq!(s.todoist.due_string, "today");
        assert_eq!(s.pocketcasts_tags()[0], "podcast");
        assert!(s.mastodon_tags().contains(&"mastodon-to-readwise".to_string()));
    }

    #[test]
    fn test_partial_settings_keep_other_defaults() {
        let s = Settings::parse(
            "state_dir: /var/lib/sync\nbrowser:\n  command: chromium\nmastodon:\n  tags: [fedi]\n",
        )
        .unwrap();
        assert_eq!(s.browser.command, "chromium");
        assert_eq!(s.browser.args, vec!["--new-tab"]);
        assert_eq!(s.mastodon_tags(), vec!["fedi"]);
        assert_eq!(s.pocketcasts_tags().len(), 4);
        assert_eq!(
            s.state_path(StateKind::Mastodon).unwrap(),
            PathBuf::from("/var/lib/sync/.mastodon_transferred")
        );
    }

    #[test]
    fn test_explicit_state_file_wins() {
        let s = Settings::parse("state_dir: /a\ntodoist:\n  state_file: /b/todo.txt\n").unwrap();
        assert_eq!(s.state_path(StateKind::Todoist).unwrap(), PathBuf::from("/b/todo.txt"));
        assert_eq!(
            s.state_path(StateKind::Pocketcasts).unwrap(),
            PathBuf::from("/a/.pocketcasts_transferred")
        );
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        assert!(Settings::parse("browser: [unclosed").is_err());
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load(Some(&dir.path().join("nope.yaml"))).unwrap_err();
        assert!(matches!(err, ConfigError::ReadSettings { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "todoist:\n  due_string: tomorrow\n").unwrap();
        let s = Settings::load(Some(&path)).unwrap();
        assert_eq!(s.todoist.due_string, "tomorrow");
    }

    #[test]
    fn test_require_rejects_blank() {
        assert_eq!(require(&Some(" tok ".into()), "READWISE_TOKEN").unwrap(), "tok");
        assert!(matches!(
            require(&Some("  ".into()), "READWISE_TOKEN"),
            Err(ConfigError::MissingCredential("READWISE_TOKEN"))
        ));
        assert!(require(&None, "TODOIST_TOKEN").is_err());
    }
}
