//! Device preferences model

use serde::{Deserialize, Serialize};

/// Language used when none has been chosen
pub const DEFAULT_LANGUAGE: &str = "en";

/// Theme mode options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    /// Light theme
    #[default]
    Light,
    /// Dark theme
    Dark,
}

impl ThemeMode {
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    /// Parse a stored theme value, ignoring case and whitespace
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }
}

/// Device-level preferences, kept outside the per-user report namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub theme: ThemeMode,
    /// Language code (e.g., "en")
    pub language: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: ThemeMode::Light,
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preferences_default() {
        let preferences = Preferences::default();
        assert_eq!(preferences.theme, ThemeMode::Light);
        assert_eq!(preferences.language, "en");
    }

    #[test]
    fn theme_parse_and_toggle() {
        assert_eq!(ThemeMode::parse(" Dark "), Some(ThemeMode::Dark));
        assert_eq!(ThemeMode::parse("system"), None);
        assert_eq!(ThemeMode::Light.toggled(), ThemeMode::Dark);
    }
}
