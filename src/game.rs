use serde::{Deserialize, Serialize};

pub const GAME_NAME: &str = "TWLoader";

/// Install target the whole app operates against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    #[serde(rename = "plus")]
    Plus,
    #[serde(rename = "plusup")]
    PlusUp,
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Plus
    }
}

impl Mode {
    pub const ALL: [Mode; 2] = [Mode::Plus, Mode::PlusUp];

    pub fn display_name(self) -> &'static str {
        match self {
            Mode::Plus => "PLUS",
            Mode::PlusUp => "PLUSUP",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Plus => "plus",
            Mode::PlusUp => "plusup",
        }
    }

    pub fn install_dir(self) -> &'static str {
        match self {
            Mode::Plus => "Plus",
            Mode::PlusUp => "PlusUP",
        }
    }

    pub fn other(self) -> Mode {
        match self {
            Mode::Plus => Mode::PlusUp,
            Mode::PlusUp => Mode::Plus,
        }
    }
}

/// Where the game lives, as reported by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathConfig {
    pub custom_path: Option<String>,
    pub default_path_exists: bool,
    pub plus_exists: bool,
    pub plus_up_exists: bool,
}

impl PathConfig {
    pub fn has_usable_path(&self) -> bool {
        self.custom_path.is_some() || self.default_path_exists
    }

    pub fn mode_installed(&self, mode: Mode) -> bool {
        match mode {
            Mode::Plus => self.plus_exists,
            Mode::PlusUp => self.plus_up_exists,
        }
    }

    pub fn any_mode_installed(&self) -> bool {
        self.plus_exists || self.plus_up_exists
    }

    /// Path label shown above the catalog.
    pub fn target_display(&self, mode: Mode) -> String {
        if !self.has_usable_path() {
            return "Target path: not set".to_string();
        }
        let base = self
            .custom_path
            .as_deref()
            .unwrap_or("(default location)");
        format!("Target path: {base}\\{}\\edata", mode.install_dir())
    }
}

/// Treats an empty string from the backend the same as no custom path.
pub fn normalize_custom_path(raw: Option<String>) -> Option<String> {
    raw.map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usable_path_needs_custom_or_default() {
        let mut paths = PathConfig::default();
        assert!(!paths.has_usable_path());
        assert_eq!(paths.target_display(Mode::Plus), "Target path: not set");

        paths.default_path_exists = true;
        assert!(paths.has_usable_path());
        assert_eq!(
            paths.target_display(Mode::PlusUp),
            "Target path: (default location)\\PlusUP\\edata"
        );

        paths.default_path_exists = false;
        paths.custom_path = Some("D:\\Games\\TW".to_string());
        assert_eq!(
            paths.target_display(Mode::Plus),
            "Target path: D:\\Games\\TW\\Plus\\edata"
        );
    }

    #[test]
    fn blank_custom_path_is_none() {
        assert_eq!(normalize_custom_path(Some("  ".to_string())), None);
        assert_eq!(
            normalize_custom_path(Some("C:\\TW".to_string())),
            Some("C:\\TW".to_string())
        );
    }

    #[test]
    fn mode_wire_names() {
        assert_eq!(serde_json::to_string(&Mode::PlusUp).expect("json"), "\"plusup\"");
        let mode: Mode = serde_json::from_str("\"plus\"").expect("mode");
        assert_eq!(mode, Mode::Plus);
    }
}
