use serde::{Deserialize, Serialize};

use crate::ThemeMode;

pub const DEFAULT_GRADIENT_FROM: &str = "#23272a";
pub const DEFAULT_GRADIENT_TO: &str = "#a5b4fc";

/// Two colour endpoints of the background gradient.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Gradient {
    pub from: String,
    pub to: String,
}

impl Gradient {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Gradient {
            from: from.into(),
            to: to.into(),
        }
    }
}

impl Default for Gradient {
    fn default() -> Self {
        Gradient::new(DEFAULT_GRADIENT_FROM, DEFAULT_GRADIENT_TO)
    }
}

/// Accepts `#rrggbb` (case-insensitive) and returns it lowercased.
pub fn parse_hex_color(value: &str) -> Result<String, String> {
    let digits = value
        .strip_prefix('#')
        .ok_or_else(|| format!("colour must start with '#': {value}"))?;
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("colour must look like #rrggbb: {value}"));
    }
    Ok(value.to_ascii_lowercase())
}

/// Persisted theme preferences, the body of `GET /theme` and `POST /theme`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ThemeConfig {
    pub theme: ThemeMode,
    pub gradient_from: String,
    pub gradient_to: String,
    pub gradient_on: bool,
}

impl ThemeConfig {
    pub fn gradient(&self) -> Gradient {
        Gradient::new(self.gradient_from.clone(), self.gradient_to.clone())
    }

    pub fn set_gradient(&mut self, gradient: Gradient) {
        self.gradient_from = gradient.from;
        self.gradient_to = gradient.to;
    }
}

impl Default for ThemeConfig {
    fn default() -> Self {
        ThemeConfig {
            theme: ThemeMode::Dark,
            gradient_from: DEFAULT_GRADIENT_FROM.to_string(),
            gradient_to: DEFAULT_GRADIENT_TO.to_string(),
            gradient_on: true,
        }
    }
}
