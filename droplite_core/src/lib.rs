use serde::{Deserialize, Serialize};

pub mod api;
pub mod models;

/// Extensions the server accepts for upload. Clients only use this as advice.
pub const ALLOWED_EXTENSIONS: [&str; 5] = [".txt", ".png", ".jpg", ".jpeg", ".json"];

pub trait StrConversion {
    fn from_str(value: &str) -> Self;
    fn as_str(&self) -> &'static str;
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Default)]
#[serde(from = "String", into = "String")]
pub enum ThemeMode {
    #[default]
    Dark,
    Light,
}

impl ThemeMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }
}

impl std::fmt::Display for ThemeMode {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(fmt, "{}", self.as_str())
    }
}
impl StrConversion for ThemeMode {
    fn from_str(value: &str) -> Self {
        match value {
            "light" => Self::Light,
            _ => Self::Dark,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Light => "light",
        }
    }
}

impl From<String> for ThemeMode {
    fn from(value: String) -> Self {
        <Self as StrConversion>::from_str(&value)
    }
}

impl From<ThemeMode> for String {
    fn from(value: ThemeMode) -> Self {
        value.as_str().to_string()
    }
}

/// Coarse file classification, used for icons and upload content types.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum FileKind {
    Text,
    Image,
    Json,
    Unknown,
}

impl FileKind {
    pub fn from_filename(filename: &str) -> Self {
        let extension = match filename.rsplit_once('.') {
            Some((_, ext)) => ext.to_ascii_lowercase(),
            None => return Self::Unknown,
        };
        match extension.as_str() {
            "txt" => Self::Text,
            "png" | "jpg" | "jpeg" => Self::Image,
            "json" => Self::Json,
            _ => Self::Unknown,
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Self::Text => "📄",
            Self::Image => "🖼",
            Self::Json => "{}",
            Self::Unknown => "❔",
        }
    }

    /// Content type sent with an upload when nothing better is known.
    pub fn mime_type(&self, filename: &str) -> &'static str {
        match self {
            Self::Text => "text/plain",
            Self::Image if filename.to_ascii_lowercase().ends_with(".png") => "image/png",
            Self::Image => "image/jpeg",
            Self::Json => "application/json",
            Self::Unknown => "application/octet-stream",
        }
    }
}

/// Returns the lowercased extension (with its dot) if the server would accept it.
pub fn allowed_extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    let ext = format!(".{}", ext.to_ascii_lowercase());
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}
