pub mod files;
pub mod theme;
