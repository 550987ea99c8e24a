pub mod autodj;
pub mod beatgrid;
pub mod config;
pub mod db;
pub mod mixer;
pub mod scanner;
pub mod scoring;
pub mod session;
pub mod settings;

/// Audio file extensions we catalog
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "mp3", "flac", "ogg", "opus", "wav", "aif", "aiff", "m4a", "aac",
];

/// Application name for XDG paths
pub const APP_NAME: &str = "autodj";
