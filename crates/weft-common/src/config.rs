use std::future::Future;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::WeftError;

pub const DEFAULT_THEME: &str = "light";
pub const DEFAULT_AUTHOR: &str = "Anonymous";

/// User-facing settings for the editor and its widgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Name of the selected theme.
    pub theme: SmolStr,
    /// Display name used as the local viewer of persisted widgets.
    pub author_name: String,
    /// Origin of the hosting app. Widget source links under it navigate in-app.
    pub app_origin: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: SmolStr::new_static(DEFAULT_THEME),
            author_name: DEFAULT_AUTHOR.to_owned(),
            app_origin: None,
        }
    }
}

impl Settings {
    /// Loads the settings from the provided loader.
    pub async fn load(loader: &impl Loader) -> Result<Self, WeftError> {
        Ok(loader.load().await?.normalized())
    }

    /// Saves the settings using the provided saver.
    pub async fn save(&self, saver: &impl Saver) -> Result<(), WeftError> {
        saver.save(self).await
    }

    /// Apply the same rules the setters apply, for values read from disk.
    pub fn normalized(mut self) -> Self {
        let name = std::mem::take(&mut self.author_name);
        self.set_author_name(&name);
        let origin = self.app_origin.take();
        self.set_app_origin(origin.as_deref());
        self
    }

    /// A blank name resets to the default author.
    pub fn set_author_name(&mut self, name: &str) {
        let name = name.trim();
        self.author_name = if name.is_empty() {
            tracing::debug!(target: "weft::config", "blank author name, using default");
            DEFAULT_AUTHOR.to_owned()
        } else {
            name.to_owned()
        };
    }

    /// Blank clears the origin; a trailing slash is dropped.
    pub fn set_app_origin(&mut self, origin: Option<&str>) {
        self.app_origin = origin
            .map(|o| o.trim().trim_end_matches('/'))
            .filter(|o| !o.is_empty())
            .map(str::to_owned);
    }
}

/// The trait for loading settings.
pub trait Loader {
    fn load(&self) -> impl Future<Output = Result<Settings, WeftError>> + Send;
}

/// The trait for saving settings.
pub trait Saver {
    fn save(&self, settings: &Settings) -> impl Future<Output = Result<(), WeftError>> + Send;
}

/// An implementation of [`Loader`] and [`Saver`] that reads and writes a settings file.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a new [`FileStore`] with the given path.
    ///
    /// The format is picked from the file extension: `.json` or `.toml`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn format(&self) -> Result<Format, WeftError> {
        match self.path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Format::Json),
            Some("toml") => Ok(Format::Toml),
            _ => Err(WeftError::UnsupportedFormat(self.path.clone())),
        }
    }
}

enum Format {
    Json,
    Toml,
}

impl Loader for FileStore {
    async fn load(&self) -> Result<Settings, WeftError> {
        let format = self.format()?;
        let raw = std::fs::read_to_string(&self.path).map_err(|e| WeftError::io(&self.path, e))?;
        match format {
            Format::Json => Ok(serde_json::from_str(&raw)?),
            Format::Toml => Ok(toml::from_str(&raw)?),
        }
    }
}

impl Saver for FileStore {
    async fn save(&self, settings: &Settings) -> Result<(), WeftError> {
        let raw = match self.format()? {
            Format::Json => serde_json::to_string_pretty(settings)?,
            Format::Toml => toml::to_string_pretty(settings)?,
        };
        std::fs::write(&self.path, raw).map_err(|e| WeftError::io(&self.path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_author_resets() {
        let mut settings = Settings::default();
        settings.set_author_name("  mira ");
        assert_eq!(settings.author_name, "mira");
        settings.set_author_name("   ");
        assert_eq!(settings.author_name, DEFAULT_AUTHOR);
    }

    #[test]
    fn app_origin_is_trimmed() {
        let mut settings = Settings::default();
        settings.set_app_origin(Some("https://notes.example/"));
        assert_eq!(settings.app_origin.as_deref(), Some("https://notes.example"));
        settings.set_app_origin(Some(" "));
        assert_eq!(settings.app_origin, None);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"theme":"dark"}"#).expect("valid json");
        assert_eq!(settings.theme, "dark");
        assert_eq!(settings.author_name, DEFAULT_AUTHOR);
        assert_eq!(settings.app_origin, None);
    }

    #[tokio::test]
    async fn load_normalizes_values_from_disk() {
        let dir = std::env::temp_dir().join(format!("weft-config-norm-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("settings.json");
        std::fs::write(&path, r#"{"author_name":"","app_origin":"https://a.example/"}"#).expect("write");

        let loaded = Settings::load(&FileStore::new(&path)).await.expect("load");
        assert_eq!(loaded.author_name, DEFAULT_AUTHOR);
        assert_eq!(loaded.app_origin.as_deref(), Some("https://a.example"));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn file_store_round_trips_toml() {
        let dir = std::env::temp_dir().join(format!("weft-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        let store = FileStore::new(dir.join("settings.toml"));

        let mut settings = Settings::default();
        settings.theme = SmolStr::new("dark");
        settings.set_app_origin(Some("https://notes.example"));
        settings.save(&store).await.expect("save");

        let loaded = Settings::load(&store).await.expect("load");
        assert_eq!(loaded, settings);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn unsupported_extension_is_an_error() {
        let store = FileStore::new("settings.yaml");
        let err = Settings::load(&store).await.expect_err("yaml is not supported");
        assert!(matches!(err, WeftError::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn missing_file_reports_not_found() {
        let store = FileStore::new("/definitely/not/here/settings.json");
        let err = Settings::load(&store).await.expect_err("missing");
        assert!(err.is_not_found());
    }
}
