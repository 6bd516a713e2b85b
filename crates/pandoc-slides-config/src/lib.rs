use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

/// User settings for previews and exports.
///
/// Every field has a default so a config file only needs to name the
/// settings it changes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Program used to convert documents
    pub pandoc_path: PathBuf,
    /// Re-render the preview whenever the paired document is saved
    pub compile_on_save: bool,
    /// Offer "Jump to slide" lenses in the editor after each render
    pub show_navigation_code_lenses: bool,
    /// Template used when the document's front matter names none
    pub template: Option<PathBuf>,
    /// Where the renderer bootstrap script is written
    pub assets_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pandoc_path: PathBuf::from("pandoc"),
            compile_on_save: true,
            show_navigation_code_lenses: true,
            template: None,
            assets_dir: None,
        }
    }
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        // Expand shell variables and tilde in configured paths
        config.pandoc_path = Self::expand_path(&config.pandoc_path).unwrap_or(config.pandoc_path);
        config.template = config
            .template
            .map(|path| Self::expand_path(&path).unwrap_or(path));
        config.assets_dir = config
            .assets_dir
            .map(|path| Self::expand_path(&path).unwrap_or(path));

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    /// Load the config file if there is one, falling back to defaults.
    pub fn load_or_default() -> Result<Self, ConfigError> {
        Ok(Self::load()?.unwrap_or_default())
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/pandoc-slides");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    /// Directory the bootstrap script is materialized into.
    pub fn assets_dir(&self) -> PathBuf {
        match &self.assets_dir {
            Some(dir) => dir.clone(),
            None => PathBuf::from(shellexpand::tilde("~/.cache/pandoc-slides").as_ref()),
        }
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_config_path() {
        let config_path = Config::config_path();
        let path_str = config_path.to_string_lossy();

        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".config/pandoc-slides/config.toml"));
    }

    #[test]
    fn test_defaults_match_extension_settings() {
        let config = Config::default();

        assert_eq!(config.pandoc_path, PathBuf::from("pandoc"));
        assert!(config.compile_on_save);
        assert!(config.show_navigation_code_lenses);
        assert!(config.template.is_none());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str("compile_on_save = false\n").unwrap();

        assert!(!config.compile_on_save);
        assert!(config.show_navigation_code_lenses);
        assert_eq!(config.pandoc_path, PathBuf::from("pandoc"));
    }

    #[test]
    fn test_expand_path_with_env_var() {
        unsafe {
            env::set_var("PANDOC_SLIDES_TEST_VAR", "/test/env/path");
        }

        let path = PathBuf::from("$PANDOC_SLIDES_TEST_VAR/subdir");
        let expanded = Config::expand_path(&path);

        assert_eq!(expanded, Some(PathBuf::from("/test/env/path/subdir")));

        unsafe {
            env::remove_var("PANDOC_SLIDES_TEST_VAR");
        }
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let expanded = Config::expand_path(&PathBuf::from("~/templates/deck.revealjs")).unwrap();

        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().ends_with("templates/deck.revealjs"));
    }

    #[test]
    fn test_assets_dir_prefers_configured_value() {
        let config = Config {
            assets_dir: Some(PathBuf::from("/opt/slides-assets")),
            ..Config::default()
        };
        assert_eq!(config.assets_dir(), PathBuf::from("/opt/slides-assets"));

        let fallback = Config::default().assets_dir();
        assert!(fallback.ends_with(".cache/pandoc-slides"));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let non_existent_config = temp_dir.path().join("nonexistent.toml");

        let result = Config::load_from_path(&non_existent_config).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_load_invalid_config_reports_path() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "compile_on_save = \"sometimes\"").unwrap();

        let error = Config::load_from_path(&config_file).unwrap_err();

        assert!(matches!(error, ConfigError::ConfigParseError { .. }));
        assert!(error.to_string().contains("config.toml"));
    }

    #[test]
    fn test_load_full_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(
            &config_file,
            r#"pandoc_path = "/usr/local/bin/pandoc"
compile_on_save = false
show_navigation_code_lenses = false
template = "/tmp/deck.revealjs"
"#,
        )
        .unwrap();

        let loaded_config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(
            loaded_config,
            Config {
                pandoc_path: PathBuf::from("/usr/local/bin/pandoc"),
                compile_on_save: false,
                show_navigation_code_lenses: false,
                template: Some(PathBuf::from("/tmp/deck.revealjs")),
                assets_dir: None,
            }
        );
    }
}
