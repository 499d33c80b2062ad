//! Configuration file loading and run settings.
//!
//! The optional config file uses a small `key = value` syntax with `#`
//! comments. Values from the file are defaults; command-line flags override
//! them.
//!
//! ```text
//! download_dir = "/data/feeds"
//! overwrite_files = false
//! url_blacklist = "tracker.example|ads.example"
//! verbosity = "verbose"
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use crate::download::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use crate::url_filter::UrlFilter;

/// Default download root, relative to the working directory.
pub const DEFAULT_DOWNLOAD_DIR: &str = "downloads";

/// Default plugin manifest directory, relative to the working directory.
pub const DEFAULT_PLUGINS_DIR: &str = "plugins";

const CONFIG_DIR_NAME: &str = "feed-downloader";

/// Values read from the config file. `None` means "not set in the file".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Root directory for downloads.
    pub download_dir: Option<PathBuf>,
    /// Replace existing non-empty files.
    pub overwrite_files: Option<bool>,
    /// Pipe-delimited URL deny-list.
    pub url_blacklist: Option<String>,
    /// Directory holding plugin manifests.
    pub plugins_dir: Option<PathBuf>,
    /// HTTP connect timeout in seconds.
    pub connect_timeout_secs: Option<u64>,
    /// HTTP read timeout in seconds.
    pub read_timeout_secs: Option<u64>,
    /// Default verbosity mode.
    pub verbosity: Option<VerbositySetting>,
}

impl FileConfig {
    /// Validates config values against runtime constraints.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first out-of-range key.
    pub fn validate(&self) -> Result<()> {
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;
        Ok(())
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

/// Supported config verbosity labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbositySetting {
    /// Info-level logging.
    Default,
    /// Debug-level logging.
    Verbose,
    /// Errors only.
    Quiet,
    /// Trace-level logging.
    Debug,
}

impl VerbositySetting {
    /// Returns the tracing filter directive for this setting.
    #[must_use]
    pub fn log_level(self) -> &'static str {
        match self {
            Self::Default => "info",
            Self::Verbose => "debug",
            Self::Quiet => "error",
            Self::Debug => "trace",
        }
    }
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
}

impl LoadedConfig {
    /// Returns true when a config file was read from disk.
    #[must_use]
    pub fn loaded_from_file(&self) -> bool {
        self.config.is_some()
    }
}

/// Effective settings for a download run after merging all sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    /// Root directory for downloads.
    pub download_dir: PathBuf,
    /// Replace existing non-empty files.
    pub overwrite_files: bool,
    /// URL deny-list.
    pub url_blacklist: UrlFilter,
    /// Directory holding plugin manifests.
    pub plugins_dir: PathBuf,
    /// HTTP connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// HTTP read timeout in seconds.
    pub read_timeout_secs: u64,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from(DEFAULT_DOWNLOAD_DIR),
            overwrite_files: false,
            url_blacklist: UrlFilter::default(),
            plugins_dir: PathBuf::from(DEFAULT_PLUGINS_DIR),
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            read_timeout_secs: READ_TIMEOUT_SECS,
        }
    }
}

impl RunSettings {
    /// Builds settings from defaults overlaid with file values.
    #[must_use]
    pub fn from_file_config(file: Option<&FileConfig>) -> Self {
        let mut settings = Self::default();
        let Some(file) = file else {
            return settings;
        };

        if let Some(dir) = &file.download_dir {
            settings.download_dir.clone_from(dir);
        }
        if let Some(overwrite) = file.overwrite_files {
            settings.overwrite_files = overwrite;
        }
        if let Some(list) = &file.url_blacklist {
            settings.url_blacklist = UrlFilter::from_delimited(list);
        }
        if let Some(dir) = &file.plugins_dir {
            settings.plugins_dir.clone_from(dir);
        }
        if let Some(secs) = file.connect_timeout_secs {
            settings.connect_timeout_secs = secs;
        }
        if let Some(secs) = file.read_timeout_secs {
            settings.read_timeout_secs = secs;
        }
        settings
    }
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/feed-downloader/config.toml`
/// 2. `$HOME/.config/feed-downloader/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join(CONFIG_DIR_NAME)
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join(CONFIG_DIR_NAME)
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from the default path if present.
///
/// # Errors
///
/// Returns an error when the file exists but cannot be read or parsed.
pub fn load_default_file_config() -> Result<LoadedConfig> {
    let path = resolve_default_config_path();
    let Some(path_ref) = path.as_deref() else {
        return Ok(LoadedConfig { path, config: None });
    };

    if !path_ref.exists() {
        return Ok(LoadedConfig { path, config: None });
    }

    let config = load_file_config(path_ref)?;
    Ok(LoadedConfig {
        path,
        config: Some(config),
    })
}

/// Loads and validates a config file.
///
/// # Errors
///
/// Returns an error when the file cannot be read or contains invalid entries.
pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!(
                "Invalid config syntax on line {}: expected key = value",
                line_index + 1
            );
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let invalid = || format!("Invalid `{key}` value on line {}", line_index + 1);

        match key {
            "download_dir" => {
                cfg.download_dir = Some(PathBuf::from(
                    parse_string_literal(value).with_context(invalid)?,
                ));
            }
            "overwrite_files" => {
                cfg.overwrite_files = Some(parse_boolean(value).with_context(invalid)?);
            }
            "url_blacklist" => {
                cfg.url_blacklist = Some(parse_string_literal(value).with_context(invalid)?);
            }
            "plugins_dir" => {
                cfg.plugins_dir = Some(PathBuf::from(
                    parse_string_literal(value).with_context(invalid)?,
                ));
            }
            "connect_timeout_secs" => {
                cfg.connect_timeout_secs = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "read_timeout_secs" => {
                cfg.read_timeout_secs = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "verbosity" => {
                let parsed = parse_string_literal(value).with_context(invalid)?;
                cfg.verbosity = Some(parse_verbosity(&parsed).with_context(|| {
                    format!(
                        "Invalid `verbosity` value '{}' on line {}",
                        parsed,
                        line_index + 1
                    )
                })?);
            }
            unknown => {
                bail!(
                    "Unknown configuration key: '{}' on line {}",
                    unknown,
                    line_index + 1
                );
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_verbosity(value: &str) -> Result<VerbositySetting> {
    match value {
        "default" => Ok(VerbositySetting::Default),
        "verbose" => Ok(VerbositySetting::Verbose),
        "quiet" => Ok(VerbositySetting::Quiet),
        "debug" => Ok(VerbositySetting::Debug),
        _ => bail!("Expected one of: default, verbose, quiet, debug"),
    }
}

fn parse_boolean(raw_value: &str) -> Result<bool> {
    match raw_value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => bail!("Expected 'true' or 'false'"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_parse_config_all_fields() {
        let cfg = parse_config_str(
            r#"
download_dir = "/data/feeds"
overwrite_files = true
url_blacklist = "tracker.example|ads.example"
plugins_dir = "/opt/feed-downloader/plugins"
connect_timeout_secs = 10
read_timeout_secs = 600
verbosity = "verbose"
"#,
        )
        .unwrap();
        assert_eq!(cfg.download_dir, Some(PathBuf::from("/data/feeds")));
        assert_eq!(cfg.overwrite_files, Some(true));
        assert_eq!(
            cfg.url_blacklist.as_deref(),
            Some("tracker.example|ads.example")
        );
        assert_eq!(
            cfg.plugins_dir,
            Some(PathBuf::from("/opt/feed-downloader/plugins"))
        );
        assert_eq!(cfg.connect_timeout_secs, Some(10));
        assert_eq!(cfg.read_timeout_secs, Some(600));
        assert_eq!(cfg.verbosity, Some(VerbositySetting::Verbose));
    }

    #[test]
    fn test_parse_config_supports_inline_comments() {
        let cfg = parse_config_str(
            r##"
overwrite_files = false # keep what is there
url_blacklist = "a.example#frag" # hash inside string is kept
"##,
        )
        .unwrap();
        assert_eq!(cfg.overwrite_files, Some(false));
        assert_eq!(cfg.url_blacklist.as_deref(), Some("a.example#frag"));
    }

    #[test]
    fn test_parse_config_rejects_unknown_keys() {
        let err = parse_config_str("concurrency = 4").unwrap_err();
        assert!(err.to_string().contains("Unknown configuration key"));
        assert!(err.to_string().contains("concurrency"));
    }

    #[test]
    fn test_parse_config_rejects_invalid_boolean() {
        let err = parse_config_str("overwrite_files = yes").unwrap_err();
        assert!(err.to_string().contains("overwrite_files"));
    }

    #[test]
    fn test_parse_config_rejects_unquoted_string() {
        let err = parse_config_str("download_dir = /data").unwrap_err();
        assert!(err.to_string().contains("download_dir"));
    }

    #[test]
    fn test_parse_config_rejects_timeout_out_of_range() {
        let err = parse_config_str("read_timeout_secs = 0").unwrap_err();
        assert!(err.to_string().contains("read_timeout_secs"));
        let err = parse_config_str("connect_timeout_secs = 3601").unwrap_err();
        assert!(err.to_string().contains("connect_timeout_secs"));
    }

    #[test]
    fn test_parse_config_rejects_missing_equals() {
        let err = parse_config_str("overwrite_files").unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_run_settings_defaults() {
        let settings = RunSettings::from_file_config(None);
        assert_eq!(settings.download_dir, PathBuf::from("downloads"));
        assert_eq!(settings.plugins_dir, PathBuf::from("plugins"));
        assert!(!settings.overwrite_files);
        assert_eq!(settings.url_blacklist, UrlFilter::default());
        assert_eq!(settings.connect_timeout_secs, 30);
        assert_eq!(settings.read_timeout_secs, 300);
    }

    #[test]
    fn test_run_settings_overlay_file_values() {
        let file = FileConfig {
            overwrite_files: Some(true),
            url_blacklist: Some("a.example||b.example ".to_string()),
            read_timeout_secs: Some(60),
            ..FileConfig::default()
        };
        let settings = RunSettings::from_file_config(Some(&file));
        assert!(settings.overwrite_files);
        assert_eq!(
            settings.url_blacklist,
            UrlFilter::new(["a.example", "b.example"])
        );
        assert_eq!(settings.read_timeout_secs, 60);
        assert_eq!(settings.download_dir, PathBuf::from("downloads"));
    }

    #[test]
    fn test_verbosity_log_levels() {
        assert_eq!(VerbositySetting::Default.log_level(), "info");
        assert_eq!(VerbositySetting::Verbose.log_level(), "debug");
        assert_eq!(VerbositySetting::Quiet.log_level(), "error");
        assert_eq!(VerbositySetting::Debug.log_level(), "trace");
    }

    #[test]
    fn test_load_file_config_reports_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "bogus = 1\n").unwrap();

        let err = load_file_config(&path).unwrap_err();
        assert!(format!("{err:#}").contains("config.toml"));
    }

    #[test]
    fn test_load_default_file_config_from_xdg_dir() {
        let temp = TempDir::new().unwrap();
        let config_dir = temp.path().join(CONFIG_DIR_NAME);
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(config_dir.join("config.toml"), "overwrite_files = true\n").unwrap();

        let prev = std::env::var_os("XDG_CONFIG_HOME");
        // SAFETY: the only test in this crate that touches XDG_CONFIG_HOME.
        unsafe { std::env::set_var("XDG_CONFIG_HOME", temp.path()) };
        let _restore = RestoreEnv::new("XDG_CONFIG_HOME", prev);

        let loaded = load_default_file_config().unwrap();
        assert!(loaded.loaded_from_file());
        assert_eq!(loaded.config.unwrap().overwrite_files, Some(true));
    }

    struct RestoreEnv {
        key: &'static str,
        value: Option<std::ffi::OsString>,
    }

    impl RestoreEnv {
        fn new(key: &'static str, value: Option<std::ffi::OsString>) -> Self {
            Self { key, value }
        }
    }

    impl Drop for RestoreEnv {
        fn drop(&mut self) {
            // SAFETY: test restores env to prior state.
            match &self.value {
                Some(v) => unsafe { std::env::set_var(self.key, v) },
                None => unsafe { std::env::remove_var(self.key) },
            }
        }
    }
}
