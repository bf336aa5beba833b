use crate::core::JudgeKind;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub judging: JudgingSettings,
    #[serde(default)]
    pub bot: BotSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Like and pass acknowledgements get a much shorter budget
    #[serde(default = "default_swipe_timeout_ms")]
    pub swipe_timeout_ms: u64,
    #[serde(default = "default_recs_count")]
    pub recs_count: u32,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            swipe_timeout_ms: default_swipe_timeout_ms(),
            recs_count: default_recs_count(),
        }
    }
}

fn default_base_url() -> String { "https://api.gotinder.com".to_string() }
fn default_timeout_secs() -> u64 { 30 }
fn default_swipe_timeout_ms() -> u64 { 700 }
fn default_recs_count() -> u32 { 1 }

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Directory holding the `<field>_<category>_words.json` lists
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_credentials_file")]
    pub credentials_file: PathBuf,
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            credentials_file: default_credentials_file(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

fn default_data_dir() -> PathBuf { PathBuf::from("json") }
fn default_credentials_file() -> PathBuf { PathBuf::from("json/secrets.json") }
fn default_lock_timeout_ms() -> u64 { 2000 }

#[derive(Debug, Clone, Deserialize)]
pub struct JudgingSettings {
    #[serde(default = "default_too_close_km")]
    pub too_close_km: u32,
    #[serde(default = "default_too_far_km")]
    pub too_far_km: u32,
    /// Word judges from highest to lowest priority
    #[serde(default = "default_judges")]
    pub judges: Vec<JudgeKind>,
}

impl Default for JudgingSettings {
    fn default() -> Self {
        Self {
            too_close_km: default_too_close_km(),
            too_far_km: default_too_far_km(),
            judges: default_judges(),
        }
    }
}

fn default_too_close_km() -> u32 { 20 }
fn default_too_far_km() -> u32 { 200 }
fn default_judges() -> Vec<JudgeKind> { vec![JudgeKind::School, JudgeKind::Name, JudgeKind::Bio] }

#[derive(Debug, Clone, Deserialize)]
pub struct BotSettings {
    #[serde(default = "default_max_batches")]
    pub max_batches: u32,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            max_batches: default_max_batches(),
        }
    }
}

fn default_max_batches() -> u32 { 30 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the structs
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with SWIPE_)
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., SWIPE__JUDGING__TOO_FAR_KM -> judging.too_far_km
            .add_source(environment())
            .build()?
            .try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(environment())
            .build()?
            .try_deserialize()
    }
}

fn environment() -> Environment {
    Environment::with_prefix("SWIPE")
        .prefix_separator("__")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("judging.judges")
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.api.base_url, "https://api.gotinder.com");
        assert_eq!(settings.api.swipe_timeout_ms, 700);
        assert_eq!(settings.judging.too_close_km, 20);
        assert_eq!(settings.judging.too_far_km, 200);
        assert_eq!(
            settings.judging.judges,
            vec![JudgeKind::School, JudgeKind::Name, JudgeKind::Bio]
        );
    }

    #[test]
    fn test_default_logging() {
        let level = default_log_level();
        let format = default_log_format();
        assert_eq!(level, "info");
        assert_eq!(format, "json");
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[judging]\ntoo_far_km = 100\njudges = [\"name\", \"school\"]\n\n[storage]\ndata_dir = \"/tmp/words\""
        )
        .unwrap();

        let settings = Settings::load_from(file.path()).unwrap();

        assert_eq!(settings.judging.too_far_km, 100);
        assert_eq!(settings.judging.too_close_km, 20);
        assert_eq!(settings.judging.judges, vec![JudgeKind::Name, JudgeKind::School]);
        assert_eq!(settings.storage.data_dir, PathBuf::from("/tmp/words"));
        assert_eq!(settings.bot.max_batches, 30);
    }

    #[test]
    fn test_unknown_judge_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[judging]\njudges = [\"horoscope\"]").unwrap();

        assert!(Settings::load_from(file.path()).is_err());
    }
}
