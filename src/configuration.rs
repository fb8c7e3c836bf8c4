use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_app_host")]
    pub app_host: String,
    #[serde(default = "default_app_port")]
    pub app_port: u16,
    #[serde(default)]
    pub ai: AiSettings,
    #[serde(default)]
    pub catalog: CatalogSettings,
    #[serde(default)]
    pub pricing: PricingSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub batch: BatchSettings,
}

fn default_app_host() -> String {
    "127.0.0.1".to_string()
}

fn default_app_port() -> u16 {
    8000
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_host: default_app_host(),
            app_port: default_app_port(),
            ai: AiSettings::default(),
            catalog: CatalogSettings::default(),
            pricing: PricingSettings::default(),
            storage: StorageSettings::default(),
            batch: BatchSettings::default(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Language model
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AiProviderType {
    #[default]
    Openai,
    Anthropic,
    Ollama,
    Custom,
}

impl fmt::Display for AiProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Openai => write!(f, "openai"),
            Self::Anthropic => write!(f, "anthropic"),
            Self::Ollama => write!(f, "ollama"),
            Self::Custom => write!(f, "custom"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiSettings {
    #[serde(default)]
    pub provider: AiProviderType,
    #[serde(default)]
    pub model: Option<String>,
    /// Never read from the configuration file, see [`AiSettings::with_env_secrets`].
    #[serde(skip)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Request timeout in seconds. 0 falls back to the provider default.
    #[serde(default)]
    pub timeout: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_tokens() -> u32 {
    500
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            provider: AiProviderType::default(),
            model: None,
            api_key: None,
            endpoint: None,
            timeout: 0,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl AiSettings {
    pub fn with_env_secrets(mut self) -> Self {
        self.api_key = std::env::var("AI_API_KEY").ok().filter(|key| !key.is_empty());
        self
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Instance catalog / price list
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    File,
    Http,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogSettings {
    #[serde(default)]
    pub source: SourceKind,
    #[serde(default = "default_catalog_path")]
    pub path: PathBuf,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("data/instance_types.yaml")
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            source: SourceKind::File,
            path: default_catalog_path(),
            endpoint: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PricingSettings {
    #[serde(default)]
    pub source: SourceKind,
    #[serde(default = "default_price_path")]
    pub path: PathBuf,
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Location dimension of the on-demand price query.
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_price_path() -> PathBuf {
    PathBuf::from("data/prices.yaml")
}

fn default_region() -> String {
    "US East (N. Virginia)".to_string()
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self {
            source: SourceKind::File,
            path: default_price_path(),
            endpoint: None,
            region: default_region(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Object storage / batch
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
    #[serde(default = "default_output_bucket")]
    pub output_bucket: String,
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("buckets")
}

fn default_output_bucket() -> String {
    "price--inventory".to_string()
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            output_bucket: default_output_bucket(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchSettings {
    /// Offset applied to artifact timestamps, IST by default.
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
}

fn default_utc_offset_minutes() -> i32 {
    330
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            utc_offset_minutes: default_utc_offset_minutes(),
        }
    }
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("CLOUDCOST")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    let mut config: Settings = settings.try_deserialize()?;
    config.ai = config.ai.with_env_secrets();

    Ok(config)
}
