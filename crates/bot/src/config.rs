//! Configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string of the catalog database
//! - `CLOUDINARY_CLOUD_NAME` - Cloudinary cloud name
//! - `CLOUDINARY_API_KEY` - Cloudinary API key
//! - `CLOUDINARY_API_SECRET` - Cloudinary API secret (used to sign uploads)
//! - `TELEGRAM_BOT_TOKEN` - Telegram bot token (bot binary only)
//!
//! ## Optional
//! - `CATALOG_ENV` - `dev` or `prod` (default: dev), selects default table names
//! - `CATALOG_PRODUCTS_TABLE` - Live products table
//! - `CATALOG_CATEGORIES_TABLE` - Categories table
//! - `CATALOG_DELETED_TABLE` - Soft-deleted products table
//! - `CATALOG_BASELINE_ORDER` - Baseline category ranks as `code:rank,...`
//! - `CLOUDINARY_FOLDER` - Upload folder
//! - `CLOUDINARY_SIGNATURE_ALGORITHM` - `sha1` or `sha256` (default: sha1)
//! - `DATABASE_MAX_CONNECTIONS` - Pool size (default: 5)
//! - `TELEGRAM_API_BASE` - Bot API base URL (default: <https://api.telegram.org>)
//! - `TELEGRAM_POLL_TIMEOUT_SECS` - Long polling timeout (default: 30)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Sentry error sample rate (default: 1.0)
//! - `LOG_FORMAT` - `json` for structured logs, anything else for text

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use crate::catalog::BaselineOrder;
use crate::db::TableNames;
use crate::media::SignatureAlgorithm;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const MIN_BOT_TOKEN_SECRET_LENGTH: usize = 30;
const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const DEFAULT_POLL_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Deployment environment, which decides the default table names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CatalogEnv {
    #[default]
    Dev,
    Prod,
}

impl FromStr for CatalogEnv {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dev" | "development" => Ok(Self::Dev),
            "prod" | "production" => Ok(Self::Prod),
            other => Err(format!("expected dev or prod, got '{other}'")),
        }
    }
}

impl CatalogEnv {
    /// Default `(products, categories, deleted products)` table names.
    #[must_use]
    pub const fn default_tables(self) -> (&'static str, &'static str, &'static str) {
        match self {
            Self::Dev => ("new_products_dup", "extra_data_bot", "deleted_products_dup"),
            Self::Prod => ("new_products_prod", "extra_data_dup", "deleted_products_dup"),
        }
    }

    /// Default Cloudinary upload folder.
    #[must_use]
    pub const fn default_folder(self) -> &'static str {
        match self {
            Self::Dev => "new_products",
            Self::Prod => "new_products_dup",
        }
    }
}

/// Catalog configuration shared by the bot and the CLI.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// Maximum pool connections
    pub max_connections: u32,
    /// Deployment environment
    pub env: CatalogEnv,
    /// Physical table names
    pub tables: TableNames,
    /// Baseline category ranks used by the order reset
    pub baseline: BaselineOrder,
    /// Media store configuration
    pub cloudinary: CloudinaryConfig,
}

/// Cloudinary upload configuration.
///
/// Implements `Debug` manually to redact the API secret.
#[derive(Clone)]
pub struct CloudinaryConfig {
    /// Cloud name (first path segment of the upload API)
    pub cloud_name: String,
    /// API key sent with every signed upload
    pub api_key: String,
    /// API secret used to sign uploads
    pub api_secret: SecretString,
    /// Folder new images are stored in
    pub folder: String,
    /// Digest used for upload signatures
    pub signature_algorithm: SignatureAlgorithm,
}

impl std::fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("folder", &self.folder)
            .field("signature_algorithm", &self.signature_algorithm)
            .finish()
    }
}

/// Telegram Bot API configuration.
///
/// Implements `Debug` manually to redact the bot token.
#[derive(Clone)]
pub struct TelegramConfig {
    /// Bot token (`<bot id>:<secret>`)
    pub bot_token: SecretString,
    /// Bot API base URL
    pub api_base: String,
    /// Long polling timeout
    pub poll_timeout: Duration,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("poll_timeout", &self.poll_timeout)
            .finish()
    }
}

/// Bot binary configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Catalog configuration
    pub catalog: CatalogConfig,
    /// Telegram configuration
    pub telegram: TelegramConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Emit JSON logs instead of text
    pub log_json: bool,
}

impl BotConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`BotConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(&lookup);

        let catalog = CatalogConfig::from_vars(&env)?;
        let telegram = TelegramConfig::from_vars(&env)?;
        let sentry_dsn = env.optional("SENTRY_DSN");
        let sentry_environment = env.optional("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = env
            .optional("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let log_json = env
            .optional("LOG_FORMAT")
            .is_some_and(|format| format.eq_ignore_ascii_case("json"));

        Ok(Self {
            catalog,
            telegram,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            log_json,
        })
    }
}

impl CatalogConfig {
    /// Load the catalog configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load the catalog configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`CatalogConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_vars(&Env(&lookup))
    }

    fn from_vars(env: &Env<'_>) -> Result<Self, ConfigError> {
        let database_url = SecretString::from(env.required("DATABASE_URL")?);
        let max_connections = env.parsed("DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?;
        let catalog_env: CatalogEnv = env.parsed("CATALOG_ENV", CatalogEnv::Dev)?;

        let (products, categories, deleted) = catalog_env.default_tables();
        let tables = TableNames::new(
            env.or_default("CATALOG_PRODUCTS_TABLE", products),
            env.or_default("CATALOG_CATEGORIES_TABLE", categories),
            env.or_default("CATALOG_DELETED_TABLE", deleted),
        )
        .map_err(|e| ConfigError::InvalidEnvVar("CATALOG_*_TABLE".to_string(), e.to_string()))?;

        let baseline = match env.optional("CATALOG_BASELINE_ORDER") {
            Some(raw) => BaselineOrder::parse(&raw).map_err(|e| {
                ConfigError::InvalidEnvVar("CATALOG_BASELINE_ORDER".to_string(), e.to_string())
            })?,
            None => BaselineOrder::standard(),
        };

        let cloudinary = CloudinaryConfig::from_vars(env, catalog_env)?;

        Ok(Self {
            database_url,
            max_connections,
            env: catalog_env,
            tables,
            baseline,
            cloudinary,
        })
    }
}

impl CloudinaryConfig {
    fn from_vars(env: &Env<'_>, catalog_env: CatalogEnv) -> Result<Self, ConfigError> {
        let api_secret = env.required("CLOUDINARY_API_SECRET")?;
        validate_secret_strength(&api_secret, "CLOUDINARY_API_SECRET")?;

        Ok(Self {
            cloud_name: env.required("CLOUDINARY_CLOUD_NAME")?,
            api_key: env.required("CLOUDINARY_API_KEY")?,
            api_secret: SecretString::from(api_secret),
            folder: env.or_default("CLOUDINARY_FOLDER", catalog_env.default_folder()),
            signature_algorithm: env
                .parsed("CLOUDINARY_SIGNATURE_ALGORITHM", SignatureAlgorithm::Sha1)?,
        })
    }
}

impl TelegramConfig {
    fn from_vars(env: &Env<'_>) -> Result<Self, ConfigError> {
        let bot_token = SecretString::from(env.required("TELEGRAM_BOT_TOKEN")?);
        validate_bot_token(&bot_token, "TELEGRAM_BOT_TOKEN")?;

        let api_base = env
            .or_default("TELEGRAM_API_BASE", DEFAULT_TELEGRAM_API_BASE)
            .trim_end_matches('/')
            .to_string();
        url::Url::parse(&api_base)
            .map_err(|e| ConfigError::InvalidEnvVar("TELEGRAM_API_BASE".to_string(), e.to_string()))?;

        let poll_timeout = Duration::from_secs(
            env.parsed("TELEGRAM_POLL_TIMEOUT_SECS", DEFAULT_POLL_TIMEOUT_SECS)?,
        );

        Ok(Self {
            bot_token,
            api_base,
            poll_timeout,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Variable lookup used by the loaders.
struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get an optional variable. Empty values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Parse a variable, falling back to a default when unset.
    fn parsed<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key).map_or(Ok(default), |raw| {
            raw.trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
    }
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the secret issued by the provider."
            ),
        ));
    }

    Ok(())
}

/// Validate the `<numeric bot id>:<secret>` shape of a Telegram bot token.
fn validate_bot_token(token: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = token.expose_secret();
    let Some((bot_id, secret)) = value.split_once(':') else {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            "expected <bot id>:<secret>".to_string(),
        ));
    };

    if bot_id.is_empty() || !bot_id.chars().all(|c| c.is_ascii_digit()) {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            "bot id must be numeric".to_string(),
        ));
    }

    if secret.len() < MIN_BOT_TOKEN_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "secret part must be at least {MIN_BOT_TOKEN_SECRET_LENGTH} characters (got {})",
                secret.len()
            ),
        ));
    }

    validate_secret_strength(secret, var_name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const TOKEN: &str = "123456789:AAHk3vQ9xZ2mPq7LrT5wYb8NcJ4dFg6HsUe";
    const CLOUDINARY_SECRET: &str = "aB3xY9mK2nL5pQ7rT0uW4zC6vD8";

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        let mut map: HashMap<String, String> = [
            ("DATABASE_URL", "postgres://localhost/shelf"),
            ("TELEGRAM_BOT_TOKEN", TOKEN),
            ("CLOUDINARY_CLOUD_NAME", "shelf-cloud"),
            ("CLOUDINARY_API_KEY", "123456789012345"),
            ("CLOUDINARY_API_SECRET", CLOUDINARY_SECRET),
        ]
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
        for (k, v) in pairs {
            map.insert((*k).to_string(), (*v).to_string());
        }
        map
    }

    fn load(pairs: &[(&str, &str)]) -> Result<BotConfig, ConfigError> {
        let map = vars(pairs);
        BotConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults_for_dev() {
        let config = load(&[]).unwrap();

        assert_eq!(config.catalog.env, CatalogEnv::Dev);
        assert_eq!(config.catalog.tables.products(), "new_products_dup");
        assert_eq!(config.catalog.tables.categories(), "extra_data_bot");
        assert_eq!(config.catalog.tables.deleted_products(), "deleted_products_dup");
        assert_eq!(config.catalog.cloudinary.folder, "new_products");
        assert_eq!(config.catalog.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.catalog.baseline, BaselineOrder::standard());
        assert_eq!(config.telegram.api_base, DEFAULT_TELEGRAM_API_BASE);
        assert_eq!(config.telegram.poll_timeout, Duration::from_secs(30));
        assert!(!config.log_json);
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_prod_switches_tables_and_folder() {
        let config = load(&[("CATALOG_ENV", "prod")]).unwrap();

        assert_eq!(config.catalog.tables.products(), "new_products_prod");
        assert_eq!(config.catalog.tables.categories(), "extra_data_dup");
        assert_eq!(config.catalog.cloudinary.folder, "new_products_dup");
    }

    #[test]
    fn test_table_overrides() {
        let config = load(&[
            ("CATALOG_PRODUCTS_TABLE", "catalog.products"),
            ("CLOUDINARY_FOLDER", "staging"),
        ])
        .unwrap();

        assert_eq!(config.catalog.tables.products(), "catalog.products");
        assert_eq!(config.catalog.cloudinary.folder, "staging");
    }

    #[test]
    fn test_invalid_table_name_is_rejected() {
        let result = load(&[("CATALOG_PRODUCTS_TABLE", "products; drop table x")]);
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(_, _))));
    }

    #[test]
    fn test_unknown_catalog_env_is_rejected() {
        let result = load(&[("CATALOG_ENV", "staging")]);
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(key, _)) if key == "CATALOG_ENV"));
    }

    #[test]
    fn test_missing_database_url() {
        let mut map = vars(&[]);
        map.remove("DATABASE_URL");
        let result = BotConfig::from_lookup(|key| map.get(key).cloned());
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(key)) if key == "DATABASE_URL"));
    }

    #[test]
    fn test_catalog_config_does_not_need_telegram() {
        let mut map = vars(&[]);
        map.remove("TELEGRAM_BOT_TOKEN");
        assert!(CatalogConfig::from_lookup(|key| map.get(key).cloned()).is_ok());
        assert!(BotConfig::from_lookup(|key| map.get(key).cloned()).is_err());
    }

    #[test]
    fn test_custom_baseline_order() {
        let config = load(&[("CATALOG_BASELINE_ORDER", "A:1, B:2")]).unwrap();
        let a = shelf_core::CategoryCode::parse("A").unwrap();
        assert_eq!(config.catalog.baseline.rank(&a), Some(1));
        let four = shelf_core::CategoryCode::parse("4").unwrap();
        assert_eq!(config.catalog.baseline.rank(&four), None);
    }

    #[test]
    fn test_sha256_signatures() {
        let config = load(&[("CLOUDINARY_SIGNATURE_ALGORITHM", "sha256")]).unwrap();
        assert_eq!(
            config.catalog.cloudinary.signature_algorithm,
            SignatureAlgorithm::Sha256
        );
    }

    #[test]
    fn test_log_format_json() {
        let config = load(&[("LOG_FORMAT", "JSON")]).unwrap();
        assert!(config.log_json);
    }

    #[test]
    fn test_bot_token_shape() {
        assert!(validate_bot_token(&SecretString::from(TOKEN), "T").is_ok());
        assert!(validate_bot_token(&SecretString::from("no-colon"), "T").is_err());
        assert!(validate_bot_token(&SecretString::from("abc:AAHk3vQ9xZ2mPq7LrT5wYb8NcJ4dFg6HsUe"), "T").is_err());
        assert!(validate_bot_token(&SecretString::from("123:short"), "T").is_err());
    }

    #[test]
    fn test_placeholder_secret_is_rejected() {
        let result = load(&[("CLOUDINARY_API_SECRET", "your-cloudinary-api-secret")]);
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_shannon_entropy() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy(CLOUDINARY_SECRET) > MIN_ENTROPY_BITS_PER_CHAR);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = load(&[]).unwrap();
        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("shelf-cloud"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains(CLOUDINARY_SECRET));
        assert!(!debug_output.contains("AAHk3vQ9xZ2mPq7LrT5wYb8NcJ4dFg6HsUe"));
    }
}
