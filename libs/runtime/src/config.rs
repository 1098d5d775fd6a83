use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::home_dir::resolve_home_dir;

/// Named deployment environment. Selects where the database lives and
/// whether the process runs in testing mode.
///
/// Names are matched case-insensitively wherever they come from (CLI, YAML,
/// `APP__ENVIRONMENT`); `dev`, `test` and `prod` are accepted as short forms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Environment {
    #[default]
    Development,
    Testing,
    Production,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown environment '{0}' (expected development, testing or production)")]
pub struct UnknownEnvironment(pub String);

impl FromStr for Environment {
    type Err = UnknownEnvironment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "testing" | "test" => Ok(Self::Testing),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(UnknownEnvironment(s.to_string())),
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = UnknownEnvironment;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-environment settings resolved from process variables.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct EnvironmentSettings {
    pub testing: bool,
    pub database_url: Option<String>,
    /// Reserved. Loaded so deployments can provide it; nothing reads it yet.
    pub secret_key: Option<String>,
}

impl fmt::Debug for EnvironmentSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvironmentSettings")
            .field("testing", &self.testing)
            .field("database_url", &self.database_url)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Testing => "testing",
            Self::Production => "production",
        }
    }

    /// Name of the variable holding this environment's connection string.
    pub fn database_url_var(&self) -> &'static str {
        match self {
            Self::Testing => "DATABASE_TEST_URL",
            Self::Development | Self::Production => "DATABASE_URL",
        }
    }

    /// Resolve settings from the process environment.
    pub fn settings(&self) -> EnvironmentSettings {
        self.settings_from(|key| std::env::var(key).ok())
    }

    /// Resolve settings from an arbitrary variable lookup.
    pub fn settings_from<F>(&self, lookup: F) -> EnvironmentSettings
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        EnvironmentSettings {
            testing: matches!(self, Self::Testing),
            database_url: non_empty(self.database_url_var()),
            secret_key: non_empty("SECRET_KEY"),
        }
    }

    /// Connection string used when neither the config file nor the
    /// environment provides one.
    fn fallback_database_url(&self) -> Option<&'static str> {
        match self {
            Self::Development => Some("sqlite://database/users_dev.db"),
            Self::Testing => Some("sqlite::memory:"),
            Self::Production => None,
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Deployment environment.
    #[serde(default)]
    pub environment: Environment,
    /// Core server configuration.
    pub server: ServerConfig,
    /// Database pool configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging configuration (optional, uses defaults if None).
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub home_dir: String, // normalized to an absolute path on load
    pub host: String,
    pub port: u16,
    /// Per-request handler timeout; 0 disables it.
    #[serde(default)]
    pub timeout_sec: u64,
    #[serde(default)]
    pub cors_enabled: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Explicit connection URL; overrides the environment-derived one.
    #[serde(default)]
    pub url: Option<String>,
    /// Maximum number of connections in the pool (defaults to 10).
    #[serde(default)]
    pub max_conns: Option<u32>,
    /// SQLite busy timeout in milliseconds (defaults to 5000).
    #[serde(default)]
    pub busy_timeout_ms: Option<u32>,
}

/// Logging configuration - maps subsystem names to their logging settings.
/// Key "default" is the catch-all for logs that don't match explicit subsystems.
pub type LoggingConfig = HashMap<String, Section>;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Section {
    pub console_level: String, // "info", "debug", "error", "off"
    #[serde(default)]
    pub file: String, // "logs/users.log"; empty disables the file sink
    #[serde(default)]
    pub file_level: String,
    #[serde(default)]
    pub max_backups: Option<usize>,
    #[serde(default)]
    pub max_size_mb: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            // Empty => $HOME/.users_service
            home_dir: String::new(),
            host: "127.0.0.1".to_string(),
            port: 5000,
            timeout_sec: 30,
            cors_enabled: false,
        }
    }
}

/// Create a default logging configuration.
pub fn default_logging_config() -> LoggingConfig {
    let mut logging = HashMap::new();
    logging.insert(
        "default".to_string(),
        Section {
            console_level: "info".to_string(),
            file: "logs/users.log".to_string(),
            file_level: "debug".to_string(),
            max_backups: Some(3),
            max_size_mb: Some(100),
        },
    );
    logging
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            server: ServerConfig::default(),
            database: DatabaseConfig {
                url: None,
                max_conns: Some(10),
                busy_timeout_ms: Some(5000),
            },
            logging: Some(default_logging_config()),
        }
    }
}

/// Command line arguments relevant to configuration.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config: Option<String>,
    pub port: Option<u16>,
    pub environment: Option<Environment>,
    pub print_config: bool,
    pub verbose: u8,
    pub mock: bool,
}

const fn default_subdir() -> &'static str {
    ".users_service"
}

impl AppConfig {
    /// Layered loading: defaults → YAML file (if any) → `APP__*` environment variables.
    fn figment(config_path: Option<&Path>) -> figment::Figment {
        use figment::{
            providers::{Env, Format, Serialized, Yaml},
            Figment,
        };

        // Logging stays None unless YAML/ENV provide it; the caller falls back
        // to the built-in defaults.
        let base = AppConfig {
            logging: None,
            ..AppConfig::default()
        };

        let mut figment = Figment::new().merge(Serialized::defaults(base));
        if let Some(path) = config_path {
            figment = figment.merge(Yaml::file(path));
        }
        // Example: APP__SERVER__PORT=8080 maps to server.port
        figment.merge(Env::prefixed("APP__").split("__"))
    }

    /// Load configuration from a YAML file layered over defaults and environment.
    /// Also normalizes `server.home_dir` into an absolute path and creates the directory.
    pub fn load_layered<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let path = config_path.as_ref();
        if !path.exists() {
            return Err(anyhow!("Config file not found: {}", path.display()));
        }
        Self::extract(Self::figment(Some(path)))
    }

    /// Load configuration from file, or from defaults + environment when no file is given.
    pub fn load_or_default<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_layered(path),
            None => {
                let mut config = Self::extract(Self::figment(None))?;
                if config.logging.is_none() {
                    config.logging = Some(default_logging_config());
                }
                Ok(config)
            }
        }
    }

    fn extract(figment: figment::Figment) -> Result<Self> {
        let mut config: AppConfig = figment
            .extract()
            .context("Failed to extract config from figment")?;

        normalize_home_dir_inplace(&mut config.server)
            .context("Failed to resolve server.home_dir")?;

        Ok(config)
    }

    /// Serialize configuration to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config to YAML")
    }

    /// Apply overrides from command line arguments.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(port) = args.port {
            self.server.port = port;
        }
        if let Some(env) = args.environment {
            self.environment = env;
        }

        let logging = self.logging.get_or_insert_with(default_logging_config);
        if let Some(default_section) = logging.get_mut("default") {
            default_section.console_level = match args.verbose {
                0 => default_section.console_level.clone(),
                1 => "debug".to_string(),
                _ => "trace".to_string(),
            };
        }
    }

    /// Effective connection string for the configured environment.
    pub fn resolve_database_url(&self) -> Result<String> {
        self.resolve_database_url_with(&self.environment.settings())
    }

    /// Precedence: `database.url` → environment variable → per-environment fallback.
    pub fn resolve_database_url_with(&self, settings: &EnvironmentSettings) -> Result<String> {
        let explicit = self
            .database
            .url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        if let Some(url) = explicit {
            return Ok(url.to_string());
        }
        if let Some(url) = settings.database_url.as_deref() {
            return Ok(url.trim().to_string());
        }
        self.environment
            .fallback_database_url()
            .map(str::to_string)
            .ok_or_else(|| {
                anyhow!(
                    "No database configured for {} (set {} or database.url)",
                    self.environment,
                    self.environment.database_url_var()
                )
            })
    }
}

/// Normalize `server.home_dir` and store the absolute path back.
fn normalize_home_dir_inplace(server: &mut ServerConfig) -> Result<()> {
    let configured = if server.home_dir.trim().is_empty() {
        None
    } else {
        Some(server.home_dir.clone())
    };

    let resolved: PathBuf = resolve_home_dir(configured, default_subdir(), true)
        .context("home_dir normalization failed")?;

    server.home_dir = resolved.to_string_lossy().to_string();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn lookup<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn environment_parses_names_and_aliases() {
        assert_eq!("development".parse::<Environment>().unwrap(), Environment::Development);
        assert_eq!("Testing".parse::<Environment>().unwrap(), Environment::Testing);
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Production);
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn testing_flag_only_set_for_testing() {
        let none = lookup(&[]);
        assert!(!Environment::Development.settings_from(&none).testing);
        assert!(Environment::Testing.settings_from(&none).testing);
        assert!(!Environment::Production.settings_from(&none).testing);
    }

    #[test]
    fn each_environment_reads_its_own_url_variable() {
        let vars = [
            ("DATABASE_URL", "postgres://app@db/users"),
            ("DATABASE_TEST_URL", "postgres://app@db/users_test"),
            ("SECRET_KEY", "s3cr3t"),
        ];
        let vars = lookup(&vars);

        let dev = Environment::Development.settings_from(&vars);
        assert_eq!(dev.database_url.as_deref(), Some("postgres://app@db/users"));
        assert_eq!(dev.secret_key.as_deref(), Some("s3cr3t"));

        let test = Environment::Testing.settings_from(&vars);
        assert_eq!(test.database_url.as_deref(), Some("postgres://app@db/users_test"));

        let prod = Environment::Production.settings_from(&vars);
        assert_eq!(prod.database_url.as_deref(), Some("postgres://app@db/users"));
    }

    #[test]
    fn secret_key_is_redacted_in_debug() {
        let vars = [("SECRET_KEY", "do-not-print")];
        let settings = Environment::Development.settings_from(lookup(&vars));
        let printed = format!("{settings:?}");
        assert!(!printed.contains("do-not-print"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn database_url_precedence() {
        let mut config = AppConfig::default();
        let from_env = EnvironmentSettings {
            database_url: Some("postgres://env/users".into()),
            ..Default::default()
        };

        // environment variable beats fallback
        assert_eq!(
            config.resolve_database_url_with(&from_env).unwrap(),
            "postgres://env/users"
        );

        // explicit config beats environment variable
        config.database.url = Some("sqlite://explicit.db".into());
        assert_eq!(
            config.resolve_database_url_with(&from_env).unwrap(),
            "sqlite://explicit.db"
        );
    }

    #[test]
    fn database_url_fallbacks_per_environment() {
        let empty = EnvironmentSettings::default();
        let mut config = AppConfig::default();

        assert_eq!(
            config.resolve_database_url_with(&empty).unwrap(),
            "sqlite://database/users_dev.db"
        );

        config.environment = Environment::Testing;
        assert_eq!(config.resolve_database_url_with(&empty).unwrap(), "sqlite::memory:");

        config.environment = Environment::Production;
        let err = config.resolve_database_url_with(&empty).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn load_layered_reads_yaml_and_normalizes_home_dir() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "users.yaml",
                r#"
environment: testing
server:
  home_dir: "home"
  host: "0.0.0.0"
  port: 9090
  timeout_sec: 10
database:
  url: "sqlite://custom.db"
  max_conns: 4
logging:
  default:
    console_level: debug
    file: ""
"#,
            )?;

            let config = AppConfig::load_layered("users.yaml").map_err(|e| e.to_string())?;

            assert_eq!(config.environment, Environment::Testing);
            assert_eq!(config.server.host, "0.0.0.0");
            assert_eq!(config.server.port, 9090);
            assert_eq!(config.server.timeout_sec, 10);
            assert!(Path::new(&config.server.home_dir).is_absolute());
            assert!(config.server.home_dir.ends_with("home"));
            assert_eq!(config.database.url.as_deref(), Some("sqlite://custom.db"));
            assert_eq!(config.database.max_conns, Some(4));
            let logging = config.logging.as_ref().unwrap();
            assert_eq!(logging["default"].console_level, "debug");
            Ok(())
        });
    }

    #[test]
    fn env_variables_override_yaml() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "users.yaml",
                r#"
server:
  home_dir: "home"
  host: "127.0.0.1"
  port: 5000
"#,
            )?;
            jail.set_env("APP__SERVER__PORT", "6001");
            jail.set_env("APP__ENVIRONMENT", "production");

            let config = AppConfig::load_layered("users.yaml").map_err(|e| e.to_string())?;
            assert_eq!(config.server.port, 6001);
            assert_eq!(config.environment, Environment::Production);
            Ok(())
        });
    }

    #[test]
    fn environment_names_are_case_insensitive_in_every_layer() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "users.yaml",
                r#"
environment: Prod
server:
  home_dir: "home"
"#,
            )?;
            let config = AppConfig::load_layered("users.yaml").map_err(|e| e.to_string())?;
            assert_eq!(config.environment, Environment::Production);

            jail.set_env("APP__ENVIRONMENT", "Testing");
            let config = AppConfig::load_layered("users.yaml").map_err(|e| e.to_string())?;
            assert_eq!(config.environment, Environment::Testing);

            jail.set_env("APP__ENVIRONMENT", "staging");
            assert!(AppConfig::load_layered("users.yaml").is_err());
            Ok(())
        });
    }

    #[test]
    fn load_or_default_without_file_uses_defaults() {
        Jail::expect_with(|jail| {
            jail.set_env("APP__SERVER__HOME_DIR", "service_home");

            let config =
                AppConfig::load_or_default(None::<&Path>).map_err(|e| e.to_string())?;
            assert_eq!(config.environment, Environment::Development);
            assert_eq!(config.server.port, 5000);
            assert!(config.server.home_dir.ends_with("service_home"));
            assert!(config.logging.is_some());
            Ok(())
        });
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let err = AppConfig::load_layered("/definitely/not/here.yaml").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn cli_overrides_port_environment_and_verbosity() {
        for (verbose, expected) in [(0, "info"), (1, "debug"), (2, "trace"), (3, "trace")] {
            let mut config = AppConfig::default();
            let args = CliArgs {
                port: Some(3000),
                environment: Some(Environment::Testing),
                verbose,
                ..Default::default()
            };

            config.apply_cli_overrides(&args);

            assert_eq!(config.server.port, 3000);
            assert_eq!(config.environment, Environment::Testing);
            let logging = config.logging.as_ref().unwrap();
            assert_eq!(logging["default"].console_level, expected);
        }
    }

    #[test]
    fn to_yaml_roundtrip_basic() {
        let config = AppConfig::default();
        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("environment: development"));
        assert!(yaml.contains("server:"));

        let roundtrip: AppConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(roundtrip.server.port, config.server.port);
        assert_eq!(roundtrip.environment, config.environment);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let yaml = r#"
server:
  home_dir: ""
  host: "127.0.0.1"
  port: 5000
  bogus: true
"#;
        let result: Result<AppConfig, _> = serde_yaml::from_str(yaml);
        assert!(result.is_err());
    }
}
