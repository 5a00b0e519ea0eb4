use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::paths::resolve_home_dir;

/// Environment prefix for overrides; `TIMETABLE__SERVER__PORT=9000` sets `server.port`.
pub const ENV_PREFIX: &str = "TIMETABLE__";

/// DSN the `--mock` flag swaps in.
pub const IN_MEMORY_DSN: &str = "sqlite::memory:";

const HOME_SUBDIR: &str = ".timetable";
const LOG_LEVELS: [&str; 7] = ["off", "none", "error", "warn", "info", "debug", "trace"];

/// Process configuration. Sections owned by the binary are typed; each
/// module reads its own section out of `modules`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: Option<DatabaseConfig>,
    /// Falls back to [`default_logging_config`] when absent.
    pub logging: Option<LoggingConfig>,
    /// Raw module sections keyed by module name (`schedule`, `api_ingress`).
    #[serde(default)]
    pub modules: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Absolute after loading; relative database and log paths hang off it.
    pub home_dir: String,
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub timeout_sec: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// `sqlite://relative/or/absolute.db`, `sqlite::memory:` or `postgres://...`.
    pub url: String,
    pub max_conns: Option<u32>,
    pub busy_timeout_ms: Option<u32>,
}

/// Subsystem name → sink settings. `default` catches every other target.
pub type LoggingConfig = HashMap<String, Section>;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Section {
    pub console_level: String,
    /// Relative to `server.home_dir`; empty disables the file sink.
    pub file: String,
    #[serde(default)]
    pub file_level: String,
    pub max_age_days: Option<u32>,
    #[serde(default)]
    pub max_backups: Option<usize>,
    #[serde(default)]
    pub max_size_mb: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            home_dir: String::new(),
            host: "127.0.0.1".to_string(),
            port: 8080,
            timeout_sec: 0,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://database/timetable.db".to_string(),
            max_conns: Some(10),
            busy_timeout_ms: Some(5000),
        }
    }
}

pub fn default_logging_config() -> LoggingConfig {
    HashMap::from([(
        "default".to_string(),
        Section {
            console_level: "info".to_string(),
            file: "logs/timetable.log".to_string(),
            file_level: "debug".to_string(),
            max_age_days: Some(7),
            max_backups: Some(3),
            max_size_mb: Some(100),
        },
    )])
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: Some(DatabaseConfig::default()),
            logging: Some(default_logging_config()),
            modules: HashMap::new(),
        }
    }
}

impl AppConfig {
    /// Defaults, then the YAML file, then `TIMETABLE__` environment variables.
    /// Sections the file leaves out stay `None`. The home directory is
    /// resolved and created before returning.
    pub fn load_layered<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        use figment::{
            providers::{Env, Format, Serialized, Yaml},
            Figment,
        };

        let path = config_path.as_ref();
        if !path.is_file() {
            bail!("config file not found: {}", path.display());
        }

        let base = AppConfig {
            server: ServerConfig::default(),
            database: None,
            logging: None,
            modules: HashMap::new(),
        };

        let mut config: AppConfig = Figment::new()
            .merge(Serialized::defaults(base))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("failed to parse config file {}", path.display()))?;

        config.finish()?;
        Ok(config)
    }

    /// Like [`AppConfig::load_layered`] when a path is given, built-in defaults otherwise.
    pub fn load_or_default<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_layered(path),
            None => {
                let mut config = Self::default();
                config.finish()?;
                Ok(config)
            }
        }
    }

    fn finish(&mut self) -> Result<()> {
        let requested = Some(self.server.home_dir.trim().to_string()).filter(|s| !s.is_empty());
        let home = resolve_home_dir(requested, HOME_SUBDIR, true)
            .context("failed to resolve server.home_dir")?;
        self.server.home_dir = home.to_string_lossy().to_string();
        self.validate()
    }

    /// Structural checks that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            bail!("server.host must not be empty");
        }
        if let Some(db) = &self.database {
            if db.url.trim().is_empty() {
                bail!("database.url must not be empty");
            }
            if db.max_conns == Some(0) {
                bail!("database.max_conns must be at least 1");
            }
        }
        for (name, section) in self.logging.iter().flatten() {
            for (field, level) in [
                ("console_level", &section.console_level),
                ("file_level", &section.file_level),
            ] {
                let level = level.trim().to_ascii_lowercase();
                if !level.is_empty() && !LOG_LEVELS.contains(&level.as_str()) {
                    bail!("logging.{name}.{field}: unknown level '{level}'");
                }
            }
        }
        Ok(())
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("failed to serialize config to YAML")
    }

    /// `--port` replaces the port, `-v`/`-vv` raise the default console level,
    /// `--mock` swaps the database for an in-memory SQLite one.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(port) = args.port {
            self.server.port = port;
        }

        if args.verbose > 0 {
            let level = if args.verbose == 1 { "debug" } else { "trace" };
            let logging = self.logging.get_or_insert_with(default_logging_config);
            if let Some(section) = logging.get_mut("default") {
                section.console_level = level.to_string();
            }
        }

        if args.mock {
            let db = self.database.get_or_insert_with(DatabaseConfig::default);
            db.url = IN_MEMORY_DSN.to_string();
            db.max_conns = Some(1);
        }
    }

    /// Deserialize the `modules.<module>` section, or `T::default()` when absent.
    pub fn module_config<T: DeserializeOwned + Default>(&self, module: &str) -> Result<T> {
        match self.modules.get(module) {
            Some(raw) => serde_json::from_value::<T>(raw.clone())
                .with_context(|| format!("invalid '{module}' module config")),
            None => Ok(T::default()),
        }
    }

    pub fn home_dir(&self) -> PathBuf {
        PathBuf::from(&self.server.home_dir)
    }
}

/// Flags the binary passes down to configuration loading.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config: Option<String>,
    pub port: Option<u16>,
    pub print_config: bool,
    pub verbose: u8,
    pub mock: bool,
}
