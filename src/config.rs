use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    pub database: DatabaseConfig,
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Service name attached to every access log line
    pub name: String,
    pub listen_addr: String,
    pub port: u16,
    /// Upper bound for one request before it is answered with 408
    pub request_timeout_secs: u64,
    /// How long in-flight requests may run after a shutdown signal
    pub shutdown_grace_secs: u64,
    /// Origins allowed by CORS. Empty disables the layer.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Deployment environment, e.g. "development" or "production"
    #[serde(default)]
    pub env: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LogConfig {
    /// trace, debug, info, warn or error
    pub level: String,
    pub format: LogFormat,
    /// Files that receive a copy of stdout output
    #[serde(default)]
    pub output_paths: Vec<String>,
    /// Destinations for ERROR events only: "stderr" or a file path
    #[serde(default)]
    pub error_output_paths: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

const DEFAULTS: &str = r#"
[server]
name = "todo-api"
listen_addr = "0.0.0.0"
port = 8080
request_timeout_secs = 10
shutdown_grace_secs = 30

[service]

[database]
url = "sqlite://todo.db"
max_connections = 10
acquire_timeout_secs = 5

[log]
level = "info"
format = "json"
error_output_paths = ["stderr"]
"#;

impl Config {
    /// Defaults, then the TOML file at `path`, then `TODO_*` environment variables
    /// (`TODO_SERVICE__ENV=production`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder =
            ConfigBuilder::builder().add_source(File::from_str(DEFAULTS, FileFormat::Toml));

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix("TODO")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Config = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Reports every invalid setting at once.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if self.service.env.trim().is_empty() {
            problems.push("service.env is not set".to_string());
        }
        if !matches!(
            self.log.level.to_lowercase().as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            problems.push(format!(
                "log.level {:?} must be one of trace, debug, info, warn, error",
                self.log.level
            ));
        }
        if self.server.port == 0 {
            problems.push("server.port cannot be 0".to_string());
        }
        if self.database.max_connections == 0 {
            problems.push("database.max_connections must be greater than 0".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(anyhow::anyhow!("invalid configuration: {}", problems.join("; ")))
        }
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.listen_addr, self.server.port)
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl DatabaseConfig {
    /// A private in-memory database on a single connection.
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            acquire_timeout_secs: 5,
        }
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_file_over_defaults() {
        let file = write_config(
            r#"
[service]
env = "development"

[log]
level = "debug"
output_paths = ["/tmp/todo-api.log"]

[database]
url = "sqlite://famili.db"
"#,
        );

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.service.env, "development");
        assert_eq!(config.server.name, "todo-api");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.shutdown_grace(), Duration::from_secs(30));
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.log.output_paths, ["/tmp/todo-api.log"]);
        assert_eq!(config.log.error_output_paths, ["stderr"]);
        assert_eq!(config.database.url, "sqlite://famili.db");
        assert_eq!(config.database.max_connections, 10);
        assert!(config.server.allowed_origins.is_empty());
    }

    #[test]
    fn error_outputs_replace_the_default() {
        let file = write_config(
            r#"
[service]
env = "production"

[log]
error_output_paths = ["stderr", "/var/log/todo-api.err"]
"#,
        );

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(
            config.log.error_output_paths,
            ["stderr", "/var/log/todo-api.err"]
        );
        assert!(config.log.output_paths.is_empty());
    }

    #[test]
    fn missing_env_is_rejected() {
        let file = write_config("[server]\nport = 9000\n");
        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("service.env is not set"));
    }

    #[test]
    fn validate_collects_every_problem() {
        let file = write_config(
            r#"
[service]
env = "test"
"#,
        );
        let mut config = Config::load(Some(file.path())).unwrap();
        config.service.env = String::new();
        config.log.level = "verbose".to_string();
        config.server.port = 0;

        let message = config.validate().unwrap_err().to_string();
        assert!(message.contains("service.env"));
        assert!(message.contains("log.level"));
        assert!(message.contains("server.port"));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(Config::load(Some(Path::new("/nonexistent/todo-api.toml"))).is_err());
    }
}
