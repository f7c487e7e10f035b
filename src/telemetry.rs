use std::fs::{File, OpenOptions};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
    Registry,
};

use crate::config::{LogConfig, LogFormat};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Installs the global subscriber: stdout plus one appending writer per
/// configured output path, and ERROR events copied to every error output.
/// `RUST_LOG` takes precedence over `log.level`.
pub fn init_telemetry(config: &LogConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .context("Invalid log level configuration")?;

    let layers = output_layers(config)?;
    let outputs = layers.len();

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::debug!(
        log_level = %config.level,
        log_format = ?config.format,
        outputs,
        "logger construction succeeded"
    );

    Ok(())
}

fn output_layers(config: &LogConfig) -> Result<Vec<BoxedLayer>> {
    let mut layers: Vec<BoxedLayer> = vec![format_layer(config.format, std::io::stdout, true)];
    for path in &config.output_paths {
        layers.push(format_layer(config.format, Mutex::new(open_append(path)?), false));
    }

    for path in &config.error_output_paths {
        let layer = if path == "stderr" {
            format_layer(config.format, std::io::stderr, true)
        } else {
            format_layer(config.format, Mutex::new(open_append(path)?), false)
        };
        layers.push(layer.with_filter(LevelFilter::ERROR).boxed());
    }

    Ok(layers)
}

fn open_append(path: &str) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log output {path}"))
}

fn format_layer<W>(format: LogFormat, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'a> fmt::MakeWriter<'a> + Send + Sync + 'static,
{
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(writer)
            .with_target(true)
            .with_current_span(false)
            .flatten_event(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_writer(writer)
            .with_ansi(ansi)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(writer)
            .with_ansi(ansi)
            .with_target(false)
            .boxed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_config(output_paths: Vec<String>, error_output_paths: Vec<String>) -> LogConfig {
        LogConfig {
            level: "info".to_string(),
            format: LogFormat::Json,
            output_paths,
            error_output_paths,
        }
    }

    #[test]
    fn error_outputs_only_receive_errors() {
        let dir = tempfile::tempdir().unwrap();
        let all = dir.path().join("all.log");
        let errors = dir.path().join("errors.log");
        let config = log_config(
            vec![all.display().to_string()],
            vec![errors.display().to_string()],
        );

        let layers = output_layers(&config).unwrap();
        assert_eq!(layers.len(), 3);

        let subscriber = tracing_subscriber::registry().with(layers);
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("todo created");
            tracing::error!("storage failure");
        });

        let all = std::fs::read_to_string(all).unwrap();
        assert!(all.contains("todo created"));
        assert!(all.contains("storage failure"));

        let errors = std::fs::read_to_string(errors).unwrap();
        assert!(!errors.contains("todo created"));
        assert!(errors.contains("storage failure"));
    }

    #[test]
    fn unopenable_output_is_reported() {
        let config = log_config(Vec::new(), vec!["/nonexistent/dir/errors.log".to_string()]);
        let err = output_layers(&config).err().unwrap();
        assert!(err.to_string().contains("/nonexistent/dir/errors.log"));
    }
}
