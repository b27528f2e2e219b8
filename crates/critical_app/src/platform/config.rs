use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use critical_core::ExtractionConfig;
use engine_logging::engine_info;

use super::cli::Cli;

const DEFAULT_CONFIG_FILE: &str = "critical.ron";

/// Resolves the effective configuration: file, then `CRITICAL_*` environment
/// variables, then command-line flags.
pub(crate) fn load_config(cli: &Cli) -> anyhow::Result<ExtractionConfig> {
    let from_file = match &cli.config {
        Some(path) => read_config_file(path)?,
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            if default.is_file() {
                read_config_file(&default)?
            } else {
                ExtractionConfig::default()
            }
        }
    };

    let mut config = from_file
        .with_env_overrides(|var| std::env::var(var).ok())
        .context("invalid CRITICAL_* environment override")?;
    apply_cli_overrides(&mut config, cli);
    Ok(config)
}

fn read_config_file(path: &Path) -> anyhow::Result<ExtractionConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config: ExtractionConfig = ron::from_str(&content)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    engine_info!("Loaded configuration from {:?}", path);
    Ok(config)
}

fn apply_cli_overrides(config: &mut ExtractionConfig, cli: &Cli) {
    if let Some(renderer) = &cli.renderer {
        config.renderer = renderer.clone();
    }
    if let Some(helper) = &cli.helper {
        config.helper_script = helper.clone();
    }
    if let Some(encoding) = &cli.encoding {
        config.encoding = encoding.clone();
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.timeout_ms = Some(timeout_ms);
    }
}
