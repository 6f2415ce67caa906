use anyhow::{Context, Result};
use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use trawl::cli::{Cli, LogFormat};
use trawl::commands::run_command;
use trawl_config::{config_path, ensure_workspace_config, validate_config};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let workspace = cli.workspace.canonicalize().with_context(|| {
        format!(
            "failed to resolve workspace path {}",
            cli.workspace.display()
        )
    })?;

    let config = ensure_workspace_config(&workspace).with_context(|| {
        format!(
            "failed to load or create workspace config at {}",
            config_path(&workspace).display()
        )
    })?;
    for warning in validate_config(&config) {
        warn!(code = warning.code, "config warning: {}", warning.message);
    }

    run_command(&workspace, cli.command)
}

/// Logs go to stderr so stdout stays a clean JSON document.
fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Human => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
