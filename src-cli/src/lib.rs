pub mod commands;

use anyhow::Context;
use summarif_core::Config;

use crate::commands::Command;

/// Initialize tracing/logging with the given directives
pub fn init_logging(directives: &[&str]) -> anyhow::Result<()> {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    for directive in directives {
        filter = filter.add_directive(
            directive
                .parse()
                .with_context(|| format!("Invalid log directive: {}", directive))?,
        );
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

/// Run one command to completion on a fresh runtime
pub fn run(command: Command) -> anyhow::Result<()> {
    let rt = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;

    rt.block_on(async {
        let config = Config::load_or_default();
        config
            .ensure_dirs()
            .context("Failed to create config directory")?;
        tracing::debug!("Config directory: {:?}", config.config_dir);

        commands::execute(command, config).await
    })
}
