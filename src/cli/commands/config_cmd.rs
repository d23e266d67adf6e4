//! Configuration inspection.

use photoharvest::config::HarvestConfig;

/// Print the effective configuration, defaults and overrides applied.
pub fn cmd_config_show(config: &HarvestConfig) -> anyhow::Result<()> {
    let rendered = toml::to_string_pretty(config)?;
    println!("{}", rendered);
    Ok(())
}
