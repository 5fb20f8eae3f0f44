use anyhow::Result;
use kaiwa_infrastructure::AppConfig;

pub fn show(config: &AppConfig) -> Result<()> {
    print!("{}", config.redacted().to_toml()?);
    Ok(())
}
