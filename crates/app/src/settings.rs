use vigil_core::config::AppConfig;

/// # Summary
/// Loads the application configuration.
///
/// # Logic
/// 1. Reads `vigil.toml` (or any format `config` recognises under that stem) when present.
/// 2. Applies `VIGIL__SECTION__KEY` environment overrides, e.g. `VIGIL__SESSION__PORT=4000`.
/// 3. Missing keys fall back to `AppConfig::default()`.
pub fn load(path: &str) -> Result<AppConfig, config::ConfigError> {
    config::Config::builder()
        .add_source(config::File::with_name(path).required(false))
        .add_source(
            config::Environment::with_prefix("VIGIL")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = load("does-not-exist/vigil").unwrap();
        assert_eq!(config, AppConfig::default());
    }
}
