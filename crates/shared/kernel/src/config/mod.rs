use config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::info;

/// Custom error type for config loading.
#[shroud_derive::shroud_error]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },
}

/// Prefix of environment overrides, e.g. `SHROUD__STORE__CACHE_TTL_MS`.
pub const ENV_PREFIX: &str = "SHROUD";

/// Loads a configuration file layered with environment overrides.
///
/// 1. **Base File**: Settings from `path` (any format the `config` crate recognizes by
///    extension). Defaults to `shroud` in the working directory. The file is optional;
///    missing files leave every field at its serde default.
/// 2. **Environment Overrides**: Variables prefixed with `SHROUD__`. Nested fields are
///    joined by double underscores (`SHROUD__LOG__LEVEL` maps to `log.level`).
///
/// # Errors
/// Returns [`ConfigError::Config`] when a source is malformed or the merged values do
/// not deserialize into `T`.
///
/// # Example
/// ```rust
/// use shroud_kernel::config::load_config;
///
/// #[derive(Default, serde::Deserialize)]
/// struct AppConfig {
///     #[serde(default)]
///     verbose: bool,
/// }
///
/// let cfg: AppConfig = load_config(Some("does/not/exist")).unwrap_or_default();
/// assert!(!cfg.verbose);
/// ```
pub fn load_config<T>(path: Option<impl AsRef<Path>>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let effective_path = path.map_or_else(|| PathBuf::from("shroud"), |p| p.as_ref().to_path_buf());

    let builder = Config::builder()
        .add_source(File::from(effective_path.as_path()).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .convert_case(config::Case::Snake),
        );

    info!(path = %effective_path.display(), "Loading config");

    let config = builder
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")?;

    Ok(config)
}
