//! Configuration source loading

use crate::validation::Validate;
use crate::{AxonConfig, ConfigResult};

/// Trait for loading configuration from different sources
pub trait ConfigurationSource {
    /// Load configuration from this source
    ///
    /// # Errors
    /// Returns configuration loading errors
    fn load(&self) -> ConfigResult<AxonConfig>;

    /// Name of this source, for debugging/logging
    fn name(&self) -> &'static str;
}

/// Load configuration from environment variables.
///
/// This is the only source the daemon uses; the env vars it recognizes are
/// documented on [`AxonConfig::from_env`].
pub struct EnvironmentSource;

impl ConfigurationSource for EnvironmentSource {
    fn load(&self) -> ConfigResult<AxonConfig> {
        let config = AxonConfig::from_env()?;
        config.validate()?;
        Ok(config)
    }

    fn name(&self) -> &'static str {
        "environment"
    }
}
