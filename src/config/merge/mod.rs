pub mod service;

pub(crate) mod policy {
    //! Lowest layer of every merge: the serialized built-in defaults.

    use crate::config::QueryTreeConfig;
    use config::builder::DefaultState;
    use config::{Config, ConfigBuilder, ConfigError};

    pub(crate) fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let defaults = Config::try_from(&QueryTreeConfig::default())?;
        Ok(Config::builder().add_source(defaults))
    }
}
