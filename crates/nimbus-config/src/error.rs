use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config directory could not be determined")]
    ConfigDirNotFound,

    #[error(
        "no settings file found. Searched:\n\
        - current directory: nimbus.local.yaml, nimbus.yaml\n\
        - ./.nimbus/ directory\n\
        - ~/.config/nimbus/nimbus.yaml\n\
        A path can also be given directly via NIMBUS_CONFIG_PATH"
    )]
    SettingsFileNotFound,

    #[error("invalid settings: {0}")]
    Invalid(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
