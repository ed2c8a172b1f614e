use thiserror::Error;

#[derive(Debug, Error)]
pub enum GammaSyncError {
    #[error("Generator error: {0}")]
    Generator(#[from] GeneratorError),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
}

/// Failures from the signal generator and its audio backend.
///
/// Starting an already-running generator or stopping a stopped one is not an
/// error; those calls are no-ops.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("Audio device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("Failed to build audio stream: {0}")]
    StreamBuild(String),
    #[error("Failed to play audio stream: {0}")]
    StreamPlay(String),
    #[error("Failed to spawn thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("Invalid {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unsupported config format '{0}' (expected .toml or .json)")]
    UnsupportedFormat(String),
    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid render length: {0} seconds")]
    InvalidLength(f64),
}
