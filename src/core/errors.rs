use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StateError {
    #[error("Vector is not normalized. Norm squared: {0}")]
    NotNormalized(f64),

    #[error("Invalid dimensions: expected {expected} amplitudes, got {got}")]
    InvalidDimensions { expected: usize, got: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CipherError {
    #[error("Key is not valid")]
    InvalidKey,

    #[error("Key is too short: message needs {message_bits} bits, key has {key_bits}")]
    KeyTooShort { message_bits: usize, key_bits: usize },

    #[error("Decrypted message is not valid UTF-8")]
    InvalidUtf8,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unable to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid option {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid protocol \"{declared}\" - expecting {expected}")]
    UnsupportedProtocol { declared: String, expected: String },

    #[error("Unknown protocol name \"{0}\"")]
    UnknownProtocol(String),

    #[error("Cannot {operation} while the session is {stage}")]
    OutOfOrder {
        operation: &'static str,
        stage: &'static str,
    },

    #[error(transparent)]
    Cipher(#[from] CipherError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
