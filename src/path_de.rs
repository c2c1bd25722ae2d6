use serde::de::DeserializeOwned;
use thiserror::Error;

/// A decode failure located by its JSON path (e.g. `types.User.properties[2].type`).
#[derive(Debug, Error)]
#[error("at JSON path {json_path} → {message}")]
pub struct PathError {
    pub json_path: String,
    pub message: String,
}

fn located<E: std::fmt::Display>(err: serde_path_to_error::Error<E>) -> PathError {
    PathError {
        json_path: err.path().to_string(),
        message: err.into_inner().to_string(),
    }
}

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, PathError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(located)
}

pub fn from_value_with_path<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, PathError> {
    serde_path_to_error::deserialize::<_, T>(value).map_err(located)
}
