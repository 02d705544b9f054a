use serde::Serialize;
use serde::de::DeserializeOwned;
use sled::Tree;

use crate::core::error::AppError;

pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, AppError> {
    serde_json::to_vec(value)
        .map_err(|err| AppError::storage(format!("failed to encode record: {err}")))
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, AppError> {
    serde_json::from_slice(bytes)
        .map_err(|err| AppError::storage(format!("failed to decode record: {err}")))
}

pub fn get_json<T: DeserializeOwned>(
    tree: &Tree,
    key: impl AsRef<[u8]>,
) -> Result<Option<T>, AppError> {
    tree.get(key)
        .map_err(|err| AppError::storage(format!("lookup failed: {err}")))?
        .map(|bytes| decode(&bytes))
        .transpose()
}

pub fn put_json<T: Serialize>(
    tree: &Tree,
    key: impl AsRef<[u8]>,
    value: &T,
) -> Result<(), AppError> {
    let data = encode(value)?;
    tree.insert(key.as_ref(), data)
        .map_err(|err| AppError::storage(format!("write failed: {err}")))?;
    Ok(())
}

/// All records under `prefix`, in key order.
pub fn scan_json<T: DeserializeOwned>(
    tree: &Tree,
    prefix: impl AsRef<[u8]>,
) -> Result<Vec<T>, AppError> {
    tree.scan_prefix(prefix)
        .map(|entry| {
            let (_, value) =
                entry.map_err(|err| AppError::storage(format!("scan failed: {err}")))?;
            decode(&value)
        })
        .collect()
}

pub fn id_key(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}
