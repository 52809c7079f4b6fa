//! Deserialization helpers for documents written by other services.

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer};

/// Like `#[serde(default)]`, but an explicit `null` also yields the default.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Consumes the input value and yields `false`. For flags only the engine sets.
pub(crate) fn engine_owned<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    IgnoredAny::deserialize(deserializer)?;
    Ok(false)
}
