use serde::{Deserialize, Deserializer};
use validator::Validate;

use crate::validation::required;

// Request body for creating or updating a Todo. Absent or null fields fall back to
// their defaults so that the validator, not the decoder, reports them.
#[derive(Debug, Default, serde::Serialize, serde::Deserialize, Validate)]
pub struct TodoSchema {
    #[serde(default, deserialize_with = "null_as_default")]
    #[validate(custom(function = "required"), length(max = 50, message = "size is 1～50"))]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    #[validate(custom(function = "required"), length(max = 100, message = "size is 1～100"))]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub completed: bool,
}

impl TodoSchema {
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
