use crate::provider::Metadata;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Preference subset of the user metadata. Absent fields are left untouched
/// when merged.
#[derive(ToSchema, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dietary: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favorites: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dark_mode: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl UserPreferences {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// The fields that are set, as a metadata update.
    #[must_use]
    pub fn to_metadata(&self) -> Metadata {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Metadata::new(),
        }
    }

    /// Read preferences from a metadata bag. Fields are decoded one by one so
    /// a malformed value only drops that field.
    #[must_use]
    pub fn from_metadata(metadata: &Metadata) -> Self {
        fn field<T: serde::de::DeserializeOwned>(metadata: &Metadata, key: &str) -> Option<T> {
            metadata
                .get(key)
                .and_then(|value| serde_json::from_value(value.clone()).ok())
        }

        Self {
            dietary: field(metadata, "dietary"),
            favorites: field(metadata, "favorites"),
            dark_mode: field(metadata, "dark_mode"),
            language: field(metadata, "language"),
        }
    }
}
