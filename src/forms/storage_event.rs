use serde::{Deserialize, Serialize};
use serde_valid::Validate;

/// Object-created notification: `{"Records":[{"s3":{"bucket":{"name"},"object":{"key"}}}]}`.
/// Only the first record is processed.
#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct StorageEvent {
    #[serde(rename = "Records")]
    #[validate(min_items = 1)]
    pub records: Vec<StorageRecord>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct StorageRecord {
    pub s3: StorageEntity,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct StorageEntity {
    pub bucket: BucketRef,
    pub object: ObjectRef,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BucketRef {
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ObjectRef {
    pub key: String,
}

impl StorageEvent {
    /// Bucket and decoded key of the first record. Keys arrive form-encoded
    /// (`+` for space, `%XX` escapes).
    pub fn location(&self) -> Option<(String, String)> {
        let record = self.records.first()?;
        let key = decode_object_key(&record.s3.object.key)?;
        Some((record.s3.bucket.name.clone(), key))
    }
}

pub fn decode_object_key(raw: &str) -> Option<String> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .ok()
        .filter(|key| !key.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_decodes_key() {
        let event: StorageEvent = serde_json::from_str(
            r#"{"Records":[{"s3":{"bucket":{"name":"uploads"},"object":{"key":"Q1+servers%282%29.csv"}}}]}"#,
        )
        .unwrap();
        assert!(event.validate().is_ok());
        assert_eq!(
            event.location(),
            Some(("uploads".to_string(), "Q1 servers(2).csv".to_string()))
        );
    }

    #[test]
    fn test_empty_records_fail_validation() {
        let event: StorageEvent = serde_json::from_str(r#"{"Records":[]}"#).unwrap();
        assert!(event.validate().is_err());
        assert_eq!(event.location(), None);
    }
}
