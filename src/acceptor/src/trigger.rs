use common::{Error, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Notification {
    #[serde(rename = "Records", default)]
    records: Vec<NotificationRecord>,
}

#[derive(Debug, Deserialize)]
struct NotificationRecord {
    s3: Option<S3Entity>,
}

#[derive(Debug, Deserialize)]
struct S3Entity {
    object: Option<S3Object>,
}

#[derive(Debug, Deserialize)]
struct S3Object {
    key: Option<String>,
}

/// The needs file an invocation was triggered for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    /// Decoded object key of the needs file
    pub key: String,
    /// Leading directory of the key, e.g. `dt=20190725`
    pub partition: String,
}

impl Trigger {
    /// Parse an object-created notification.
    ///
    /// Only the first record is used.
    pub fn parse(body: &str) -> Result<Self> {
        let notification: Notification = serde_json::from_str(body).map_err(|e| {
            Error::validation("Message body is not an event notification").with_source(e)
        })?;

        let object = notification
            .records
            .into_iter()
            .next()
            .and_then(|record| record.s3)
            .and_then(|s3| s3.object)
            .ok_or_else(|| Error::validation("s3 object parameter missing."))?;

        let raw_key = object.key.unwrap_or_default();
        if raw_key.trim().is_empty() {
            return Err(Error::validation("s3 key cannot be empty."));
        }

        let key = urlencoding::decode(&raw_key)
            .map_err(|e| Error::validation(format!("s3 key is not valid UTF-8: {raw_key}")).with_source(e))?
            .into_owned();

        Ok(Self {
            partition: partition_of(&key).to_string(),
            key,
        })
    }
}

/// First `/`-separated segment of an object key
pub fn partition_of(key: &str) -> &str {
    key.split('/').next().unwrap_or(key)
}
