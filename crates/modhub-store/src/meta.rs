use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::{load_document, write_document};
use crate::error::StoreResult;

/// Timestamp format used for `publish_time` (microseconds, numeric offset).
pub const PUBLISH_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f%z";

/// Contents of a version's `meta.yml`.
///
/// Written once when the version is published. After that the stored
/// timestamp is authoritative.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionMeta {
    pub publish_time: String,
}

impl VersionMeta {
    pub fn now() -> Self {
        Self::at(Utc::now())
    }

    pub fn at(time: DateTime<Utc>) -> Self {
        Self {
            publish_time: time.format(PUBLISH_TIME_FORMAT).to_string(),
        }
    }

    pub fn from_system_time(time: SystemTime) -> Self {
        Self::at(DateTime::<Utc>::from(time))
    }

    pub fn load(path: &Path) -> StoreResult<Self> {
        load_document(path)
    }

    pub fn write(&self, path: &Path) -> StoreResult<()> {
        write_document(path, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn format_has_micros_and_offset() {
        let time = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let meta = VersionMeta::at(time);
        assert_eq!(meta.publish_time, "2024-03-09T14:05:07.000000+0000");
    }

    #[test]
    fn write_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.yml");
        let meta = VersionMeta::now();
        meta.write(&path).unwrap();
        assert_eq!(VersionMeta::load(&path).unwrap(), meta);
    }
}
