use serde::{Deserialize, Serialize};

use crate::{api::FileId, FileKind};

/// Metadata of one stored file, as listed by `GET /files`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub id: FileId,
    #[serde(default)]
    pub filename: String,
    pub original_filename: String,
    #[serde(default)]
    pub mimetype: String,
    pub size: i64,
    pub upload_date: chrono::DateTime<chrono::Utc>,
}

impl FileRecord {
    pub fn kind(&self) -> FileKind {
        FileKind::from_filename(&self.original_filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_without_stored_filename() {
        let record: FileRecord = serde_json::from_str(
            r#"{"id":1,"original_filename":"a.txt","mimetype":"text/plain","size":10,"upload_date":"2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(record.id, FileId(1));
        assert_eq!(record.filename, "");
        assert_eq!(record.kind(), FileKind::Text);
    }

    #[test]
    fn decodes_offset_timestamps() {
        let record: FileRecord = serde_json::from_str(
            r#"{"id":2,"filename":"1.png","original_filename":"b.png","mimetype":"image/png","size":3,"upload_date":"2024-05-01T12:30:00.123456789+02:00"}"#,
        )
        .unwrap();
        assert_eq!(record.upload_date.to_rfc3339(), "2024-05-01T10:30:00.123456789+00:00");
    }
}
