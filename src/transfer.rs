use chrono::NaiveDate;
use std::path::Path;

use crate::error::{Result, TrackerError};
use crate::models::JobApplication;

const BYTES_PER_MB: u64 = 1024 * 1024;

pub fn export_json(apps: &[JobApplication]) -> Result<String> {
    Ok(serde_json::to_string_pretty(apps)?)
}

pub fn parse_export(raw: &str) -> Result<Vec<JobApplication>> {
    Ok(serde_json::from_str(raw)?)
}

/// Reads an export file, refusing anything over `max_size_mb` before parsing.
pub fn read_export(path: &Path, max_size_mb: u64) -> Result<Vec<JobApplication>> {
    let size = std::fs::metadata(path)?.len();
    if size > max_size_mb * BYTES_PER_MB {
        tracing::warn!("Rejected import {}: {} bytes", path.display(), size);
        return Err(TrackerError::FileTooLarge {
            limit_mb: max_size_mb,
        });
    }
    parse_export(&std::fs::read_to_string(path)?)
}

pub fn export_file_name(today: NaiveDate) -> String {
    format!("job-applications-{}.json", today.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::tests::{acme, test_db};
    use crate::documents::encode_data_uri;
    use crate::models::{Document, DocumentKind};

    fn pdf(bytes: &[u8]) -> Document {
        Document {
            id: "d1".to_string(),
            name: "cv.pdf".to_string(),
            kind: DocumentKind::Pdf,
            data: encode_data_uri(DocumentKind::Pdf, bytes),
            last_updated: chrono::Utc::now(),
        }
    }

    #[test]
    fn exported_file_imports_into_a_fresh_store() {
        let source = test_db();
        let mut with_doc = acme();
        with_doc.resume = Some(pdf(b"%PDF"));
        source.add_application(with_doc).unwrap();
        source.add_application(acme()).unwrap();
        let exported = export_json(&source.list_applications().unwrap()).unwrap();
        assert!(exported.contains("\"companyName\": \"Acme\""));

        let target = test_db();
        let stats = target.import_applications(&parse_export(&exported).unwrap()).unwrap();
        assert_eq!(stats.inserted, 2);
        assert_eq!(target.list_applications().unwrap(), source.list_applications().unwrap());
    }

    #[test]
    fn export_with_large_attachment_reads_back_under_default_cap() {
        let config = Config::default();
        let source = test_db();
        let mut with_doc = acme();
        with_doc.resume = Some(pdf(&vec![0x25; 4 * 1024 * 1024]));
        with_doc.cover_letter = Some(pdf(&vec![0x25; 4 * 1024 * 1024]));
        source.add_application(with_doc).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(export_file_name(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()));
        std::fs::write(&path, export_json(&source.list_applications().unwrap()).unwrap()).unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > config.upload.max_document_mb * BYTES_PER_MB);

        let apps = read_export(&path, config.import.max_size_mb).unwrap();
        assert_eq!(apps, source.list_applications().unwrap());
    }

    #[test]
    fn oversized_import_is_rejected_before_parsing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.json");
        let file = std::fs::File::create(&path).unwrap();
        file.set_len(2 * BYTES_PER_MB).unwrap();

        let err = read_export(&path, 1).unwrap_err();
        assert_eq!(err.to_string(), "File size exceeds 1MB limit");
    }

    #[test]
    fn malformed_export_is_rejected() {
        assert!(parse_export("[{\"companyName\": 3}]").is_err());
    }

    #[test]
    fn file_name_carries_the_date() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        assert_eq!(export_file_name(day), "job-applications-2024-01-10.json");
    }
}
