//! Attachment handling: upload validation, base64 data URIs, and handing
//! decoded bytes to an external viewer.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use std::path::Path;
use std::process::Command;

use crate::error::{Result, TrackerError};
use crate::models::{Document, DocumentKind};

pub const ACCEPTED_TYPES: &str = ".pdf,.docx";

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Checks size before type; nothing is read when either check fails.
pub fn validate_upload(file_name: &str, size: u64, max_size_mb: u64) -> Result<DocumentKind> {
    if size > max_size_mb * BYTES_PER_MB {
        return Err(TrackerError::FileTooLarge {
            limit_mb: max_size_mb,
        });
    }
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(DocumentKind::from_extension)
        .ok_or(TrackerError::UnsupportedFileType {
            accepted: ACCEPTED_TYPES,
        })
}

pub fn load_upload(path: &Path, max_size_mb: u64, id: String) -> Result<Document> {
    let file_name = sanitize_filename(
        &path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    );
    let size = std::fs::metadata(path)?.len();
    let kind = match validate_upload(&file_name, size, max_size_mb) {
        Ok(kind) => kind,
        Err(e) => {
            tracing::warn!("Rejected upload {}: {}", path.display(), e);
            return Err(e);
        }
    };

    let bytes = std::fs::read(path)?;
    tracing::info!("Loaded {} ({} bytes) as {}", file_name, bytes.len(), kind.as_str());
    Ok(Document {
        id,
        name: file_name,
        kind,
        data: encode_data_uri(kind, &bytes),
        last_updated: Utc::now(),
    })
}

pub fn encode_data_uri(kind: DocumentKind, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", kind.mime_type(), STANDARD.encode(bytes))
}

/// Accepts either a full data URI or a bare base64 payload.
pub fn decode(data: &str) -> Result<Vec<u8>> {
    let payload = match data.split_once(',') {
        Some((_, rest)) => rest,
        None => data,
    };
    Ok(STANDARD.decode(payload.trim())?)
}

pub fn extract(doc: &Document, dest: &Path) -> Result<u64> {
    let bytes = decode(&doc.data)?;
    std::fs::write(dest, &bytes)?;
    Ok(bytes.len() as u64)
}

/// Writes the document into a scratch directory and runs `viewer` on it.
///
/// Many launchers (`xdg-open` handing off to `gio open`, for one) return
/// before the real viewer has read the file, so the scratch copy is kept
/// until `hold` returns and removed afterwards.
pub fn view<F>(doc: &Document, viewer: &str, hold: F) -> Result<()>
where
    F: FnOnce(&Path) -> std::io::Result<()>,
{
    let bytes = decode(&doc.data)?;
    let scratch = tempfile::tempdir()?;
    let path = scratch.path().join(sanitize_filename(&doc.name));
    std::fs::write(&path, &bytes)?;

    let mut parts = viewer.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| TrackerError::Validation("No viewer configured".to_string()))?;

    tracing::debug!("Opening {} with {}", path.display(), viewer);
    let status = Command::new(program).args(parts).arg(&path).status()?;
    if !status.success() {
        return Err(TrackerError::Validation(format!(
            "Viewer '{}' exited with {}",
            viewer, status
        )));
    }
    hold(&path)?;
    scratch.close()?;
    Ok(())
}

pub fn format_size(bytes: u64) -> String {
    if bytes >= BYTES_PER_MB {
        format!("{:.1} MB", bytes as f64 / BYTES_PER_MB as f64)
    } else {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    }
}

/// Strips path separators and NULs, capped at 255 chars.
fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .filter(|c| *c != '/' && *c != '\\' && *c != '\0')
        .take(255)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io::Write;

    #[test]
    fn oversized_upload_is_rejected_before_type_check() {
        let twelve_mb = 12 * BYTES_PER_MB;
        let err = validate_upload("resume.pdf", twelve_mb, 10).unwrap_err();
        assert_eq!(err.to_string(), "File size exceeds 10MB limit");
        assert!(matches!(
            validate_upload("resume.txt", twelve_mb, 10),
            Err(TrackerError::FileTooLarge { limit_mb: 10 })
        ));
    }

    #[test]
    fn only_pdf_and_docx_are_accepted() {
        assert_eq!(validate_upload("CV.PDF", 10, 5).unwrap(), DocumentKind::Pdf);
        assert_eq!(validate_upload("cover.docx", 10, 5).unwrap(), DocumentKind::Docx);
        let err = validate_upload("cover.doc", 10, 5).unwrap_err();
        assert_eq!(err.to_string(), "Invalid file type. Accepted types: .pdf,.docx");
        assert!(validate_upload("noextension", 10, 5).is_err());
    }

    #[test]
    fn exactly_at_the_cap_is_allowed() {
        assert!(validate_upload("a.pdf", 5 * BYTES_PER_MB, 5).is_ok());
        assert!(validate_upload("a.pdf", 5 * BYTES_PER_MB + 1, 5).is_err());
    }

    #[test]
    fn data_uri_decodes_back_to_bytes() {
        let bytes = b"%PDF-1.7 fake";
        let uri = encode_data_uri(DocumentKind::Pdf, bytes);
        assert!(uri.starts_with("data:application/pdf;base64,"));
        assert_eq!(decode(&uri).unwrap(), bytes);
        assert_eq!(decode(&STANDARD.encode(bytes)).unwrap(), bytes);
        assert!(matches!(decode("data:x;base64,@@@"), Err(TrackerError::Decode(_))));
    }

    #[test]
    fn upload_from_disk_and_extract() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("resume.pdf");
        std::fs::File::create(&src)
            .unwrap()
            .write_all(b"%PDF-1.4 body")
            .unwrap();

        let doc = load_upload(&src, 10, "1".to_string()).unwrap();
        assert_eq!(doc.name, "resume.pdf");
        assert_eq!(doc.kind, DocumentKind::Pdf);

        let out = dir.path().join("out.pdf");
        assert_eq!(extract(&doc, &out).unwrap(), 13);
        assert_eq!(std::fs::read(&out).unwrap(), b"%PDF-1.4 body");
    }

    #[test]
    fn sanitize_drops_separators() {
        assert_eq!(sanitize_filename("../etc\\passwd"), "..etcpasswd");
    }

    #[test]
    fn size_formatting() {
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * BYTES_PER_MB / 2), "1.5 MB");
    }

    fn sample_pdf() -> Document {
        Document {
            id: "d1".to_string(),
            name: "cv.pdf".to_string(),
            kind: DocumentKind::Pdf,
            data: encode_data_uri(DocumentKind::Pdf, b"%PDF-1.4"),
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn viewed_copy_lives_until_hold_returns() {
        let seen = RefCell::new(None);
        view(&sample_pdf(), "test -f", |path| {
            assert_eq!(std::fs::read(path)?, b"%PDF-1.4");
            *seen.borrow_mut() = Some(path.to_path_buf());
            Ok(())
        })
        .unwrap();

        let path = seen.into_inner().unwrap();
        assert_eq!(path.file_name().unwrap(), "cv.pdf");
        assert!(!path.exists());
    }

    #[test]
    fn failing_viewer_is_reported_and_skips_hold() {
        let mut held = false;
        let err = view(&sample_pdf(), "false", |_| {
            held = true;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, TrackerError::Validation(_)));
        assert!(!held);
    }

    #[test]
    fn blank_viewer_is_rejected() {
        let err = view(&sample_pdf(), "  ", |_| Ok(())).unwrap_err();
        assert_eq!(err.to_string(), "No viewer configured");
    }
}
