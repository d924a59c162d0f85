//! Attachment validation and upload

use std::path::Path;

use serde::Deserialize;

use crate::client::{AgentClient, check_status};
use crate::error::{Error, Result};
use crate::types::AttachmentRef;

/// Largest accepted attachment
pub const MAX_ATTACHMENT_BYTES: u64 = 10 * 1024 * 1024;

/// MIME types accepted for upload
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/webp",
    "application/pdf",
    "text/csv",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
];

pub const IMAGE_UPLOAD_PATH: &str = "/api/v2/upload/image";
pub const PDF_UPLOAD_PATH: &str = "/api/v2/upload/pdf";
pub const FILE_UPLOAD_PATH: &str = "/api/v2/upload/file";

/// Reject disallowed types and oversized files before any network call
pub fn validate_attachment(name: &str, mime_type: &str, byte_size: u64) -> Result<()> {
    if !ALLOWED_MIME_TYPES.contains(&mime_type) {
        return Err(Error::Validation(format!(
            "{}: file type {} is not supported. Allowed: images (JPEG, PNG, WebP), PDF, CSV, Excel.",
            name, mime_type
        )));
    }
    if byte_size > MAX_ATTACHMENT_BYTES {
        return Err(Error::Validation(format!(
            "{}: file is too large ({:.1} MB). Maximum size is {} MB.",
            name,
            byte_size as f64 / (1024.0 * 1024.0),
            MAX_ATTACHMENT_BYTES / (1024 * 1024)
        )));
    }
    Ok(())
}

/// Infer a MIME type from the file extension
pub fn mime_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "csv" => "text/csv",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => "application/octet-stream",
    }
}

/// Upload endpoint for a MIME type
pub fn upload_path_for(mime_type: &str) -> &'static str {
    if mime_type.starts_with("image/") {
        IMAGE_UPLOAD_PATH
    } else if mime_type == "application/pdf" {
        PDF_UPLOAD_PATH
    } else {
        FILE_UPLOAD_PATH
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    data: Option<UploadData>,
}

#[derive(Debug, Deserialize)]
struct UploadData {
    path: String,
    #[serde(default)]
    size: Option<u64>,
}

impl AgentClient {
    /// Validate and upload a local file, returning the reference to send
    /// with the next turn
    pub async fn upload(&self, path: &Path) -> Result<AttachmentRef> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::Validation(format!("{}: not a file", path.display())))?
            .to_string();
        let mime_type = mime_type_for(path);

        let metadata = tokio::fs::metadata(path).await?;
        validate_attachment(&name, mime_type, metadata.len())?;

        let bytes = tokio::fs::read(path).await?;
        let byte_size = bytes.len() as u64;
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(name.clone())
            .mime_str(mime_type)?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let url = self.url(upload_path_for(mime_type));
        tracing::debug!(file = %name, mime_type, url = %url, "Uploading attachment");

        let response = self.http().post(&url).multipart(form).send().await?;
        let response = check_status(response).await?;
        let body: UploadResponse = response.json().await?;
        let data = body
            .data
            .ok_or_else(|| Error::Upload(format!("{}: response carried no file path", name)))?;

        let local_preview = mime_type
            .starts_with("image/")
            .then(|| path.to_path_buf());

        Ok(AttachmentRef {
            name,
            mime_type: mime_type.to_string(),
            byte_size: data.size.unwrap_or(byte_size),
            stored_path: data.path,
            local_preview,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryCredentials;
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_validate_accepts_allowed_types() {
        assert!(validate_attachment("a.png", "image/png", 1024).is_ok());
        assert!(validate_attachment("a.pdf", "application/pdf", MAX_ATTACHMENT_BYTES).is_ok());
        assert!(validate_attachment("a.csv", "text/csv", 10).is_ok());
    }

    #[test]
    fn test_validate_rejects_type_and_size() {
        let err = validate_attachment("a.exe", "application/octet-stream", 10).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.user_message().contains("not supported"));

        let err = validate_attachment("big.png", "image/png", MAX_ATTACHMENT_BYTES + 1).unwrap_err();
        assert!(err.user_message().contains("too large"));
    }

    #[test]
    fn test_endpoint_selection() {
        assert_eq!(upload_path_for("image/webp"), IMAGE_UPLOAD_PATH);
        assert_eq!(upload_path_for("application/pdf"), PDF_UPLOAD_PATH);
        assert_eq!(upload_path_for("text/csv"), FILE_UPLOAD_PATH);
    }

    #[test]
    fn test_mime_from_extension() {
        assert_eq!(mime_type_for(Path::new("x/Photo.JPG")), "image/jpeg");
        assert_eq!(mime_type_for(Path::new("report.pdf")), "application/pdf");
        assert_eq!(mime_type_for(Path::new("noext")), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_upload_image() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(IMAGE_UPLOAD_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "success",
                "data": {
                    "filename": "20240101_abc.png",
                    "path": "uploads/images/20240101_abc.png",
                    "size": 4
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("chart.png");
        std::fs::write(&file, b"\x89PNG").unwrap();

        let client = AgentClient::new(server.uri(), Arc::new(MemoryCredentials::new()));
        let attachment = client.upload(&file).await.unwrap();

        assert_eq!(attachment.name, "chart.png");
        assert_eq!(attachment.mime_type, "image/png");
        assert_eq!(attachment.byte_size, 4);
        assert_eq!(attachment.stored_path, "uploads/images/20240101_abc.png");
        assert_eq!(attachment.local_preview.as_deref(), Some(file.as_path()));
    }

    #[tokio::test]
    async fn test_upload_rejected_type_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("script.sh");
        std::fs::write(&file, b"echo hi").unwrap();

        let client = AgentClient::new(server.uri(), Arc::new(MemoryCredentials::new()));
        let err = client.upload(&file).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_upload_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(PDF_UPLOAD_PATH))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({"detail": "Only PDF files are allowed"})),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("paper.pdf");
        std::fs::write(&file, b"%PDF-1.4").unwrap();

        let client = AgentClient::new(server.uri(), Arc::new(MemoryCredentials::new()));
        let err = client.upload(&file).await.unwrap_err();
        assert_eq!(err.user_message(), "Only PDF files are allowed");
    }
}
