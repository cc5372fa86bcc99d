//! Attachment upload policy and validation
//!
//! A batch larger than `max_files` is rejected as a whole before any file is
//! inspected. Otherwise every file is checked independently for size,
//! extension, declared MIME type and sniffed content, and every violation is
//! reported in batch order.

mod sniff;
mod store;

pub use sniff::{detect_mime, mime_for_extension};
pub use store::{FileStore, LocalFileStore};

#[cfg(test)]
pub use store::MockFileStore;

use crate::error::{HelpdeskError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Upload limits and whitelists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttachmentPolicy {
    pub max_files: usize,
    pub max_size_bytes: u64,
    pub allowed_extensions: Vec<String>,
    pub allowed_mime_types: Vec<String>,
}

impl Default for AttachmentPolicy {
    fn default() -> Self {
        Self {
            max_files: 5,
            max_size_bytes: 10_485_760,
            allowed_extensions: ["jpg", "jpeg", "png", "pdf", "doc", "docx"]
                .into_iter()
                .map(String::from)
                .collect(),
            allowed_mime_types: [
                "image/jpeg",
                "image/png",
                "application/pdf",
                "application/msword",
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// A file submitted with a new ticket
#[derive(Debug, Clone)]
pub struct AttachmentUpload {
    /// Client-supplied file name
    pub file_name: String,
    /// Client-declared MIME type
    pub declared_mime: String,
    pub bytes: Vec<u8>,
}

impl AttachmentUpload {
    pub fn new(
        file_name: impl Into<String>,
        declared_mime: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            declared_mime: declared_mime.into(),
            bytes,
        }
    }

    #[must_use]
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Lower-cased extension of the client file name, empty if none
    #[must_use]
    pub fn extension(&self) -> String {
        Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default()
    }
}

/// An upload that passed validation
#[derive(Debug, Clone, Copy)]
pub struct AcceptedAttachment<'a> {
    pub upload: &'a AttachmentUpload,
    /// Type detected from the content
    pub mime_type: &'static str,
}

#[derive(Debug, Clone, Default)]
pub struct AttachmentValidator {
    policy: AttachmentPolicy,
}

impl AttachmentValidator {
    #[must_use]
    pub const fn new(policy: AttachmentPolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub const fn policy(&self) -> &AttachmentPolicy {
        &self.policy
    }

    /// Validate a batch, returning the accepted files or every violation
    pub fn validate<'a>(&self, files: &'a [AttachmentUpload]) -> Result<Vec<AcceptedAttachment<'a>>> {
        if files.len() > self.policy.max_files {
            return Err(HelpdeskError::TooManyFiles {
                max: self.policy.max_files,
                actual: files.len(),
            });
        }

        let mut accepted = Vec::with_capacity(files.len());
        let mut violations = Vec::new();

        for file in files {
            match self.check_file(file) {
                Ok(mime_type) => accepted.push(AcceptedAttachment {
                    upload: file,
                    mime_type,
                }),
                Err(mut errors) => violations.append(&mut errors),
            }
        }

        if violations.is_empty() {
            Ok(accepted)
        } else {
            Err(HelpdeskError::InvalidFile(violations))
        }
    }

    fn check_file(&self, file: &AttachmentUpload) -> std::result::Result<&'static str, Vec<String>> {
        let mut errors = Vec::new();
        let name = &file.file_name;

        if file.size() > self.policy.max_size_bytes {
            errors.push(format!(
                "File {name} exceeds maximum size of {}",
                human_size(self.policy.max_size_bytes)
            ));
        }

        let extension = file.extension();
        let extension_allowed = self.is_allowed_extension(&extension);
        if !extension_allowed {
            if extension.is_empty() {
                errors.push(format!("File {name} has no extension"));
            } else {
                errors.push(format!("File {name}: type .{extension} is not allowed"));
            }
        }

        if !self.is_allowed_mime(&file.declared_mime) {
            errors.push(format!(
                "File {name}: declared type {} is not allowed",
                file.declared_mime
            ));
        }

        let detected = detect_mime(&file.bytes);
        match detected {
            Some(mime) if self.is_allowed_mime(mime) => {
                if extension_allowed {
                    if let Some(expected) = mime_for_extension(&extension) {
                        if expected != mime {
                            errors.push(format!(
                                "File {name}: content does not match the .{extension} extension"
                            ));
                        }
                    }
                }
            },
            _ => errors.push(format!("Invalid file type for {name}")),
        }

        match (detected, errors.is_empty()) {
            (Some(mime), true) => Ok(mime),
            _ => Err(errors),
        }
    }

    fn is_allowed_extension(&self, extension: &str) -> bool {
        !extension.is_empty()
            && self
                .policy
                .allowed_extensions
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(extension))
    }

    fn is_allowed_mime(&self, mime: &str) -> bool {
        self.policy
            .allowed_mime_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(mime))
    }
}

fn human_size(bytes: u64) -> String {
    const MIB: u64 = 1024 * 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else {
        format!("{bytes} bytes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(name: &str) -> AttachmentUpload {
        AttachmentUpload::new(name, "image/png", b"\x89PNG\r\n\x1a\n0000".to_vec())
    }

    fn validator() -> AttachmentValidator {
        AttachmentValidator::new(AttachmentPolicy::default())
    }

    #[test]
    fn test_accepts_valid_batch() {
        let files = vec![
            png("screen.png"),
            AttachmentUpload::new("log.pdf", "application/pdf", b"%PDF-1.4 data".to_vec()),
        ];
        let accepted = validator().validate(&files).unwrap();
        assert_eq!(accepted.len(), 2);
        assert_eq!(accepted[1].mime_type, "application/pdf");
    }

    #[test]
    fn test_too_many_files_rejects_whole_batch() {
        let files: Vec<_> = (0..6).map(|i| png(&format!("shot{i}.png"))).collect();
        let err = validator().validate(&files).unwrap_err();
        assert!(matches!(
            err,
            HelpdeskError::TooManyFiles { max: 5, actual: 6 }
        ));
    }

    #[test]
    fn test_reports_only_offending_file() {
        let files = vec![
            png("a.png"),
            AttachmentUpload::new("setup.exe", "application/x-msdownload", b"MZ\x90\0".to_vec()),
            png("b.png"),
        ];
        let HelpdeskError::InvalidFile(errors) = validator().validate(&files).unwrap_err() else {
            panic!("expected InvalidFile");
        };
        assert!(!errors.is_empty());
        assert!(errors.iter().all(|e| e.contains("setup.exe")));
    }

    #[test]
    fn test_size_and_type_reported_together() {
        let policy = AttachmentPolicy {
            max_size_bytes: 8,
            ..AttachmentPolicy::default()
        };
        let file = AttachmentUpload::new("big.txt", "text/plain", vec![b'x'; 16]);
        let HelpdeskError::InvalidFile(errors) = AttachmentValidator::new(policy)
            .validate(std::slice::from_ref(&file))
            .unwrap_err()
        else {
            panic!("expected InvalidFile");
        };
        assert!(errors.iter().any(|e| e.contains("exceeds maximum size of 8 bytes")));
        assert!(errors.iter().any(|e| e.contains("type .txt is not allowed")));
    }

    #[test]
    fn test_spoofed_extension_is_rejected() {
        // executable renamed to look like an image, with a matching declared type
        let file = AttachmentUpload::new("photo.jpg", "image/jpeg", b"MZ\x90\0\x03".to_vec());
        let HelpdeskError::InvalidFile(errors) = validator()
            .validate(std::slice::from_ref(&file))
            .unwrap_err()
        else {
            panic!("expected InvalidFile");
        };
        assert_eq!(errors, vec!["Invalid file type for photo.jpg".to_string()]);
    }

    #[test]
    fn test_content_must_match_extension() {
        let file = AttachmentUpload::new("report.pdf", "application/pdf", b"\xFF\xD8\xFF\xE0".to_vec());
        let HelpdeskError::InvalidFile(errors) = validator()
            .validate(std::slice::from_ref(&file))
            .unwrap_err()
        else {
            panic!("expected InvalidFile");
        };
        assert!(errors[0].contains("does not match the .pdf extension"));
    }

    #[test]
    fn test_declared_mime_checked_independently() {
        let file = AttachmentUpload::new("scan.png", "application/octet-stream", png("x.png").bytes);
        let HelpdeskError::InvalidFile(errors) = validator()
            .validate(std::slice::from_ref(&file))
            .unwrap_err()
        else {
            panic!("expected InvalidFile");
        };
        assert_eq!(
            errors,
            vec!["File scan.png: declared type application/octet-stream is not allowed".to_string()]
        );
    }

    #[test]
    fn test_empty_batch_is_accepted() {
        assert!(validator().validate(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_default_size_label() {
        assert_eq!(human_size(10_485_760), "10MB");
    }
}
