use crate::constants::{DEFAULT_MAX_AUDIO_SIZE_MB, DEFAULT_MAX_IMAGE_SIZE_MB};
use crate::error::AppError;
use crate::models::Bucket;

/// Upload validation errors
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FileValidationError {
    #[error("File size ({size} bytes) exceeds maximum allowed size ({max} bytes)")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Invalid file type: {content_type}. Allowed types: {}", .allowed.join(", "))]
    InvalidContentType {
        content_type: String,
        allowed: Vec<String>,
    },

    #[error("File content does not match declared type {declared} (detected {detected})")]
    ContentMismatch { declared: String, detected: String },

    #[error("Could not recognise file content")]
    UnrecognisedContent,

    #[error("Empty file")]
    EmptyFile,
}

impl From<FileValidationError> for AppError {
    fn from(err: FileValidationError) -> Self {
        match err {
            FileValidationError::FileTooLarge { .. } => AppError::PayloadTooLarge(err.to_string()),
            FileValidationError::InvalidContentType { .. }
            | FileValidationError::ContentMismatch { .. }
            | FileValidationError::UnrecognisedContent => {
                AppError::UnsupportedMediaType(err.to_string())
            }
            FileValidationError::EmptyFile => AppError::InvalidInput(err.to_string()),
        }
    }
}

const MP3_SIGNATURES: &[&[u8]] = &[&[0xff, 0xfb], &[0xff, 0xf3], &[0xff, 0xf2], b"ID3"];

/// Detect a file's type from its leading bytes
///
/// Returns a canonical MIME type, or `None` when no known signature matches.
pub fn detect_content_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.len() >= 12 && bytes.starts_with(b"RIFF") {
        return match &bytes[8..12] {
            b"WAVE" => Some("audio/wav"),
            b"WEBP" => Some("image/webp"),
            _ => None,
        };
    }
    if MP3_SIGNATURES.iter().any(|sig| bytes.starts_with(sig)) {
        return Some("audio/mpeg");
    }
    if bytes.starts_with(b"fLaC") {
        return Some("audio/flac");
    }
    if bytes.starts_with(b"OggS") {
        return Some("audio/ogg");
    }
    if bytes.starts_with(b"FORM") {
        return Some("audio/aiff");
    }
    if bytes.len() >= 8 && &bytes[4..8] == b"ftyp" {
        return Some("audio/mp4");
    }
    if bytes.starts_with(&[0xff, 0xd8, 0xff]) {
        return Some("image/jpeg");
    }
    if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]) {
        return Some("image/png");
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return Some("image/gif");
    }
    None
}

/// Families of MIME aliases that describe the same container
fn canonical_content_type(content_type: &str) -> &str {
    match content_type {
        "audio/mp3" => "audio/mpeg",
        "audio/wave" | "audio/x-wav" => "audio/wav",
        "audio/x-flac" => "audio/flac",
        "audio/opus" => "audio/ogg",
        "audio/x-m4a" => "audio/mp4",
        "audio/x-aiff" => "audio/aiff",
        other => other,
    }
}

/// Validates uploads against a bucket's type allow-list and size limit
#[derive(Debug, Clone)]
pub struct UploadValidator {
    max_audio_size: u64,
    max_image_size: u64,
}

impl Default for UploadValidator {
    fn default() -> Self {
        Self::with_default_limits()
    }
}

impl UploadValidator {
    pub fn new(max_audio_size: u64, max_image_size: u64) -> Self {
        Self {
            max_audio_size,
            max_image_size,
        }
    }

    /// Limits matching the server's defaults
    pub fn with_default_limits() -> Self {
        Self::new(
            DEFAULT_MAX_AUDIO_SIZE_MB * 1024 * 1024,
            DEFAULT_MAX_IMAGE_SIZE_MB * 1024 * 1024,
        )
    }

    pub fn max_size_for(&self, bucket: Bucket) -> u64 {
        if bucket.is_audio() {
            self.max_audio_size
        } else {
            self.max_image_size
        }
    }

    /// Check a declared upload before any bytes move
    pub fn validate_declared(
        &self,
        bucket: Bucket,
        content_type: &str,
        size: u64,
    ) -> Result<(), FileValidationError> {
        if size == 0 {
            return Err(FileValidationError::EmptyFile);
        }
        let max = self.max_size_for(bucket);
        if size > max {
            return Err(FileValidationError::FileTooLarge { size, max });
        }
        let normalized = content_type.trim().to_lowercase();
        if !bucket.allowed_content_types().contains(&normalized.as_str()) {
            return Err(FileValidationError::InvalidContentType {
                content_type: content_type.to_string(),
                allowed: bucket
                    .allowed_content_types()
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            });
        }
        Ok(())
    }

    /// Check received bytes: declared checks plus magic-number sniffing
    pub fn validate_content(
        &self,
        bucket: Bucket,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<(), FileValidationError> {
        self.validate_declared(bucket, content_type, bytes.len() as u64)?;

        let detected = detect_content_type(bytes).ok_or(FileValidationError::UnrecognisedContent)?;
        let declared = content_type.trim().to_lowercase();
        if canonical_content_type(&declared) != detected {
            return Err(FileValidationError::ContentMismatch {
                declared,
                detected: detected.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 0];

    fn validator() -> UploadValidator {
        UploadValidator::new(1000, 100)
    }

    #[test]
    fn detects_common_signatures() {
        assert_eq!(detect_content_type(b"ID3\x04\x00rest"), Some("audio/mpeg"));
        assert_eq!(detect_content_type(b"RIFF\0\0\0\0WAVEfmt "), Some("audio/wav"));
        assert_eq!(detect_content_type(b"RIFF\0\0\0\0WEBPVP8 "), Some("image/webp"));
        assert_eq!(detect_content_type(PNG), Some("image/png"));
        assert_eq!(detect_content_type(b"\0\0\0\x20ftypM4A "), Some("audio/mp4"));
        assert_eq!(detect_content_type(b"plain text"), None);
    }

    #[test]
    fn size_limit_is_per_bucket() {
        let v = validator();
        assert!(v
            .validate_declared(Bucket::AudioSubmissions, "audio/mpeg", 500)
            .is_ok());
        assert_eq!(
            v.validate_declared(Bucket::SubmissionImages, "image/png", 500),
            Err(FileValidationError::FileTooLarge { size: 500, max: 100 })
        );
    }

    #[test]
    fn audio_type_is_rejected_for_image_bucket() {
        let err = validator()
            .validate_declared(Bucket::SubmissionImages, "audio/mpeg", 10)
            .unwrap_err();
        assert!(matches!(err, FileValidationError::InvalidContentType { .. }));
        assert_eq!(
            AppError::from(err).to_string().split(':').next(),
            Some("Unsupported media type")
        );
    }

    #[test]
    fn aliases_match_detected_type() {
        assert!(validator()
            .validate_content(Bucket::AudioSubmissions, "audio/mp3", b"ID3\x04\x00rest")
            .is_ok());
    }

    #[test]
    fn spoofed_content_is_rejected() {
        let err = validator()
            .validate_content(Bucket::SubmissionImages, "image/jpeg", PNG)
            .unwrap_err();
        assert!(matches!(err, FileValidationError::ContentMismatch { .. }));
    }

    #[test]
    fn empty_file_is_rejected() {
        assert_eq!(
            validator().validate_content(Bucket::SubmissionImages, "image/png", &[]),
            Err(FileValidationError::EmptyFile)
        );
    }
}
