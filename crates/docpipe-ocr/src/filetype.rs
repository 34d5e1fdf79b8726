//! File type dispatch for text extraction.

use std::path::Path;

/// Supported input kinds, detected from MIME type with an extension fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    PlainText,
    Pdf,
    Image,
    Unknown,
}

impl FileKind {
    /// Detect from a MIME type string.
    pub fn from_mime(mime: &str) -> Self {
        if mime == "application/pdf" {
            Self::Pdf
        } else if mime.starts_with("image/") {
            Self::Image
        } else if mime.starts_with("text/") {
            Self::PlainText
        } else {
            Self::Unknown
        }
    }

    /// Detect from a file extension (without dot, any case).
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "txt" | "md" | "mdx" => Self::PlainText,
            "pdf" => Self::Pdf,
            "png" | "jpg" | "jpeg" | "bmp" | "tiff" | "tif" => Self::Image,
            _ => Self::Unknown,
        }
    }

    /// Detect from MIME, falling back to the path's extension.
    pub fn detect(path: &Path, mime: &str) -> Self {
        match Self::from_mime(mime) {
            Self::Unknown => {
                let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
                Self::from_extension(ext)
            }
            kind => kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_mime_dispatch() {
        assert_eq!(FileKind::from_mime("application/pdf"), FileKind::Pdf);
        assert_eq!(FileKind::from_mime("image/png"), FileKind::Image);
        assert_eq!(FileKind::from_mime("text/plain"), FileKind::PlainText);
        assert_eq!(
            FileKind::from_mime("application/octet-stream"),
            FileKind::Unknown
        );
    }

    #[test]
    fn test_extension_fallback() {
        let path = PathBuf::from("scan.TIFF");
        assert_eq!(
            FileKind::detect(&path, "application/octet-stream"),
            FileKind::Image
        );
    }
}
