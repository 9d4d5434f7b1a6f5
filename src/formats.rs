//! Type-safe handling of the formats a sweep reads and writes.
//!
//! Sources are classified by extension only; content sniffing is left to the
//! corruption probe, which decodes every candidate anyway.
use std::fmt;
use std::path::Path;

/// Source formats accepted by the scanner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    Jpeg,
    Png,
    Bmp,
}

impl SourceFormat {
    /// Classify a bare extension (without the dot), case-insensitively.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_lowercase().as_str() {
            "jpg" | "jpeg" => Some(SourceFormat::Jpeg),
            "png" => Some(SourceFormat::Png),
            "bmp" => Some(SourceFormat::Bmp),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceFormat::Jpeg => "JPEG",
            SourceFormat::Png => "PNG",
            SourceFormat::Bmp => "BMP",
        };
        write!(f, "{}", name)
    }
}

/// True when the path carries one of the accepted source extensions.
pub fn is_supported_source(path: &Path) -> bool {
    SourceFormat::from_path(path).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_format_from_extension() {
        assert_eq!(SourceFormat::from_extension("jpg"), Some(SourceFormat::Jpeg));
        assert_eq!(SourceFormat::from_extension("JPEG"), Some(SourceFormat::Jpeg));
        assert_eq!(SourceFormat::from_extension("PnG"), Some(SourceFormat::Png));
        assert_eq!(SourceFormat::from_extension("bmp"), Some(SourceFormat::Bmp));

        assert_eq!(SourceFormat::from_extension("webp"), None);
        assert_eq!(SourceFormat::from_extension("gif"), None);
        assert_eq!(SourceFormat::from_extension(""), None);
    }

    #[test]
    fn test_is_supported_source() {
        assert!(is_supported_source(Path::new("a/b/photo.JPG")));
        assert!(is_supported_source(Path::new("scan.bmp")));
        assert!(!is_supported_source(Path::new("notes.txt")));
        assert!(!is_supported_source(Path::new("no_extension")));
        assert!(!is_supported_source(Path::new("archive.png.zip")));
    }

    #[test]
    fn test_source_format_display() {
        assert_eq!(SourceFormat::Jpeg.to_string(), "JPEG");
        assert_eq!(SourceFormat::Png.to_string(), "PNG");
        assert_eq!(SourceFormat::Bmp.to_string(), "BMP");
    }
}
