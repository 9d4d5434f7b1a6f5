use image::{DynamicImage, ImageReader};
use std::path::Path;

/// Classification of a candidate after a full decode attempt.
///
/// A healthy result carries the decoded pixels so the encoder does not have
/// to read the file a second time.
#[derive(Debug)]
pub enum ProbeOutcome {
    Healthy(DynamicImage),
    Corrupt(String),
}

impl ProbeOutcome {
    pub fn is_corrupt(&self) -> bool {
        matches!(self, ProbeOutcome::Corrupt(_))
    }
}

/// Opens `path` and decodes every pixel. Any failure along the way (open,
/// format detection, truncated body) classifies the file as corrupt with the
/// decoder's message; the file is never modified.
pub fn probe(path: &Path) -> ProbeOutcome {
    match decode_fully(path) {
        Ok(img) => ProbeOutcome::Healthy(img),
        Err(reason) => ProbeOutcome::Corrupt(reason),
    }
}

fn decode_fully(path: &Path) -> std::result::Result<DynamicImage, String> {
    let reader = ImageReader::open(path)
        .map_err(|e| e.to_string())?
        .with_guessed_format()
        .map_err(|e| e.to_string())?;
    reader.decode().map_err(|e| e.to_string())
}
