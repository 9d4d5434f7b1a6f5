use crate::error::{CompressionError, Result};
use filetime::FileTime;
use image::{DynamicImage, ImageReader, Rgb, RgbImage};
use jpeg_encoder::{ColorType, Encoder};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Decodes `source` and re-encodes it as JPEG at `output`.
///
/// Prefer [`encode_image`] when the pixels are already in memory (for example
/// straight out of a healthy probe).
pub fn encode(source: &Path, output: &Path, quality: u8) -> Result<u64> {
    let img = ImageReader::open(source)
        .map_err(|e| encode_error(source, e))?
        .with_guessed_format()
        .map_err(|e| encode_error(source, e))?
        .decode()
        .map_err(|e| encode_error(source, e))?;
    encode_image(&img, source, output, quality)
}

/// Flattens `img` onto white, writes it as an optimized JPEG at `output` and
/// gives the output `source`'s permissions and access/modification times.
///
/// The JPEG is written to a temporary file next to `output` and renamed into
/// place, so a failure never leaves a partial file at `output`. `output` may
/// be the same path as `source`.
///
/// # Returns
/// * `Ok(size)` - Size of the written output in bytes
/// * `Err(CompressionError::Encode)` - On any I/O or encoding failure
pub fn encode_image(img: &DynamicImage, source: &Path, output: &Path, quality: u8) -> Result<u64> {
    let source_meta = fs::metadata(source).map_err(|e| encode_error(source, e))?;
    let atime = FileTime::from_last_access_time(&source_meta);
    let mtime = FileTime::from_last_modification_time(&source_meta);

    let rgb = flatten_to_rgb(img);

    let parent = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut temp = tempfile::Builder::new()
        .prefix(".img-sweep-")
        .suffix(".tmp")
        .tempfile_in(parent)
        .map_err(|e| encode_error(source, e))?;

    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        write_jpeg(&rgb, &mut writer, quality).map_err(|reason| CompressionError::Encode {
            path: source.to_path_buf(),
            reason,
        })?;
        writer.flush().map_err(|e| encode_error(source, e))?;
    }

    // Temp files are created owner-only; the output should read like the source.
    fs::set_permissions(temp.path(), source_meta.permissions())
        .map_err(|e| encode_error(source, e))?;
    filetime::set_file_times(temp.path(), atime, mtime).map_err(|e| encode_error(source, e))?;
    temp.persist(output)
        .map_err(|e| encode_error(source, e.error))?;

    let written = fs::metadata(output).map_err(|e| encode_error(source, e))?.len();
    debug!(
        source = %source.display(),
        output = %output.display(),
        bytes = written,
        "encoded"
    );
    Ok(written)
}

/// Converts any decoded image to 8-bit RGB. Images with an alpha channel
/// (palette images arrive here already expanded to RGBA by the decoder) are
/// alpha-blended onto an opaque white background.
pub fn flatten_to_rgb(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }

    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        Rgb([over_white(r, a), over_white(g, a), over_white(b, a)])
    })
}

fn over_white(channel: u8, alpha: u8) -> u8 {
    let c = u16::from(channel);
    let a = u16::from(alpha);
    ((c * a + 255 * (255 - a) + 127) / 255) as u8
}

/// Baseline JPEG with optimized Huffman tables. Quality 0 is treated as 1,
/// the lowest setting the encoder accepts.
fn write_jpeg<W: Write>(rgb: &RgbImage, writer: W, quality: u8) -> std::result::Result<(), String> {
    let width = u16::try_from(rgb.width())
        .map_err(|_| format!("width {} exceeds the JPEG limit of 65535", rgb.width()))?;
    let height = u16::try_from(rgb.height())
        .map_err(|_| format!("height {} exceeds the JPEG limit of 65535", rgb.height()))?;

    let mut encoder = Encoder::new(writer, quality.clamp(1, 100));
    encoder.set_optimized_huffman_tables(true);
    encoder
        .encode(rgb.as_raw(), width, height, ColorType::Rgb)
        .map_err(|e| e.to_string())
}

fn encode_error(path: &Path, err: impl std::fmt::Display) -> CompressionError {
    CompressionError::Encode {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, LumaA, Rgba, RgbaImage};
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 255 / width) as u8, (y * 255 / height) as u8, 90])
        })
    }

    #[test]
    fn test_flatten_opaque_rgb_unchanged() {
        let img = DynamicImage::ImageRgb8(gradient(8, 8));
        assert_eq!(flatten_to_rgb(&img), gradient(8, 8));
    }

    #[test]
    fn test_flatten_transparent_becomes_white() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 0])));
        let flat = flatten_to_rgb(&img);
        assert!(flat.pixels().all(|p| *p == Rgb([255, 255, 255])));
    }

    #[test]
    fn test_flatten_opaque_alpha_keeps_color() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 255])));
        let flat = flatten_to_rgb(&img);
        assert_eq!(*flat.get_pixel(1, 1), Rgb([10, 20, 30]));
    }

    #[test]
    fn test_flatten_half_alpha_blends() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 128])));
        let [r, g, b] = flatten_to_rgb(&img).get_pixel(0, 0).0;
        assert_eq!((r, g, b), (127, 127, 127));
    }

    #[test]
    fn test_flatten_gray_alpha() {
        let img = DynamicImage::ImageLumaA8(image::ImageBuffer::from_pixel(
            3,
            3,
            LumaA([0u8, 0]),
        ));
        let flat = flatten_to_rgb(&img);
        assert_eq!(*flat.get_pixel(0, 0), Rgb([255, 255, 255]));
    }

    #[test]
    fn test_encode_writes_jpeg_and_preserves_mtime() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("src.png");
        let output = temp_dir.path().join("src.jpeg");
        gradient(120, 80).save_with_format(&source, ImageFormat::Png).unwrap();

        let past = FileTime::from_system_time(SystemTime::now() - Duration::from_secs(86_400 * 30));
        filetime::set_file_times(&source, past, past).unwrap();

        let size = encode(&source, &output, 80).unwrap();
        assert_eq!(size, fs::metadata(&output).unwrap().len());

        let decoded = image::open(&output).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (120, 80));
        assert_eq!(
            image::guess_format(&fs::read(&output).unwrap()).unwrap(),
            ImageFormat::Jpeg
        );

        let src_meta = fs::metadata(&source).unwrap();
        let out_meta = fs::metadata(&output).unwrap();
        assert_eq!(
            FileTime::from_last_modification_time(&out_meta),
            FileTime::from_last_modification_time(&src_meta)
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_encode_keeps_source_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("shared.bmp");
        gradient(48, 48).save_with_format(&source, ImageFormat::Bmp).unwrap();
        fs::set_permissions(&source, fs::Permissions::from_mode(0o644)).unwrap();

        let output = temp_dir.path().join("shared.jpeg");
        encode(&source, &output, 80).unwrap();

        let mode = fs::metadata(&output).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
    }

    #[cfg(unix)]
    #[test]
    fn test_encode_in_place_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("photo.jpeg");
        gradient(48, 48).save_with_format(&path, ImageFormat::Jpeg).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();

        let img = image::open(&path).unwrap();
        encode_image(&img, &path, &path, 60).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);
    }

    #[test]
    fn test_encode_quality_zero_is_accepted() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("src.bmp");
        let output = temp_dir.path().join("out.jpeg");
        gradient(32, 32).save_with_format(&source, ImageFormat::Bmp).unwrap();

        assert!(encode(&source, &output, 0).is_ok());
    }

    #[test]
    fn test_encode_in_place_replaces_source() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("same.jpeg");
        gradient(64, 64).save_with_format(&path, ImageFormat::Jpeg).unwrap();

        let img = image::open(&path).unwrap();
        encode_image(&img, &path, &path, 50).unwrap();
        assert!(image::open(&path).is_ok());
    }

    #[test]
    fn test_encode_failure_leaves_no_output() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("src.png");
        gradient(16, 16).save_with_format(&source, ImageFormat::Png).unwrap();
        let output = temp_dir.path().join("missing_dir").join("out.jpeg");

        let result = encode(&source, &output, 80);
        assert!(matches!(result, Err(CompressionError::Encode { .. })));
        assert!(!output.exists());
    }

    #[test]
    fn test_encode_leaves_no_temp_files() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("src.png");
        gradient(16, 16).save_with_format(&source, ImageFormat::Png).unwrap();
        encode(&source, &temp_dir.path().join("out.jpeg"), 80).unwrap();

        let names: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(names.iter().all(|n| !n.ends_with(".tmp")), "{:?}", names);
    }
}
