#![allow(dead_code)]

use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use img_sweep::constants::MIN_CANDIDATE_SIZE;
use img_sweep::RunEvent;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Small deterministic generator so fixtures are identical on every run.
struct Lcg(u64);

impl Lcg {
    fn next_byte(&mut self) -> u8 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 33) as u8
    }
}

fn ensure_parent(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
}

/// 1024x1024 RGB noise PNG, a little over 3 MiB since noise does not deflate.
pub fn write_noise_png(path: &Path) {
    ensure_parent(path);
    let mut rng = Lcg(42);
    let img = RgbImage::from_fn(1024, 1024, |_, _| {
        Rgb([rng.next_byte(), rng.next_byte(), rng.next_byte()])
    });
    img.save_with_format(path, ImageFormat::Png).unwrap();
    assert!(fs::metadata(path).unwrap().len() > MIN_CANDIDATE_SIZE);
}

/// Noise colors under a fully transparent alpha channel.
pub fn write_transparent_png(path: &Path) {
    ensure_parent(path);
    let mut rng = Lcg(7);
    let img = RgbaImage::from_fn(1024, 1024, |_, _| {
        Rgba([rng.next_byte(), rng.next_byte(), rng.next_byte(), 0])
    });
    img.save_with_format(path, ImageFormat::Png).unwrap();
    assert!(fs::metadata(path).unwrap().len() > MIN_CANDIDATE_SIZE);
}

/// 1024x768 gradient BMP. Uncompressed, so it clears the size threshold
/// while encoding to a tiny JPEG.
pub fn write_gradient_bmp(path: &Path) {
    ensure_parent(path);
    let img = RgbImage::from_fn(1024, 768, |x, y| Rgb([(x / 4) as u8, (y / 3) as u8, 128]));
    img.save_with_format(path, ImageFormat::Bmp).unwrap();
    assert!(fs::metadata(path).unwrap().len() > MIN_CANDIDATE_SIZE);
}

/// A 1024x1024 BMP cut short, still above the size threshold.
pub fn write_truncated_bmp(path: &Path) {
    ensure_parent(path);
    let img = RgbImage::from_fn(1024, 1024, |x, y| Rgb([x as u8, y as u8, 0]));
    img.save_with_format(path, ImageFormat::Bmp).unwrap();
    let bytes = fs::read(path).unwrap();
    let keep = (MIN_CANDIDATE_SIZE as usize) + 4096;
    assert!(keep < bytes.len());
    fs::write(path, &bytes[..keep]).unwrap();
}

/// Bytes that no decoder accepts, padded past the size threshold.
pub fn write_garbage(path: &Path) {
    ensure_parent(path);
    fs::write(path, vec![0x5Au8; (MIN_CANDIDATE_SIZE + 1) as usize]).unwrap();
}

pub fn write_sized(path: &Path, size: u64) {
    ensure_parent(path);
    fs::write(path, vec![0u8; size as usize]).unwrap();
}

pub type EventLog = Arc<Mutex<Vec<RunEvent>>>;

/// A sink closure that records every event, plus the shared log it writes to.
pub fn recording_sink() -> (impl Fn(RunEvent) + Send + 'static, EventLog) {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let sink = {
        let log = Arc::clone(&log);
        move |event: RunEvent| log.lock().unwrap().push(event)
    };
    (sink, log)
}

pub fn log_lines(events: &EventLog) -> Vec<String> {
    events
        .lock()
        .unwrap()
        .iter()
        .filter_map(|e| match e {
            RunEvent::Log(line) => Some(line.clone()),
            _ => None,
        })
        .collect()
}
