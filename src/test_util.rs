//! In-memory images and output directory helpers for tests.

use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use walkdir::WalkDir;

pub fn png_bytes(width: u32, height: u32, colour: [u8; 4]) -> Vec<u8> {
    encode(RgbaImage::from_pixel(width, height, Rgba(colour)))
}

/// A horizontal sprite sheet where frame `n` is filled with the colour
/// `[n, 255 - n, 0, 255]`.
pub fn sheet_bytes(frames: u32, frame_width: u32, frame_height: u32) -> Vec<u8> {
    let sheet = RgbaImage::from_fn(frames * frame_width, frame_height, |x, _| {
        frame_colour(x / frame_width)
    });
    encode(sheet)
}

pub fn frame_colour(frame: u32) -> Rgba<u8> {
    let n = frame as u8;
    Rgba([n, 255 - n, 0, 255])
}

fn encode(image: RgbaImage) -> Vec<u8> {
    let mut buffer = Vec::new();
    DynamicImage::ImageRgba8(image)
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .expect("encoding test image");
    buffer
}

/// Every file below `root`, relative to it, sorted.
pub fn files_under(root: &Path) -> Vec<String> {
    if !root.exists() {
        return Vec::new();
    }

    let mut files: Vec<String> = WalkDir::new(root)
        .into_iter()
        .map(|entry| entry.expect("walking output directory"))
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            entry
                .path()
                .strip_prefix(root)
                .expect("entry below root")
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();

    files.sort();
    files
}
