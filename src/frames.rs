//! Cutting animation sheets into frames and assembling GIFs from them.
//!
//! Renderers return a spinning animation as a single image with every frame
//! laid out side by side. Sheets wider than they are tall are cut along the x
//! axis, everything else along the y axis.

use std::io::Cursor;

use image::{
    codecs::gif::{GifEncoder, Repeat},
    Delay, DynamicImage, Frame, GenericImageView, ImageError, ImageFormat,
};
use thiserror::Error;

/// Delay between GIF frames.
pub const FRAME_DELAY_MS: u32 = 100;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Could not decode animation sheet")]
    Decode(#[source] ImageError),

    #[error("Could not encode frame")]
    Encode(#[source] ImageError),

    #[error("Animation sheet of {width}x{height} is too small to hold {frames} frames")]
    SheetTooSmall { width: u32, height: u32, frames: u32 },

    #[error("Cannot build a GIF without frames")]
    NoFrames,
}

/// Splits an encoded sheet into `frame_count` decoded frames.
pub fn split_sheet(sheet: &[u8], frame_count: u32) -> Result<Vec<DynamicImage>, FrameError> {
    let sheet = image::load_from_memory(sheet).map_err(FrameError::Decode)?;
    let (width, height) = sheet.dimensions();

    let horizontal = width > height;
    let span = if horizontal { width } else { height };
    let step = span.checked_div(frame_count).unwrap_or(0);

    if step == 0 {
        return Err(FrameError::SheetTooSmall {
            width,
            height,
            frames: frame_count,
        });
    }

    let frames = (0..frame_count)
        .map(|index| {
            let offset = index * step;
            if horizontal {
                sheet.crop_imm(offset, 0, step, height)
            } else {
                sheet.crop_imm(0, offset, width, step)
            }
        })
        .collect();

    Ok(frames)
}

pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, FrameError> {
    let mut encoded = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut encoded), ImageFormat::Png)
        .map_err(FrameError::Encode)?;

    Ok(encoded)
}

/// Encodes frames as an endlessly looping GIF.
pub fn encode_gif(frames: &[DynamicImage]) -> Result<Vec<u8>, FrameError> {
    if frames.is_empty() {
        return Err(FrameError::NoFrames);
    }

    let delay = Delay::from_numer_denom_ms(FRAME_DELAY_MS, 1);
    let mut encoded = Vec::new();

    {
        let mut encoder = GifEncoder::new(&mut encoded);
        encoder
            .set_repeat(Repeat::Infinite)
            .map_err(FrameError::Encode)?;
        encoder
            .encode_frames(
                frames
                    .iter()
                    .map(|frame| Frame::from_parts(frame.to_rgba8(), 0, 0, delay)),
            )
            .map_err(FrameError::Encode)?;
    }

    Ok(encoded)
}
