//! Frame resizing

use contracts::FrameSize;
use image::imageops::{self, FilterType};
use image::GrayImage;

/// Resize a frame to the dataset resolution
///
/// Uses a triangle (bilinear) filter, which averages neighbouring pixels
/// when shrinking.
pub fn resize_frame(frame: &GrayImage, size: FrameSize) -> GrayImage {
    if frame.dimensions() == (size.width, size.height) {
        return frame.clone();
    }
    imageops::resize(frame, size.width, size.height, FilterType::Triangle)
}
