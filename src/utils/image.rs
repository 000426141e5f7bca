//! Utility functions for loading formula images.
//!
//! Formula images are read with the `image` crate, converted to 8-bit grayscale and
//! scaled to `[0, 1]` in an `[1, 1, H, W]` tensor, which is the layout the encoder
//! graph consumes.

use crate::core::errors::EvalResult;
use image::{DynamicImage, GrayImage};
use ndarray::Array4;
use std::path::Path;

/// Converts a DynamicImage to a GrayImage.
///
/// # Arguments
///
/// * `img` - The DynamicImage to convert
pub fn dynamic_to_gray(img: DynamicImage) -> GrayImage {
    img.to_luma8()
}

/// Loads an image from a file path and converts it to GrayImage.
///
/// # Errors
///
/// Returns `EvalError::ImageLoad` if the image cannot be opened or decoded.
pub fn load_gray_image(path: &Path) -> EvalResult<GrayImage> {
    let img = image::open(path)?;
    Ok(dynamic_to_gray(img))
}

/// Converts a grayscale image into a `[1, 1, H, W]` tensor scaled to `[0, 1]`.
pub fn gray_to_tensor(img: &GrayImage) -> Array4<f32> {
    let (width, height) = img.dimensions();
    Array4::from_shape_fn((1, 1, height as usize, width as usize), |(_, _, y, x)| {
        f32::from(img.get_pixel(x as u32, y as u32).0[0]) / 255.0
    })
}

/// Loads an image file straight into an encoder input tensor.
pub fn load_image_tensor(path: &Path) -> EvalResult<Array4<f32>> {
    let img = load_gray_image(path)?;
    Ok(gray_to_tensor(&img))
}
