use std::path::Path;

use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader};
use log::{debug, warn};

use crate::error::Result;

/// Decodes an image and applies its EXIF orientation, so pixel coordinates are
/// in the upright frame the camera calibration assumes.
pub fn load_oriented(path: impl AsRef<Path>) -> Result<DynamicImage> {
    let path = path.as_ref();
    let mut decoder = ImageReader::open(path)?
        .with_guessed_format()?
        .into_decoder()?;
    let orientation = decoder.orientation().unwrap_or_else(|e| {
        warn!("{}: unreadable orientation tag ({e}), assuming upright", path.display());
        Orientation::NoTransforms
    });
    let mut image = DynamicImage::from_decoder(decoder)?;
    normalize_orientation(&mut image, orientation);
    debug!("loaded {} as {}x{}", path.display(), image.width(), image.height());
    Ok(image)
}

pub fn normalize_orientation(image: &mut DynamicImage, orientation: Orientation) {
    if orientation != Orientation::NoTransforms {
        debug!("applying {orientation:?}");
        image.apply_orientation(orientation);
    }
}

/// Orientation for a raw EXIF tag value (1-8); anything else is upright.
pub fn orientation_from_exif(value: u8) -> Orientation {
    Orientation::from_exif(value).unwrap_or(Orientation::NoTransforms)
}
