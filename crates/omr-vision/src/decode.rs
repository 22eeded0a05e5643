use crate::error::VisionError;
use omr_core::GrayImage;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Decode raw JPEG/PNG bytes into an owned grayscale raster (stage A).
///
/// Derived rasters (blurred, edged, thresholded, enhanced, rectified) are all
/// fresh buffers owned by the stage that produced them; this function is the
/// only place image *decoding* happens.
#[cfg_attr(feature = "tracing", instrument(skip(bytes), fields(len = bytes.len())))]
pub fn decode_grayscale(bytes: &[u8]) -> Result<GrayImage, VisionError> {
    let dynamic = image::load_from_memory(bytes).map_err(|e| VisionError::Decode(e.to_string()))?;
    let luma = dynamic.to_luma8();
    let (width, height) = (luma.width() as usize, luma.height() as usize);
    if width == 0 || height == 0 {
        return Err(VisionError::EmptyImage);
    }
    Ok(GrayImage::new(width, height, luma.into_raw()))
}

/// Convert an `omr_core::GrayImage` into an `image::GrayImage` for interop
/// with `imageproc` algorithms that expect the `image` crate's buffer type.
pub(crate) fn to_image_luma(gray: &GrayImage) -> image::GrayImage {
    image::GrayImage::from_raw(gray.width as u32, gray.height as u32, gray.data.clone())
        .expect("GrayImage invariant: data.len() == width * height")
}

pub(crate) fn from_image_luma(img: &image::GrayImage) -> GrayImage {
    GrayImage::new(img.width() as usize, img.height() as usize, img.as_raw().clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_rejects_garbage_bytes() {
        let err = decode_grayscale(b"not an image").unwrap_err();
        matches!(err, VisionError::Decode(_));
    }

    #[test]
    fn decode_round_trips_a_real_png() {
        let mut img = image::GrayImage::new(8, 8);
        for (x, y, p) in img.enumerate_pixels_mut() {
            *p = image::Luma([((x + y) * 10) as u8]);
        }
        let mut bytes = Vec::new();
        image::DynamicImage::ImageLuma8(img)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();

        let decoded = decode_grayscale(&bytes).unwrap();
        assert_eq!(decoded.width, 8);
        assert_eq!(decoded.height, 8);
    }
}
