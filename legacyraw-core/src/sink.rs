//! Output writers for the three pixel formats `§6` calls for: 8-bit
//! gamma-encoded PPM, 16-bit linear PPM, and 16-bit planar PSD.

use std::io::Write;

use crate::color::{gamma_encode, white_point_from_histogram};
use crate::error::Result;
use crate::image::MosaicImage;

/// A destination for a finished, color-projected image. Kept as a
/// trait rather than three free functions so a caller (or a future
/// format) can plug in without touching the pipeline that calls it.
pub trait ImageSink {
    fn write(&self, out: &mut dyn Write, image: &MosaicImage, histogram: &[u32]) -> Result<()>;
}

/// Options shared by the two gamma-encoding writers.
#[derive(Debug, Clone, Copy)]
pub struct GammaOptions {
    pub bright: f64,
    pub gamma: f64,
}

impl Default for GammaOptions {
    fn default() -> Self {
        GammaOptions {
            bright: 1.0,
            gamma: 1.0 / 0.45, // inverse of the 0.45 encoding gamma dcraw targets
        }
    }
}

/// 8-bit gamma-encoded interleaved PPM (`P6`).
pub struct Ppm24Sink {
    pub options: GammaOptions,
}

impl ImageSink for Ppm24Sink {
    fn write(&self, out: &mut dyn Write, image: &MosaicImage, histogram: &[u32]) -> Result<()> {
        let dim = image.dim;
        let pixel_count = (dim.width * dim.height) as u64;
        let max = white_point_from_histogram(histogram, pixel_count).max(1);

        write!(out, "P6\n{} {}\n255\n", dim.width, dim.height)?;
        let mut row_buf = Vec::with_capacity(dim.width * 3);
        for row in 0..dim.height {
            row_buf.clear();
            for col in 0..dim.width {
                let px = image.get(row, col);
                for c in 0..3 {
                    row_buf.push(gamma_encode(px[c], px[3], max, self.options.bright, self.options.gamma));
                }
            }
            out.write_all(&row_buf)?;
        }
        Ok(())
    }
}

/// 16-bit linear interleaved PPM (`P6` with a `65535` max value),
/// big-endian as the PPM format requires.
pub struct Ppm48Sink;

impl ImageSink for Ppm48Sink {
    fn write(&self, out: &mut dyn Write, image: &MosaicImage, _histogram: &[u32]) -> Result<()> {
        let dim = image.dim;
        write!(out, "P6\n{} {}\n65535\n", dim.width, dim.height)?;
        let mut row_buf = Vec::with_capacity(dim.width * 6);
        for row in 0..dim.height {
            row_buf.clear();
            for col in 0..dim.width {
                let px = image.get(row, col);
                for c in 0..3 {
                    row_buf.extend_from_slice(&px[c].to_be_bytes());
                }
            }
            out.write_all(&row_buf)?;
        }
        Ok(())
    }
}

/// A fixed 40-byte Photoshop header followed by planar 16-bit
/// big-endian R, then G, then B.
pub struct Psd48Sink;

impl ImageSink for Psd48Sink {
    fn write(&self, out: &mut dyn Write, image: &MosaicImage, _histogram: &[u32]) -> Result<()> {
        let dim = image.dim;
        let mut header = Vec::with_capacity(40);
        header.extend_from_slice(b"8BPS");
        header.extend_from_slice(&1u16.to_be_bytes()); // version
        header.extend_from_slice(&[0u8; 6]); // reserved
        header.extend_from_slice(&3u16.to_be_bytes()); // channels
        header.extend_from_slice(&(dim.height as u32).to_be_bytes());
        header.extend_from_slice(&(dim.width as u32).to_be_bytes());
        header.extend_from_slice(&16u16.to_be_bytes()); // bit depth
        header.extend_from_slice(&3u16.to_be_bytes()); // RGB mode
        header.extend_from_slice(&0u32.to_be_bytes()); // color mode data length
        header.extend_from_slice(&0u32.to_be_bytes()); // image resources length
        header.extend_from_slice(&0u32.to_be_bytes()); // layer/mask info length
        header.extend_from_slice(&0u16.to_be_bytes()); // no compression
        out.write_all(&header)?;

        for c in 0..3 {
            for row in 0..dim.height {
                for col in 0..dim.width {
                    out.write_all(&image.get(row, col)[c].to_be_bytes())?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Dim2;

    #[test]
    fn ppm48_writes_p6_header_and_expected_byte_count() {
        let dim = Dim2::new(2, 1);
        let mut image = MosaicImage::new(dim);
        image.set_channel(0, 0, 0, 1000);
        image.set_channel(0, 1, 1, 2000);
        let mut buf = Vec::new();
        Ppm48Sink.write(&mut buf, &image, &[]).unwrap();
        let header = b"P6\n2 1\n65535\n";
        assert!(buf.starts_with(header));
        assert_eq!(buf.len(), header.len() + 2 * 3 * 2);
    }

    #[test]
    fn psd48_header_is_exactly_40_bytes() {
        let dim = Dim2::new(1, 1);
        let image = MosaicImage::new(dim);
        let mut buf = Vec::new();
        Psd48Sink.write(&mut buf, &image, &[]).unwrap();
        assert_eq!(&buf[0..4], b"8BPS");
        assert_eq!(buf.len(), 40 + 3 * 2);
    }
}
