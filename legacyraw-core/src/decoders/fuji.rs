use std::io::Read;

use crate::error::{DecodeError, Result};
use crate::image::MosaicImage;
use crate::profile::CameraProfile;

/// Fuji's Super CCD sensors are read out and stored rotated 45 degrees
/// from the logical image; `fuji_width` gives the on-disk row length in
/// samples (a diagonal of the final image) and each decoded value maps
/// to `(row, col)` by walking two interleaved diagonals, mirroring the
/// `fuji_fill` layouts used by the S2 Pro/S5000-era loaders.
pub struct FujiGeometry {
    pub fuji_width: usize,
    pub raw_height: usize,
}

impl FujiGeometry {
    /// Map a raw `(raw_row, raw_col)` pair read off the sensor's native
    /// diagonal order into the upright `(row, col)` of the output image:
    /// the raw column is halved and added to the unhalved raw row.
    pub fn place(&self, raw_row: usize, raw_col: usize) -> (i64, i64) {
        let fuji_width = self.fuji_width as i64;
        let r = raw_row as i64;
        let c = raw_col as i64;
        let row = r + ((c + 1) / 2);
        let col = fuji_width - 1 - c + (r / 2);
        (row, col)
    }
}

/// Plain 16-bit big-endian unpacker used for the Fuji S2 Pro, with
/// samples remapped through the diagonal geometry above.
pub fn decode_fuji_s2<R: Read>(mut src: R, image: &mut MosaicImage, profile: &CameraProfile) -> Result<()> {
    use crate::cfa::fc;

    let geom = FujiGeometry {
        fuji_width: profile.raw_width as usize,
        raw_height: profile.raw_height as usize,
    };

    for raw_row in 0..geom.raw_height {
        for raw_col in 0..geom.fuji_width {
            let mut buf = [0u8; 2];
            src.read_exact(&mut buf).map_err(|_| DecodeError::Truncated {
                offset: 0,
                expected: 2,
            })?;
            let sample = u16::from_be_bytes(buf);

            let (row, col) = geom.place(raw_row, raw_col);
            if row < 0 || col < 0 {
                continue;
            }
            let (row, col) = (row as usize, col as usize);
            if row >= image.dim.height || col >= image.dim.width {
                continue;
            }
            let channel = fc(profile.filters, row as i32, col as i32) as usize;
            image.set_channel(row, col, channel, sample);
        }
    }
    Ok(())
}

/// S5000/F700-era packed 12-bit little-endian-per-pair layout,
/// remapped through the same diagonal geometry.
pub fn decode_fuji_packed12<R: Read>(
    mut src: R,
    image: &mut MosaicImage,
    profile: &CameraProfile,
) -> Result<()> {
    use crate::cfa::fc;

    let geom = FujiGeometry {
        fuji_width: profile.raw_width as usize,
        raw_height: profile.raw_height as usize,
    };

    for raw_row in 0..geom.raw_height {
        let mut raw_col = 0usize;
        while raw_col < geom.fuji_width {
            let mut buf = [0u8; 3];
            src.read_exact(&mut buf).map_err(|_| DecodeError::Truncated {
                offset: 0,
                expected: 3,
            })?;
            let a = (buf[0] as u16) | (((buf[1] & 0x0f) as u16) << 8);
            let b = ((buf[1] >> 4) as u16) | ((buf[2] as u16) << 4);

            for (i, sample) in [a, b].into_iter().enumerate() {
                let col = raw_col + i;
                if col >= geom.fuji_width {
                    break;
                }
                let (row, out_col) = geom.place(raw_row, col);
                if row < 0 || out_col < 0 {
                    continue;
                }
                let (row, out_col) = (row as usize, out_col as usize);
                if row >= image.dim.height || out_col >= image.dim.width {
                    continue;
                }
                let channel = fc(profile.filters, row as i32, out_col as i32) as usize;
                image.set_channel(row, out_col, channel, sample);
            }
            raw_col += 2;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagonal_placement_is_within_image_for_center_samples() {
        let geom = FujiGeometry {
            fuji_width: 16,
            raw_height: 16,
        };
        let (row, col) = geom.place(8, 8);
        assert!(row >= 0);
        assert!(col >= -16 && col <= 16);
    }
}
