use std::collections::HashMap;
use std::io::Read;

use crate::error::{DecodeError, Result};
use crate::image::MosaicImage;
use crate::profile::CameraProfile;

/// Foveon's raw stream carries its own ad-hoc prefix code: 1024
/// `(length, code)` pairs keyed directly rather than built from a
/// length histogram, so it gets a small dedicated tree instead of
/// reusing `HuffmanTree`. Keys are packed as `(length << 27) | code`,
/// mirroring the probe key the original decoder builds before
/// recursing into its tree.
pub struct FoveonTree {
    table: HashMap<u32, u16>,
}

impl FoveonTree {
    pub fn build(huff: &[u32], diff: &[i16]) -> Result<Self> {
        if huff.len() != diff.len() {
            return Err(DecodeError::MalformedCodec(
                "foveon huffman/diff table length mismatch".into(),
            ));
        }
        let mut table = HashMap::with_capacity(huff.len());
        for (leaf, &code) in huff.iter().enumerate() {
            let length = code >> 27;
            if length > 26 {
                return Err(DecodeError::MalformedCodec(format!(
                    "foveon code length {length} exceeds the 27-bit bound"
                )));
            }
            let key = code & 0x07ff_ffff | (length << 27);
            table.insert(key, leaf as u16);
        }
        Ok(FoveonTree { table })
    }

    /// Read MSB-first bits from `bits` until a key in the table
    /// matches, mirroring the original's depth-bounded recursive probe
    /// (`len > 26` there signals the same failure this reports as an
    /// error instead of aborting the whole decode).
    fn decode<R: Read>(&self, bits: &mut Msb32BitSource<R>) -> Result<u16> {
        let mut code: u32 = 0;
        for length in 1..=26u32 {
            code = (code << 1) | bits.take_bit()?;
            let key = code | (length << 27);
            if let Some(&leaf) = self.table.get(&key) {
                return Ok(leaf);
            }
        }
        Err(DecodeError::MalformedCodec(
            "foveon prefix code exceeded maximum depth".into(),
        ))
    }
}

/// 32-bit-refill MSB-first bit source, matching the original's
/// `bitbuf`/`vbits` pair that tops up four bytes at a time rather than
/// one, since Foveon's codes can run up to 26 bits deep.
struct Msb32BitSource<R: Read> {
    src: R,
    bitbuf: u32,
    vbits: i32,
}

impl<R: Read> Msb32BitSource<R> {
    fn new(src: R) -> Self {
        Msb32BitSource {
            src,
            bitbuf: 0,
            vbits: 0,
        }
    }

    fn take_bit(&mut self) -> Result<u32> {
        if self.vbits == 0 {
            let mut buf = [0u8; 4];
            self.src.read_exact(&mut buf).map_err(|_| DecodeError::Truncated {
                offset: 0,
                expected: 4,
            })?;
            self.bitbuf = u32::from_be_bytes(buf);
            self.vbits = 32;
        }
        self.vbits -= 1;
        Ok((self.bitbuf >> self.vbits) & 1)
    }
}

/// Per-model border trim, keyed on `raw_height`/`raw_width`.
pub fn foveon_border(raw_height: u32, raw_width: u32) -> (u32, u32) {
    let top = match raw_height {
        763 => 2,
        1531 => 7,
        _ => 0,
    };
    let left = match raw_width {
        1152 => 8,
        2304 => 17,
        _ => 0,
    };
    (top, left)
}

/// Decode the Foveon three-layer raw stream. Each of the three stacked
/// photodiode layers writes straight into one of the first three
/// `MosaicImage` channels (the Foveon sensor has no Bayer CFA, so
/// `profile.filters` is expected to be `0`), and only positive,
/// in-bounds predictor values are written, matching the original's
/// `if (pred[c] > 0 ...)` guard.
pub fn decode_foveon<R: Read>(
    mut src: R,
    image: &mut MosaicImage,
    profile: &CameraProfile,
    huff: &[u32],
    diff: &[i16],
) -> Result<()> {
    let mut header = [0u8; 260];
    src.read_exact(&mut header).map_err(|_| DecodeError::Truncated {
        offset: 0,
        expected: 260,
    })?;

    let tree = FoveonTree::build(huff, diff)?;
    let mut bits = Msb32BitSource::new(src);

    let (top, left) = foveon_border(profile.raw_height, profile.raw_width);
    let raw_height = profile.raw_height as i64;
    let raw_width = profile.raw_width as i64;

    for row in 0..raw_height {
        let mut pred = [0i32; 3];
        for col in 0..raw_width {
            for c in 0..3 {
                let leaf = tree.decode(&mut bits)? as usize;
                let delta = *diff.get(leaf).ok_or_else(|| {
                    DecodeError::MalformedCodec("foveon diff table index out of range".into())
                })?;
                pred[c] += delta as i32;

                if pred[c] <= 0 {
                    continue;
                }
                let out_row = row - top as i64;
                let out_col = col - left as i64;
                if out_row < 0 || out_col < 0 {
                    continue;
                }
                let (out_row, out_col) = (out_row as usize, out_col as usize);
                if out_row >= image.dim.height || out_col >= image.dim.width {
                    continue;
                }
                image.set_channel(out_row, out_col, c, pred[c].min(0xffff) as u16);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Dim2;
    use crate::profile::DecoderKind;
    use std::io::Cursor;

    fn test_profile() -> CameraProfile {
        CameraProfile {
            make: "Sigma".into(),
            model: "SD9".into(),
            raw_width: 4,
            raw_height: 4,
            width: 4,
            height: 4,
            colors: 3,
            filters: 0,
            is_cmy: false,
            is_foveon: true,
            ymag: 1,
            black: 0,
            rgb_max: 0xffff,
            pre_mul: [1.0; 4],
            use_coeff: false,
            coeff: [[0.0; 4]; 3],
            decoder: DecoderKind::Foveon,
            data_offset: 0,
            timestamp: 0,
            camera_red: 1.0,
            camera_blue: 1.0,
        }
    }

    #[test]
    fn all_zero_differences_leave_image_zeroed() {
        let profile = test_profile();
        let mut image = MosaicImage::new(Dim2::new(4, 4));

        // a single-entry table: code length 1, code 0, diff 0. Every
        // lookup resolves immediately to a zero delta.
        let huff = vec![1u32 << 27];
        let diff = vec![0i16];

        let body_bits = profile.raw_width as usize * profile.raw_height as usize * 3;
        let body_bytes = (body_bits + 31) / 32 * 4;
        let payload = vec![0u8; 260 + body_bytes];
        decode_foveon(Cursor::new(payload), &mut image, &profile, &huff, &diff).unwrap();

        for row in 0..4 {
            for col in 0..4 {
                assert_eq!(image.get(row, col), &[0u16; 4]);
            }
        }
    }
}
