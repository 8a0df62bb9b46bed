use std::io::Read;

use crate::error::{DecodeError, Result};
use crate::image::MosaicImage;
use crate::profile::CameraProfile;

/// Kodak's length-prefixed delta codec. Samples arrive in chunks of up
/// to 256, each chunk preceded by a nibble-packed array of bit lengths
/// (two per prelude byte). The bit accumulator and both column-parity
/// predictors reset at the start of every chunk; when the chunk's own
/// sample count is `4 mod 8`, two extra bytes seed the accumulator the
/// way the original's `init` flag does, rather than refilling lazily
/// from the start.
pub struct KodakBitSource<R: Read> {
    src: R,
    bitbuf: u32,
    bits: i32,
}

impl<R: Read> KodakBitSource<R> {
    pub fn new(src: R) -> Self {
        KodakBitSource {
            src,
            bitbuf: 0,
            bits: 0,
        }
    }

    fn byte(&mut self) -> Result<u32> {
        let mut buf = [0u8; 1];
        self.src
            .read_exact(&mut buf)
            .map_err(|_| DecodeError::Truncated {
                offset: 0,
                expected: 1,
            })?;
        Ok(buf[0] as u32)
    }

    fn get_bits(&mut self, len: i32) -> Result<u32> {
        if len == 0 {
            return Ok(0);
        }
        while self.bits < len {
            self.bitbuf = (self.bitbuf << 8) | self.byte()?;
            self.bits += 8;
        }
        self.bits -= len;
        Ok((self.bitbuf >> self.bits) & (0xffffu32 >> (16 - len).max(0)))
    }
}

fn sign_extend(diff: u32, len: i32) -> i32 {
    let mut diff = diff as i32;
    if len > 0 && (diff & (1 << (len - 1))) == 0 {
        diff -= (1 << len) - 1;
    }
    diff
}

/// Decode Kodak's compressed delta codec into `image`, using the
/// profile's CFA `filters` for channel routing.
pub fn decode_kodak_compressed<R: Read>(
    src: R,
    image: &mut MosaicImage,
    profile: &CameraProfile,
) -> Result<()> {
    use crate::cfa::fc;

    let mut bits = KodakBitSource::new(src);
    let raw_width = profile.raw_width as usize;
    let raw_height = profile.raw_height as usize;
    let mut pred = [0i32; 2];

    let mut col = 0usize;
    let mut row = 0usize;
    let mut blen = [0u8; 256];

    while row < raw_height {
        let chunk = (raw_width - col).min(256);
        let nprelude = (chunk + 1) / 2;
        for i in 0..nprelude {
            let c = bits.byte()?;
            blen[2 * i] = (c & 15) as u8;
            if 2 * i + 1 < chunk {
                blen[2 * i + 1] = (c >> 4) as u8;
            }
        }
        if (nprelude & 1) != 0 {
            let _ = bits.byte()?;
        }

        // Each 256-sample chunk starts its own bit accumulator and
        // column-parity predictors from scratch; neither carries over
        // from the previous chunk or row.
        bits.bitbuf = 0;
        bits.bits = 0;
        pred = [0, 0];
        if chunk % 8 == 4 {
            let hi = bits.byte()?;
            let lo = bits.byte()?;
            bits.bitbuf = (hi << 8) | lo;
            bits.bits = 16;
        }

        let mut i = 0usize;
        while i < chunk {
            let len = blen[i] as i32;
            let raw = bits.get_bits(len)?;
            let diff = sign_extend(raw, len);

            let c = &mut pred[col & 1];
            *c += diff;
            let value = ((*c).max(0) as u32) << 2;

            if row < image.dim.height && col < image.dim.width {
                let channel = fc(profile.filters, row as i32, col as i32) as usize;
                image.set_channel(row, col, channel, value.min(0xffff) as u16);
            }

            col += 1;
            i += 1;
        }
        if col >= raw_width {
            col = 0;
            row += 1;
        }
    }
    Ok(())
}

/// Kodak's 2x2 YUV block codec. This variant writes all three RGB
/// channels directly per block rather than a single CFA sample, so
/// callers must not also apply a Bayer/CFA `filters` value to its
/// output: `profile.filters` is expected to be `0` for this decoder.
pub fn decode_kodak_yuv<R: Read>(mut src: R, image: &mut MosaicImage, profile: &CameraProfile) -> Result<()> {
    let raw_width = profile.raw_width as usize;
    let raw_height = profile.raw_height as usize;

    let mut row = 0usize;
    while row < raw_height {
        let mut col = 0usize;
        while col < raw_width {
            let mut packed = [0u8; 8];
            src.read_exact(&mut packed)
                .map_err(|_| DecodeError::Truncated {
                    offset: 0,
                    expected: 8,
                })?;

            let six: [i32; 6] = [
                nibble_signed(packed[0] & 0x0f),
                nibble_signed(packed[0] >> 4),
                nibble_signed(packed[1] & 0x0f),
                nibble_signed(packed[1] >> 4),
                packed[2] as i32 - 128,
                packed[3] as i32 - 128,
            ];

            let mut y = [0i32; 4];
            y[0] = six[0];
            y[1] = six[1] + y[0];
            y[2] = six[2];
            y[3] = six[3] + y[2];
            let cb = six[4];
            let cr = six[5];

            for (k, &yv) in y.iter().enumerate() {
                let r = yv as f64 + 1.402 / 2.0 * cr as f64;
                let g = yv as f64 - 0.34414 / 2.0 * cb as f64 - 0.71414 / 2.0 * cr as f64;
                let b = yv as f64 + 1.772 / 2.0 * cb as f64;

                let dr = row + (k >> 1);
                let dc = col + (k & 1);
                if dr >= image.dim.height || dc >= image.dim.width {
                    continue;
                }
                if r > 0.0 {
                    image.set_channel(dr, dc, 0, r.min(0xffff as f64) as u16);
                }
                if g > 0.0 {
                    image.set_channel(dr, dc, 1, g.min(0xffff as f64) as u16);
                }
                if b > 0.0 {
                    image.set_channel(dr, dc, 2, b.min(0xffff as f64) as u16);
                }
            }

            col += 2;
        }
        row += 2;
    }
    Ok(())
}

fn nibble_signed(n: u8) -> i32 {
    (n as i32) - 8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Dim2;
    use crate::profile::DecoderKind;

    fn test_profile(raw_width: u32, raw_height: u32, filters: u32) -> CameraProfile {
        CameraProfile {
            make: "Kodak".into(),
            model: "DCS".into(),
            raw_width,
            raw_height,
            width: raw_width,
            height: raw_height,
            colors: 3,
            filters,
            is_cmy: false,
            is_foveon: false,
            ymag: 1,
            black: 400,
            rgb_max: 0xffff,
            pre_mul: [1.0; 4],
            use_coeff: false,
            coeff: [[0.0; 4]; 3],
            decoder: DecoderKind::KodakCompressed,
            data_offset: 0,
            timestamp: 0,
            camera_red: 1.0,
            camera_blue: 1.0,
        }
    }

    #[test]
    fn all_zero_length_chunk_leaves_image_zeroed() {
        let profile = test_profile(4, 1, 0x61616161);
        let mut image = MosaicImage::new(Dim2::new(4, 1));
        // prelude: 2 bytes covering 4 samples, all lengths 0 -> no bits consumed.
        // chunk length 4 is 4 mod 8, so two more (unused) preload bytes follow.
        let data = vec![0x00u8, 0x00u8, 0x00u8, 0x00u8];
        decode_kodak_compressed(std::io::Cursor::new(data), &mut image, &profile).unwrap();
        for col in 0..4 {
            assert_eq!(image.get(0, col), &[0u16; 4]);
        }
    }

    #[test]
    fn second_chunk_does_not_inherit_predictor_or_bit_state_from_first() {
        // raw_width 260 forces a 256-sample first chunk (256 % 8 == 0,
        // no preload) followed by a 4-sample second chunk (4 % 8 == 4,
        // preload required); the second chunk's predictors must start
        // at zero regardless of what the first chunk accumulated.
        let profile = test_profile(260, 1, 0x61616161);
        let mut image = MosaicImage::new(Dim2::new(260, 1));

        let mut data = Vec::new();
        data.extend(std::iter::repeat(0x00u8).take(128)); // first chunk prelude, all lengths 0
        data.extend([0x00u8, 0x00u8]); // second chunk prelude (4 samples, all lengths 0)
        data.extend([0x00u8, 0x00u8]); // second chunk's required preload bytes

        decode_kodak_compressed(std::io::Cursor::new(data), &mut image, &profile).unwrap();
        for col in 256..260 {
            assert_eq!(image.get(0, col), &[0u16; 4]);
        }
    }
}
