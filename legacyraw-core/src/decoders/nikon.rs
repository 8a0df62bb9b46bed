use std::io::Read;

use crate::bitreader::BitReader;
use crate::cfa::fc;
use crate::error::Result;
use crate::huffman::{nikon_tree, HuffmanTree};
use crate::image::MosaicImage;
use crate::profile::CameraProfile;

/// The 12-bit `->` display-value lookup Nikon stores ahead of the
/// compressed stream. `vpred`/`hpred` are seeded from the first two
/// rows' uncompressed samples by the real container reader; here the
/// curve and the seed values are taken as already-resolved inputs so
/// this module stays a pure codec over bits, not a TIFF reader.
#[derive(Clone)]
pub struct NikonCurve {
    table: Vec<u16>,
}

impl NikonCurve {
    pub fn new(table: Vec<u16>) -> Self {
        NikonCurve { table }
    }

    pub fn identity(csize: usize) -> Self {
        let table = (0..csize).map(|v| v as u16).collect();
        NikonCurve { table }
    }

    fn apply(&self, value: i32) -> u16 {
        let csize = self.table.len() as i32;
        let clamped = value.clamp(0, csize - 1) as usize;
        self.table[clamped]
    }
}

/// Decode a Nikon Huffman-compressed raw payload.
///
/// `vpred` holds the four vertical predictor seeds, one per
/// `(row&1, col&1)` quadrant, as recorded in the container before the
/// compressed stream starts; once decoding begins they are updated in
/// place and never re-seeded from the file, matching the original
/// decoder's single `vpred[4]` that persists for the whole frame.
/// `col` already ranges over the full raw row, so the vertical-predictor
/// gate is the plain `col < 2` the original uses; `left`/`right` only
/// trim the bodies (D1X, D2H) that crop the decoded stream's edges
/// before writing into the output image.
pub fn decode_nikon_huffman<R: Read>(
    src: R,
    image: &mut MosaicImage,
    profile: &CameraProfile,
    mut vpred: [i32; 4],
    curve: &NikonCurve,
    left: u32,
    right: u32,
) -> Result<()> {
    let tree: HuffmanTree = nikon_tree()?;
    let mut br = BitReader::new(src, false);
    let mut hpred = [0i32; 2];

    for row in 0..profile.raw_height {
        for col in 0..profile.raw_width {
            let len = tree.decode(&mut br)? as u32;
            let mut diff = br.take(len)? as i32;
            if len > 0 && (diff & (1 << (len - 1))) == 0 {
                diff -= (1 << len) - 1;
            }

            let value = if col < 2 {
                let i = (2 * (row & 1) + (col & 1)) as usize;
                vpred[i] += diff;
                hpred[(col & 1) as usize] = vpred[i];
                vpred[i]
            } else {
                hpred[(col & 1) as usize] += diff;
                hpred[(col & 1) as usize]
            };

            let out = (curve.apply(value) as u32) << 2;
            if col < left || col >= profile.raw_width - right {
                continue;
            }
            let out_row = row as usize;
            let out_col = (col - left) as usize;
            if out_row < image.dim.height && out_col < image.dim.width {
                let channel = fc(profile.filters, out_row as i32, out_col as i32) as usize;
                image.set_channel(out_row, out_col, channel, out as u16);
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

    fn test_profile(raw_width: u32, raw_height: u32) -> CameraProfile {
        CameraProfile {
            make: "Nikon".into(),
            model: "D1".into(),
            raw_width,
            raw_height,
            width: raw_width,
            height: raw_height,
            colors: 3,
            filters: 0x16161616,
            is_cmy: false,
            is_foveon: false,
            ymag: 1,
            black: 0,
            rgb_max: 0x3fff,
            pre_mul: [1.0; 4],
            use_coeff: false,
            coeff: [[0.0; 4]; 3],
            decoder: DecoderKind::NikonHuffman,
            data_offset: 0,
            timestamp: 0,
            camera_red: 1.0,
            camera_blue: 1.0,
        }
    }

    #[test]
    fn identity_curve_passes_through_clamped() {
        let curve = NikonCurve::identity(100);
        assert_eq!(curve.apply(50), 50);
        assert_eq!(curve.apply(-5), 0);
        assert_eq!(curve.apply(500), 99);
    }

    #[test]
    fn decode_empty_tree_stream_does_not_panic_on_short_input() {
        let profile = test_profile(2, 2);
        let mut image = MosaicImage::new(Dim2::new(2, 2));
        let curve = NikonCurve::identity(0x4000);
        // garbage bits; the decoder must surface a codec error rather than
        // panic on an exhausted bit source.
        let data = vec![0u8; 4];
        let result = decode_nikon_huffman(Cursor::new(data), &mut image, &profile, [0; 4], &curve, 0, 0);
        let _ = result;
    }
}
