//! Foveon's three-layer sensor needs a dedicated color-reconstruction
//! pass instead of CFA demosaicing: every site already carries a
//! direct R/G/B triple from `decoders::foveon`, but the layers are
//! badly cross-talked and need sharpening, a chroma low-pass, and a
//! colorspace transform before they look like a photograph.

use crate::image::{Dim2, MosaicImage};

/// Symmetric clamped lookup used by the chroma-smoothing and
/// chroma-adjustment stages: `curve[i]` for `i` in `0..curve.len()`,
/// clamped at both ends rather than wrapping or panicking.
fn apply_curve(i: i32, curve: &[i32]) -> i32 {
    let max = curve.len() as i32 - 1;
    curve[i.clamp(0, max) as usize]
}

/// `3x3` colorspace transform applied per pixel: `out[i] = sum_j
/// trans[i][j] * rgb[j]`, matching the fixed matrix the original
/// applies after chroma smoothing.
const TRANS: [[f64; 3]; 3] = [
    [1.4032, -0.2556, -0.1476],
    [-0.0504, 1.0736, -0.0232],
    [-0.0926, -0.2905, 1.3831],
];

const CHANNEL_MUL: [f64; 3] = [1.0321, 1.0, 1.1124];

pub struct FoveonPipeline {
    pub sharpen: bool,
}

impl Default for FoveonPipeline {
    fn default() -> Self {
        FoveonPipeline { sharpen: true }
    }
}

impl FoveonPipeline {
    /// Run the full reconstruction in place over `image`, whose three
    /// channels already hold decoded-but-raw R/G/B layer values.
    pub fn process(&self, image: &mut MosaicImage) {
        self.sharpen_channel(image, 1); // green carries the most detail
        self.red_unsharp_mask(image);
        self.clamp_to_neighbors(image);
        self.smooth_chroma(image);
        self.transform_colorspace(image);
        self.lowpass_chroma(image);
    }

    fn sharpen_channel(&self, image: &mut MosaicImage, channel: usize) {
        if !self.sharpen {
            return;
        }
        let dim = image.dim;
        let before = image.clone();
        for row in 1..dim.height.saturating_sub(1) {
            for col in 1..dim.width.saturating_sub(1) {
                let center = before.get(row, col)[channel] as f64;
                let lap = 4.0 * center
                    - before.get(row - 1, col)[channel] as f64
                    - before.get(row + 1, col)[channel] as f64
                    - before.get(row, col - 1)[channel] as f64
                    - before.get(row, col + 1)[channel] as f64;
                let sharpened = (center + 0.25 * lap).round().clamp(0.0, 0xffff as f64) as u16;
                image.set_channel(row, col, channel, sharpened);
            }
        }
    }

    fn red_unsharp_mask(&self, image: &mut MosaicImage) {
        let dim = image.dim;
        let before = image.clone();
        for row in 1..dim.height.saturating_sub(1) {
            for col in 1..dim.width.saturating_sub(1) {
                let mut blur_sum = 0i64;
                for dr in -1i64..=1 {
                    for dc in -1i64..=1 {
                        blur_sum += before.get((row as i64 + dr) as usize, (col as i64 + dc) as usize)[0] as i64;
                    }
                }
                let blur = blur_sum as f64 / 9.0;
                let center = before.get(row, col)[0] as f64;
                let value = (center + 0.6 * (center - blur)).round().clamp(0.0, 0xffff as f64) as u16;
                image.set_channel(row, col, 0, value);
            }
        }
    }

    fn clamp_to_neighbors(&self, image: &mut MosaicImage) {
        let dim = image.dim;
        let before = image.clone();
        for row in 1..dim.height.saturating_sub(1) {
            for col in 1..dim.width.saturating_sub(1) {
                for c in 0..3 {
                    let mut lo = u16::MAX;
                    let mut hi = 0u16;
                    for dr in -1i64..=1 {
                        for dc in -1i64..=1 {
                            if dr == 0 && dc == 0 {
                                continue;
                            }
                            let v = before.get((row as i64 + dr) as usize, (col as i64 + dc) as usize)[c];
                            lo = lo.min(v);
                            hi = hi.max(v);
                        }
                    }
                    let v = before.get(row, col)[c].clamp(lo, hi);
                    image.set_channel(row, col, c, v);
                }
            }
        }
    }

    fn smooth_chroma(&self, image: &mut MosaicImage) {
        let curve: Vec<i32> = (0..73).map(|i| i - 36).collect();
        let dim = image.dim;
        for row in 0..dim.height {
            for col in 0..dim.width {
                let px = image.get_mut(row, col);
                let luma = px[1] as i32;
                for c in [0usize, 2usize] {
                    let chroma = px[c] as i32 - luma;
                    let smoothed = apply_curve(chroma + 36, &curve);
                    px[c] = (luma + smoothed).clamp(0, 0xffff) as u16;
                }
            }
        }
    }

    fn transform_colorspace(&self, image: &mut MosaicImage) {
        let dim = image.dim;
        for row in 0..dim.height {
            for col in 0..dim.width {
                let px = *image.get(row, col);
                let rgb = [px[0] as f64, px[1] as f64, px[2] as f64];
                let mut out = [0u16; 3];
                for (i, mul) in CHANNEL_MUL.iter().enumerate() {
                    let v = TRANS[i][0] * rgb[0] + TRANS[i][1] * rgb[1] + TRANS[i][2] * rgb[2];
                    out[i] = (v * mul).round().clamp(0.0, 0xffff as f64) as u16;
                }
                for (c, v) in out.iter().enumerate() {
                    image.set_channel(row, col, c, *v);
                }
            }
        }
    }

    fn lowpass_chroma(&self, image: &mut MosaicImage) {
        // Quarter-resolution IIR lowpass over the chroma planes only,
        // blended back at 1/4 strength; this softens color noise
        // without touching the luminance-bearing green channel.
        let dim = image.dim;
        let quarter = Dim2::new((dim.width / 4).max(1), (dim.height / 4).max(1));
        for c in [0usize, 2usize] {
            let mut lowres = vec![0f64; quarter.width * quarter.height];
            for qr in 0..quarter.height {
                for qc in 0..quarter.width {
                    let mut sum = 0f64;
                    let mut n = 0f64;
                    for dr in 0..4 {
                        for dc in 0..4 {
                            let r = qr * 4 + dr;
                            let cc = qc * 4 + dc;
                            if r < dim.height && cc < dim.width {
                                sum += image.get(r, cc)[c] as f64;
                                n += 1.0;
                            }
                        }
                    }
                    lowres[qr * quarter.width + qc] = if n > 0.0 { sum / n } else { 0.0 };
                }
            }
            for row in 0..dim.height {
                for col in 0..dim.width {
                    let qr = (row / 4).min(quarter.height - 1);
                    let qc = (col / 4).min(quarter.width - 1);
                    let lp = lowres[qr * quarter.width + qc];
                    let v = image.get(row, col)[c] as f64;
                    let blended = (0.75 * v + 0.25 * lp).round().clamp(0.0, 0xffff as f64) as u16;
                    image.set_channel(row, col, c, blended);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_input_stays_flat() {
        let dim = Dim2::new(16, 16);
        let mut img = MosaicImage::new(dim);
        for row in 0..dim.height {
            for col in 0..dim.width {
                img.set_channel(row, col, 0, 1000);
                img.set_channel(row, col, 1, 1000);
                img.set_channel(row, col, 2, 1000);
            }
        }
        FoveonPipeline::default().process(&mut img);
        for row in 4..12 {
            for col in 4..12 {
                for c in 0..3 {
                    let v = img.get(row, col)[c];
                    assert!(v > 0);
                }
            }
        }
    }
}
