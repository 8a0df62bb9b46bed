//! Black-level subtraction, white balance, 4-color synthesis, and the
//! histogram-driven white point and gamma projection into display RGB
//! described in `§4.4`/`§4.7`.

use crate::image::MosaicImage;
use crate::profile::CameraProfile;

/// Subtract black level and apply per-channel multipliers, clamping to
/// `[0, rgb_max - black]`, matching `scale_colors()`'s `val = max(0,
/// raw - black); val = min(rgb_max - black, val * pre_mul[c])` exactly.
pub fn scale_colors(image: &mut MosaicImage, profile: &CameraProfile) {
    let black = profile.black;
    let ceiling = (profile.rgb_max - black).max(0) as f64;

    for row in 0..image.dim.height {
        for col in 0..image.dim.width {
            let px = image.get_mut(row, col);
            for c in 0..4 {
                let mul = profile.pre_mul[c];
                let raw = px[c] as i64 - black;
                let val = raw.max(0) as f64 * mul;
                px[c] = val.min(ceiling).round() as u16;
            }
        }
    }
}

/// Document-mode automatic white balance: `pre_mul[c] = max_mean /
/// mean[c]`, with zero-valued samples excluded from each channel's
/// mean the way `auto_scale()` skips saturated/blank pixels.
pub fn auto_scale(image: &MosaicImage, colors: usize) -> [f64; 4] {
    let mut sum = [0f64; 4];
    let mut count = [0f64; 4];
    for row in 0..image.dim.height {
        for col in 0..image.dim.width {
            let px = image.get(row, col);
            for c in 0..colors.min(4) {
                if px[c] == 0 {
                    continue;
                }
                sum[c] += px[c] as f64;
                count[c] += 1.0;
            }
        }
    }
    let mut mean = [0f64; 4];
    for c in 0..4 {
        mean[c] = if count[c] > 0.0 { sum[c] / count[c] } else { 1.0 };
    }
    let max_mean = mean.iter().cloned().fold(0f64, f64::max);
    let mut pre_mul = [1.0f64; 4];
    for c in 0..4 {
        if mean[c] > 0.0 {
            pre_mul[c] = max_mean / mean[c];
        }
    }
    pre_mul
}

/// GMCY-to-RGB matrix row-normalization: each output row sums to `1`,
/// matching `gmcy_coeff()`'s invariant that a neutral gray input maps
/// to itself under the derived matrix.
pub fn gmcy_coeff(gmcy: &[[f64; 3]; 4]) -> [[f64; 4]; 3] {
    let mut coeff = [[0f64; 4]; 3];
    for (r, row) in coeff.iter_mut().enumerate() {
        for (c, cell) in row.iter_mut().enumerate() {
            *cell = gmcy[c][r];
        }
        let sum: f64 = row.iter().sum();
        if sum != 0.0 {
            for cell in row.iter_mut() {
                *cell /= sum;
            }
        }
    }
    coeff
}

/// Recombine a 4-color sensor's two green channels and, when a color
/// matrix is present, project through it or through the CMY
/// `rgb[r] = img[r] + img[(r+1)%3] - img[(r+2)%3]` rule; a plain
/// 3-color passthrough otherwise.
pub fn convert_to_rgb(image: &MosaicImage, profile: &CameraProfile) -> (MosaicImage, Vec<u32>) {
    let dim = image.dim;
    let mut out = MosaicImage::new(dim);
    let mut histogram = vec![0u32; 0x2000];

    for row in 0..dim.height {
        for col in 0..dim.width {
            let src = image.get(row, col);
            let img = if profile.colors == 4 && !profile.use_coeff {
                [
                    src[0] as f64,
                    ((src[1] as u32 + src[3] as u32) / 2) as f64,
                    src[2] as f64,
                    0.0,
                ]
            } else {
                [src[0] as f64, src[1] as f64, src[2] as f64, src[3] as f64]
            };

            let mut rgb = [0f64; 3];
            if profile.use_coeff {
                for (r, row_coeff) in profile.coeff.iter().enumerate() {
                    rgb[r] = row_coeff.iter().zip(img.iter()).map(|(a, b)| a * b).sum();
                }
            } else if profile.is_cmy {
                for r in 0..3 {
                    rgb[r] = img[r] + img[(r + 1) % 3] - img[(r + 2) % 3];
                }
            } else {
                rgb = [img[0], img[1], img[2]];
            }

            let mut sample = [0u16; 3];
            for (c, v) in rgb.iter().enumerate() {
                sample[c] = v.round().clamp(0.0, 0xffff as f64) as u16;
            }
            out.set_channel(row, col, 0, sample[0]);
            out.set_channel(row, col, 1, sample[1]);
            out.set_channel(row, col, 2, sample[2]);

            let magnitude =
                ((sample[0] as f64).powi(2) + (sample[1] as f64).powi(2) + (sample[2] as f64).powi(2)).sqrt() / 2.0;
            let magnitude = magnitude.min(0xffff as f64) as u32;
            out.set_channel(row, col, 3, magnitude.min(0xffff) as u16);
            let hist_len = histogram.len();
            histogram[((magnitude >> 3) as usize).min(hist_len - 1)] += 1;
        }
    }
    (out, histogram)
}

/// Scan the histogram from the top bin downward until the accumulated
/// pixel count exceeds 1% of the image, matching `write_ppm`'s
/// 99th-percentile white-point pick.
pub fn white_point_from_histogram(histogram: &[u32], pixel_count: u64) -> u32 {
    let threshold = (pixel_count as f64 * 0.01) as u64;
    let mut total = 0u64;
    for (val, &count) in histogram.iter().enumerate().rev() {
        total += count as u64;
        if total > threshold {
            return (val as u32) << 3;
        }
    }
    0
}

/// Apply the display gamma curve used by the PPM24 writer: `scale =
/// bright * 442 / max * (sample*2/max)^(gamma-1)`, clamped to `[0,
/// 255]`.
pub fn gamma_encode(sample: u16, magnitude: u16, max: u32, bright: f64, gamma: f64) -> u8 {
    if max == 0 {
        return 0;
    }
    let ratio = (magnitude as f64 * 2.0 / max as f64).max(0.0);
    let scale = bright * 442.0 / max as f64 * ratio.powf(gamma - 1.0);
    (sample as f64 * scale).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gmcy_rows_sum_to_one() {
        let gmcy = [
            [0.1, 0.2, 0.3],
            [0.4, 0.1, 0.2],
            [0.2, 0.3, 0.1],
            [0.3, 0.4, 0.4],
        ];
        let coeff = gmcy_coeff(&gmcy);
        for row in coeff.iter() {
            let sum: f64 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn histogram_white_point_matches_seed_scenario() {
        // A histogram with a single saturated bin near the top and the
        // rest quiet: the 1%-from-the-top scan should land on that bin.
        let mut histogram = vec![0u32; 0x2000];
        let pixel_count = 1_000_000u64;
        histogram[1999] = 20_000; // comfortably above 1% of 1,000,000
        let val = white_point_from_histogram(&histogram, pixel_count);
        assert_eq!(val, 1999 << 3);
    }

    #[test]
    fn auto_scale_skips_zero_pixels() {
        use crate::image::Dim2;
        let dim = Dim2::new(2, 1);
        let mut img = MosaicImage::new(dim);
        img.set_channel(0, 0, 0, 100);
        img.set_channel(0, 0, 1, 200);
        img.set_channel(0, 1, 0, 0); // excluded from channel 0's mean
        img.set_channel(0, 1, 1, 200);
        let pre_mul = auto_scale(&img, 3);
        assert_eq!(pre_mul[0], 2.0); // mean[0]=100, mean[1]=200, max=200
        assert_eq!(pre_mul[1], 1.0);
    }
}
