use std::io::Read;

use crate::bitreader::BitReader;
use crate::cfa::fc;
use crate::error::{DecodeError, Result};
use crate::image::MosaicImage;
use crate::profile::CameraProfile;

fn read_exact_vec<R: Read>(src: &mut R, n: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; n];
    src.read_exact(&mut buf)
        .map_err(|_| DecodeError::Truncated {
            offset: 0,
            expected: n,
        })?;
    Ok(buf)
}

/// Generic sequential MSB-first N-bit unpacker, shared by the decoders
/// whose original loader is just `getbits(N) << shift` once per site
/// in raster order (packed-12, unpacked-12-as-bitstream, Kyocera,
/// Olympus E-10/E-20, Nikon E950).
pub fn decode_packed_sequential<R: Read>(
    src: &mut R,
    image: &mut MosaicImage,
    profile: &CameraProfile,
    bits: u32,
    shift: i32,
    row_trailer_bytes: usize,
) -> Result<()> {
    let mut br = BitReader::new(src, false);
    let width = profile.width as usize;
    let height = profile.height as usize;
    for row in 0..height {
        for col in 0..width {
            let sample = br.take(bits)?;
            let value = apply_shift(sample, shift);
            image.set_channel(row, col, fc(profile.filters, row as i32, col as i32) as usize, value);
        }
        if row_trailer_bytes > 0 {
            br.skip_bytes(row_trailer_bytes)?;
        }
    }
    Ok(())
}

/// Per-row little-endian bit-packed unpacker: the row's bytes are
/// treated as one little-endian integer (byte 0 contributes the
/// lowest-order bits) and samples are pulled off starting from bit 0,
/// `bits` at a time. This is the layout several compact-camera packed
/// formats use, as opposed to the MSB-first bitstream of
/// `decode_packed_sequential`.
pub fn decode_packed_le<R: Read>(
    src: &mut R,
    image: &mut MosaicImage,
    profile: &CameraProfile,
    bits: u32,
    shift: i32,
    row_bytes: usize,
) -> Result<()> {
    let width = profile.width as usize;
    let height = profile.height as usize;
    for row in 0..height {
        let data = read_exact_vec(src, row_bytes)?;
        let mut acc: u128 = 0;
        for (i, &b) in data.iter().enumerate() {
            acc |= (b as u128) << (8 * i);
        }
        let mask = (1u128 << bits) - 1;
        for col in 0..width {
            let sample = ((acc >> (col as u32 * bits)) & mask) as u32;
            let value = apply_shift(sample, shift);
            image.set_channel(row, col, fc(profile.filters, row as i32, col as i32) as usize, value);
        }
    }
    Ok(())
}

/// Olympus's 16-bit unpacked loader: big-endian samples, shifted right
/// by 2 rather than left.
pub fn decode_unpacked16<R: Read>(
    src: &mut R,
    image: &mut MosaicImage,
    profile: &CameraProfile,
    shift: i32,
) -> Result<()> {
    let width = profile.width as usize;
    let height = profile.height as usize;
    for row in 0..height {
        let row_bytes = read_exact_vec(src, width * 2)?;
        for col in 0..width {
            let raw = u16::from_be_bytes([row_bytes[col * 2], row_bytes[col * 2 + 1]]) as u32;
            let value = apply_shift(raw, shift);
            image.set_channel(row, col, fc(profile.filters, row as i32, col as i32) as usize, value);
        }
    }
    Ok(())
}

/// Trivial one-byte-per-sample loader (Casio "easy", Kodak "easy"),
/// with an optional cropping margin. `margin_black` distinguishes the
/// two families this layout covers: Kodak's loader folds the discarded
/// edge columns into a black-level estimate when the margin is 2
/// columns wide, Casio's never computes one at all.
pub fn decode_easy8<R: Read>(
    src: &mut R,
    image: &mut MosaicImage,
    profile: &CameraProfile,
    shift: u32,
    margin_black: bool,
) -> Result<i64> {
    let raw_width = profile.raw_width as usize;
    let width = profile.width as usize;
    let height = profile.height as usize;
    let margin = (raw_width - width) / 2;
    let accumulate = margin_black && margin == 2;
    let mut black_sum: i64 = 0;
    for row in 0..height {
        let row_bytes = read_exact_vec(src, raw_width)?;
        for col in 0..width {
            let value = (row_bytes[col + margin] as u32) << shift;
            image.set_channel(row, col, fc(profile.filters, row as i32, col as i32) as usize, value as u16);
        }
        if accumulate {
            black_sum += row_bytes[0] as i64
                + row_bytes[1] as i64
                + row_bytes[raw_width - 2] as i64
                + row_bytes[raw_width - 1] as i64;
        }
    }
    if accumulate {
        Ok((black_sum << shift) / (4 * height as i64))
    } else {
        Ok(0)
    }
}

fn apply_shift(sample: u32, shift: i32) -> u16 {
    let shifted = if shift >= 0 {
        sample << shift
    } else {
        sample >> (-shift)
    };
    shifted as u16
}

/// PowerShot 600: 26-byte header already skipped by the caller; rows
/// are 896 ten-bit samples packed into 1120 bytes, even rows first
/// then odd rows.
pub fn decode_ps600<R: Read>(
    src: &mut R,
    image: &mut MosaicImage,
    profile: &CameraProfile,
) -> Result<i64> {
    let width = profile.width as usize;
    let height = profile.height as usize;
    let mut orow = 0usize;
    let mut black_sum: i64 = 0;
    for _irow in 0..height {
        let data = read_exact_vec(src, 1120)?;
        let mut pixel = [0u16; 896];
        for (group, chunk) in data.chunks_exact(10).enumerate() {
            let dp = chunk;
            let base = group * 8;
            pixel[base] = ((dp[0] as u16) << 2) + (dp[1] as u16 >> 6);
            pixel[base + 1] = ((dp[2] as u16) << 2) + ((dp[1] as u16 >> 4) & 3);
            pixel[base + 2] = ((dp[3] as u16) << 2) + ((dp[1] as u16 >> 2) & 3);
            pixel[base + 3] = ((dp[4] as u16) << 2) + (dp[1] as u16 & 3);
            pixel[base + 4] = ((dp[5] as u16) << 2) + (dp[9] as u16 & 3);
            pixel[base + 5] = ((dp[6] as u16) << 2) + ((dp[9] as u16 >> 2) & 3);
            pixel[base + 6] = ((dp[7] as u16) << 2) + ((dp[9] as u16 >> 4) & 3);
            pixel[base + 7] = ((dp[8] as u16) << 2) + (dp[9] as u16 >> 6);
        }
        for col in 0..width {
            image.set_channel(
                orow,
                col,
                fc(profile.filters, orow as i32, col as i32) as usize,
                pixel[col] << 4,
            );
        }
        for &p in &pixel[width..896] {
            black_sum += p as i64;
        }
        orow += 2;
        if orow > height {
            orow = 1;
        }
    }
    Ok((black_sum << 4) / ((896 - width) as i64 * height as i64))
}

/// The real Nucore loader: 16-bit little-endian samples, one pair per
/// site, with the "BMQ" body's specific row reorder (the container's
/// `model[0] == 'B'` and `width == 2598` case) applied before the CFA
/// write so `FC` sees the final row, not the on-disk one.
pub fn decode_nucore<R: Read>(src: &mut R, image: &mut MosaicImage, profile: &CameraProfile) -> Result<()> {
    let width = profile.width as usize;
    let height = profile.height as usize;
    let reorder = profile.model.starts_with('B') && width == 2598;

    for irow in 0..height {
        let data = read_exact_vec(src, width * 2)?;
        let row = if reorder {
            height - 1 - irow / 2 - height / 2 * (irow & 1)
        } else {
            irow
        };
        for (col, pair) in data.chunks_exact(2).enumerate() {
            let value = ((pair[0] as u32) << 2) + ((pair[1] as u32) << 10);
            image.set_channel(row, col, fc(profile.filters, row as i32, col as i32) as usize, value as u16);
        }
    }
    Ok(())
}

/// Shared 10-byte -> 8-sample layout used by A5, A50 and Pro70.
fn unpack_group_a5(dp: &[u8]) -> [u16; 8] {
    [
        ((dp[1] as u16) << 2) + (dp[0] as u16 >> 6),
        ((dp[0] as u16) << 4) + (dp[3] as u16 >> 4),
        ((dp[3] as u16) << 6) + (dp[2] as u16 >> 2),
        ((dp[2] as u16) << 8) + (dp[5] as u16),
        ((dp[4] as u16) << 2) + (dp[7] as u16 >> 6),
        ((dp[7] as u16) << 4) + (dp[6] as u16 >> 4),
        ((dp[6] as u16) << 6) + (dp[9] as u16 >> 2),
        ((dp[9] as u16) << 8) + (dp[8] as u16),
    ]
}

pub enum A5Variant {
    A5,
    A50,
    Pro70,
}

pub fn decode_a5_family<R: Read>(
    src: &mut R,
    image: &mut MosaicImage,
    profile: &CameraProfile,
    variant: A5Variant,
    row_bytes: usize,
    samples_per_row: usize,
) -> Result<()> {
    let width = profile.width as usize;
    let height = profile.height as usize;
    let mask10 = !matches!(variant, A5Variant::Pro70);
    for row in 0..height {
        let data = read_exact_vec(src, row_bytes)?;
        let mut pixel = vec![0u16; samples_per_row];
        for (group, chunk) in data.chunks_exact(10).enumerate() {
            let base = group * 8;
            pixel[base..base + 8].copy_from_slice(&unpack_group_a5(chunk));
        }
        for col in 0..width {
            let mut value = pixel[col];
            if mask10 {
                value &= 0x3ff;
            }
            image.set_channel(row, col, fc(profile.filters, row as i32, col as i32) as usize, value << 4);
        }
    }
    Ok(())
}

/// QV-5700's 5-byte -> 4-sample layout, 10-bit masked.
pub fn decode_casio_qv5700<R: Read>(
    src: &mut R,
    image: &mut MosaicImage,
    profile: &CameraProfile,
) -> Result<()> {
    let width = profile.width as usize;
    let height = profile.height as usize;
    for row in 0..height {
        let data = read_exact_vec(src, 3232)?;
        let mut pixel = [0u16; 2576];
        let mut pix_idx = 0usize;
        for chunk in data[..3220].chunks_exact(5) {
            pixel[pix_idx] = ((chunk[0] as u16) << 2) + (chunk[1] as u16 >> 6);
            pixel[pix_idx + 1] = ((chunk[1] as u16) << 4) + (chunk[2] as u16 >> 4);
            pixel[pix_idx + 2] = ((chunk[2] as u16) << 6) + (chunk[3] as u16 >> 2);
            pixel[pix_idx + 3] = ((chunk[3] as u16) << 8) + chunk[4] as u16;
            pix_idx += 4;
        }
        for col in 0..width {
            let value = (pixel[col] & 0x3ff) << 4;
            image.set_channel(row, col, fc(profile.filters, row as i32, col as i32) as usize, value);
        }
    }
    Ok(())
}

/// Rollei's interleaved 10-bit/6-bit stream with a pixel-index
/// permutation: every group of ten bytes yields five "ten" samples
/// taken in order and, once enough bits have accumulated, a "six"
/// sample drawn from the high bits of each of the first five bytes.
pub fn decode_rollei<R: Read>(
    src: &mut R,
    image: &mut MosaicImage,
    profile: &CameraProfile,
    left: u32,
    top: u32,
) -> Result<()> {
    let raw_width = profile.raw_width as i64;
    let width = profile.width as i64;
    let height = profile.height as i64;
    let mut iten: i64 = 0;
    let mut isix: i64 = (profile.raw_width as i64 * profile.raw_height as i64 * 5) / 8;
    let mut todo = [0i64; 16];

    loop {
        let mut pixel = [0u8; 10];
        if src.read_exact(&mut pixel).is_err() {
            break;
        }
        let mut buffer: i64 = 0;
        let mut i = 0usize;
        while i < 10 {
            todo[i] = iten;
            iten += 1;
            todo[i + 1] = ((pixel[i] as i64) << 8) | pixel[i + 1] as i64;
            buffer = ((pixel[i] as i64) >> 2) | (buffer << 6);
            i += 2;
        }
        while i < 16 {
            todo[i] = isix;
            isix += 1;
            todo[i + 1] = buffer >> ((14 - i as i64) * 5);
            i += 2;
        }
        let mut j = 0usize;
        while j < 16 {
            let row = todo[j] / raw_width - top as i64;
            let col = todo[j] % raw_width - left as i64;
            if row >= 0 && row < height && col >= 0 && col < width {
                let value = ((todo[j + 1] & 0x3ff) << 4) as u16;
                image.set_channel(
                    row as usize,
                    col as usize,
                    fc(profile.filters, row as i32, col as i32) as usize,
                    value,
                );
            }
            j += 2;
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

    fn test_profile(width: u32, height: u32, filters: u32) -> CameraProfile {
        CameraProfile {
            make: "Test".into(),
            model: "Packed10".into(),
            raw_width: width,
            raw_height: height,
            width,
            height,
            colors: 3,
            filters,
            is_cmy: false,
            is_foveon: false,
            ymag: 1,
            black: 0,
            rgb_max: 0x3fff,
            pre_mul: [1.0; 4],
            use_coeff: false,
            coeff: [[0.0; 4]; 3],
            decoder: DecoderKind::Packed {
                bits: 10,
                shift: 4,
                interleaved: false,
                mask10: false,
                row_stride_bytes: None,
            },
            data_offset: 0,
            timestamp: 0,
            camera_red: 1.0,
            camera_blue: 1.0,
        }
    }

    #[test]
    fn packed10_round_trip_shifts_by_4() {
        // Two little-endian-packed 10-bit samples: 1023, then 0.
        let bytes = vec![0xFF, 0x03, 0x00];
        let profile = test_profile(2, 1, 0);
        let mut image = MosaicImage::new(Dim2::new(2, 1));
        let mut cursor = Cursor::new(bytes);
        decode_packed_le(&mut cursor, &mut image, &profile, 10, 4, 3).unwrap();
        assert_eq!(image.get(0, 0)[fc(0, 0, 0) as usize], 1023 << 4);
        assert_eq!(image.get(0, 1)[fc(0, 0, 1) as usize], 0);
    }
}
