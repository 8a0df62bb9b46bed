pub mod canon;
pub mod foveon;
pub mod fuji;
pub mod kodak;
pub mod lossless_jpeg;
pub mod nikon;
pub mod packed;
pub mod registry;

use std::io::{Read, Seek};

use crate::error::{DecodeError, Result};
use crate::image::MosaicImage;
use crate::profile::{CameraProfile, DecoderKind};

use foveon::decode_foveon;
use fuji::{decode_fuji_packed12, decode_fuji_s2};
use kodak::{decode_kodak_compressed, decode_kodak_yuv};
use lossless_jpeg::LosslessJpegDecoder;
use nikon::{decode_nikon_huffman, NikonCurve};
use packed::{
    decode_a5_family, decode_casio_qv5700, decode_easy8, decode_nucore, decode_packed_le,
    decode_packed_sequential, decode_ps600, decode_rollei, decode_unpacked16, A5Variant,
};

/// Per-decode inputs that a real container reader would normally have
/// pulled out of maker-note tags before calling into the codec: Nikon's
/// predictor seed curve, Foveon's per-file Huffman tables, and an
/// optional lossless-JPEG implementation for the Canon/Kodak bodies
/// that need one. Everything else a decoder needs lives on
/// `CameraProfile` itself.
#[derive(Default)]
pub struct DecodeAuxiliary<'a> {
    pub nikon_vpred: [i32; 4],
    pub nikon_curve: Option<NikonCurve>,
    pub nikon_left: u32,
    pub nikon_right: u32,
    pub foveon_huff: &'a [u32],
    pub foveon_diff: &'a [i16],
    pub lossless_jpeg: Option<&'a dyn LosslessJpegDecoder>,
}

/// Dispatch a decode by `profile.decoder`, writing into `image`.
/// Returns a black-level estimate where the decoder computes one from
/// border pixels (`0` otherwise, leaving black-level entirely to the
/// caller's own policy).
pub fn decode<R: Read + Seek>(
    src: &mut R,
    image: &mut MosaicImage,
    profile: &CameraProfile,
    aux: &DecodeAuxiliary,
) -> Result<i64> {
    match &profile.decoder {
        DecoderKind::Packed {
            bits,
            shift,
            interleaved: _,
            mask10: _,
            row_stride_bytes,
        } => {
            match row_stride_bytes {
                Some(stride) => decode_packed_le(src, image, profile, *bits, *shift, *stride)?,
                None => decode_packed_sequential(src, image, profile, *bits, *shift, 0)?,
            }
            Ok(0)
        }
        DecoderKind::Rollei => {
            // Rollei's raw stream carries no cropped border of its own.
            decode_rollei(src, image, profile, 0, 0)?;
            Ok(0)
        }
        DecoderKind::CasioQv5700 => {
            decode_casio_qv5700(src, image, profile)?;
            Ok(0)
        }
        DecoderKind::PowerShotA5 | DecoderKind::PowerShotA50 | DecoderKind::PowerShotPro70 => {
            let variant = match &profile.decoder {
                DecoderKind::PowerShotA5 => A5Variant::A5,
                DecoderKind::PowerShotA50 => A5Variant::A50,
                _ => A5Variant::Pro70,
            };
            let samples_per_row = profile.raw_width as usize;
            let row_bytes = ((samples_per_row + 7) / 8) * 10;
            decode_a5_family(src, image, profile, variant, row_bytes, samples_per_row)?;
            Ok(0)
        }
        DecoderKind::Easy8 { margin_black, shift } => decode_easy8(src, image, profile, *shift, *margin_black),
        DecoderKind::Unpacked16 { shift } => {
            decode_unpacked16(src, image, profile, *shift)?;
            Ok(0)
        }
        DecoderKind::PowerShot600 => decode_ps600(src, image, profile),
        DecoderKind::Nucore => {
            decode_nucore(src, image, profile)?;
            Ok(0)
        }
        DecoderKind::CanonDifferential { header_skip } => canon::decode_canon_compressed(
            src,
            image,
            profile,
            canon_table_index(&profile.model),
            profile.data_offset,
            *header_skip,
        ),
        DecoderKind::NikonHuffman => {
            let curve = aux
                .nikon_curve
                .clone()
                .unwrap_or_else(|| NikonCurve::identity(0x4000));
            decode_nikon_huffman(
                src,
                image,
                profile,
                aux.nikon_vpred,
                &curve,
                aux.nikon_left,
                aux.nikon_right,
            )?;
            Ok(0)
        }
        DecoderKind::KodakCompressed => {
            decode_kodak_compressed(src, image, profile)?;
            Ok(0)
        }
        DecoderKind::KodakYuv => {
            decode_kodak_yuv(src, image, profile)?;
            Ok(0)
        }
        DecoderKind::FujiS2 => {
            decode_fuji_s2(src, image, profile)?;
            Ok(0)
        }
        DecoderKind::FujiS5000 | DecoderKind::FujiF700 => {
            decode_fuji_packed12(src, image, profile)?;
            Ok(0)
        }
        DecoderKind::Foveon => {
            decode_foveon(src, image, profile, aux.foveon_huff, aux.foveon_diff)?;
            Ok(0)
        }
        DecoderKind::LosslessJpeg => match aux.lossless_jpeg {
            Some(codec) => {
                codec.decode(src, image, profile)?;
                Ok(0)
            }
            None => Err(DecodeError::UnsupportedFormat(format!(
                "{} {} requires an external lossless-JPEG decoder",
                profile.make, profile.model
            ))),
        },
    }
}

/// Canon's three-table pair selection is driven by the specific model,
/// matching the original decoder's `table` local deduced from a small
/// set of string comparisons against `model`.
fn canon_table_index(model: &str) -> usize {
    if model.contains("D2000") {
        1
    } else if model.contains("PowerShot Pro90") || model.contains("PowerShot G1") {
        2
    } else {
        0
    }
}
