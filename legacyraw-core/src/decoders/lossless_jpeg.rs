use std::io::Read;

use crate::error::Result;
use crate::image::MosaicImage;
use crate::profile::CameraProfile;

/// Canon's EOS-1D/1Ds and a handful of Kodak DCS bodies wrap their
/// sensor data in a standard lossless JFIF stream instead of a
/// camera-specific codec. Decoding ITU T.81 predictive/lossless JPEG
/// is a general-purpose concern with its own mature crates, not a
/// 1990s-camera-specific one, so it lives behind this trait rather
/// than being reimplemented here: profiles that need it resolve to
/// `DecodeError::UnsupportedFormat` unless a caller supplies one.
pub trait LosslessJpegDecoder {
    fn decode(&self, src: &mut dyn Read, image: &mut MosaicImage, profile: &CameraProfile) -> Result<()>;
}
