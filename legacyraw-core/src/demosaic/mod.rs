pub mod vng;

use crate::image::MosaicImage;

/// Output of demosaicing: a full 4-channel image the same shape as the
/// `MosaicImage` it was built from, but with every site's unmeasured
/// channels filled in from neighbors rather than left at zero.
pub type DemosaicedImage = MosaicImage;

/// Shared contract for the CFA interpolation strategies in `§4.5`.
/// Implementors may assume `filters` is a standard 2x2-periodic Bayer
/// descriptor (`colors == 3`); 4-color sensors and Foveon's
/// non-mosaiced stack bypass this trait entirely (see
/// `crate::foveon_pipeline`).
pub trait Demosaic {
    fn interpolate(&self, source: &MosaicImage, filters: u32, colors: usize) -> DemosaicedImage;
}
