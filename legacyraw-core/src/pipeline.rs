//! End-to-end orchestration: identify, decode, balance, demosaic or
//! run the Foveon pipeline, project to RGB, and hand the result to a
//! sink. `§5` calls for strictly sequential, single-threaded execution
//! with no shared mutable state across files, so this is a plain
//! function rather than a worker-pool abstraction.

use std::io::{Read, Seek, Write};
use std::path::Path;

use log::{debug, info};

use crate::badpixels::{apply_badpixels, load_badpixels};
use crate::color::{auto_scale, convert_to_rgb, scale_colors};
use crate::decoders::{decode, DecodeAuxiliary};
use crate::demosaic::vng::{BilinearDemosaic, VngDemosaic};
use crate::demosaic::Demosaic;
use crate::error::Result;
use crate::foveon_pipeline::FoveonPipeline;
use crate::image::{Dim2, MosaicImage};
use crate::profile::CameraProfile;
use crate::sink::ImageSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemosaicAlgorithm {
    Bilinear,
    Vng,
}

pub struct PipelineOptions {
    pub demosaic: DemosaicAlgorithm,
    pub document_mode: bool,
    pub apply_badpixels: bool,
    pub badpixels_search_root: Option<std::path::PathBuf>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        PipelineOptions {
            demosaic: DemosaicAlgorithm::Vng,
            document_mode: false,
            apply_badpixels: true,
            badpixels_search_root: None,
        }
    }
}

/// Run the full decode-to-sink pipeline for one already-identified
/// camera profile, reading raw sensor data from `src` and handing the
/// finished image to `sink`.
pub fn run<R: Read + Seek>(
    src: &mut R,
    profile: &CameraProfile,
    options: &PipelineOptions,
    aux: &DecodeAuxiliary,
    sink: &dyn ImageSink,
    out: &mut dyn Write,
) -> Result<()> {
    info!("decoding {} {} ({}x{})", profile.make, profile.model, profile.width, profile.height);

    let dim = Dim2::new(profile.width as usize, profile.height as usize);
    let mut image = MosaicImage::new(dim);
    let black_estimate = decode(src, &mut image, profile, aux)?;
    debug!("decoder reported black-level estimate {black_estimate}");

    if options.apply_badpixels {
        let root = options
            .badpixels_search_root
            .clone()
            .unwrap_or_else(|| Path::new(".").to_path_buf());
        if let Ok(entries) = load_badpixels(&root) {
            if !entries.is_empty() {
                debug!("applying {} bad-pixel corrections", entries.len());
                apply_badpixels(&mut image, profile.filters, profile.colors_used(), &entries, profile.timestamp);
            }
        }
    }

    let mut working = profile.clone();
    if options.document_mode {
        working.colors = 1;
        working.pre_mul = auto_scale(&image, profile.colors_used());
    }
    scale_colors(&mut image, &working);

    let rgb_source = if profile.is_foveon {
        let mut foveon_image = image;
        FoveonPipeline::default().process(&mut foveon_image);
        foveon_image
    } else {
        let demosaicer: &dyn Demosaic = match options.demosaic {
            DemosaicAlgorithm::Bilinear => &BilinearDemosaic,
            DemosaicAlgorithm::Vng => &VngDemosaic,
        };
        demosaicer.interpolate(&image, working.filters, working.colors_used())
    };

    let (projected, histogram) = convert_to_rgb(&rgb_source, &working);
    sink.write(out, &projected, &histogram)?;
    Ok(())
}
