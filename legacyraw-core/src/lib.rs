//! Decoding pipeline for raw sensor formats out of late-1990s and
//! early-2000s digital cameras: packed and Huffman-coded Bayer
//! mosaics, Kodak's delta and YUV codecs, Fuji's rotated Super CCD
//! layout, and Foveon's stacked three-layer sensor, carried through to
//! a demosaiced, color-balanced, gamma-encoded image.

pub mod badpixels;
pub mod bitreader;
pub mod cfa;
pub mod color;
pub mod decoders;
pub mod demosaic;
pub mod error;
pub mod foveon_pipeline;
pub mod huffman;
pub mod image;
pub mod pipeline;
pub mod profile;
pub mod sink;

pub use error::{DecodeError, Result};
pub use profile::{CameraProfile, DecoderKind, Identifier};
