/// Tagged union over the raw decoders of §4.3, carrying whatever
/// per-decoder parameters that family needs instead of a raw function
/// pointer plus process-global scratch.
#[derive(Debug, Clone, PartialEq)]
pub enum DecoderKind {
    /// `N`-bit packed samples; `interleaved` selects the even/odd-row
    /// ordering used by the 600-style loader, `mask10` reproduces the
    /// A5/A50 high-bit masking, `shift` is the left-shift into the
    /// 14-bit headroom (or a negative value for a right shift, as
    /// Olympus's 16-bit loader needs).
    Packed {
        bits: u32,
        shift: i32,
        interleaved: bool,
        mask10: bool,
        row_stride_bytes: Option<usize>,
    },
    /// The 10-byte/5-byte Rollei layout: 10-bit samples and 6-bit
    /// residuals interleaved with a pixel-index permutation.
    Rollei,
    /// QV-5700's 5-byte to 4-sample packing.
    CasioQv5700,
    /// PowerShot A5's 10-byte/8-sample group layout with the high two
    /// bits masked off.
    PowerShotA5,
    /// PowerShot A50, same group layout as A5.
    PowerShotA50,
    /// PowerShot Pro70, same group layout but without the 10-bit mask.
    PowerShotPro70,
    /// Trivial unshifted byte-per-sample reader (Casio/Kodak "easy").
    /// `margin_black` gates whether the discarded edge columns feed a
    /// black-level estimate (Kodak's loader does, Casio's doesn't);
    /// `shift` is the left-shift into 14-bit headroom both families use.
    Easy8 { margin_black: bool, shift: u32 },
    /// Big-endian 16-bit unpacked samples, shifted by `shift`.
    Unpacked16 { shift: i32 },
    /// PowerShot 600's 10-bit/1120-byte-row interleaved-row layout.
    PowerShot600,
    /// The real Nucore loader: 16-bit little-endian samples, with a
    /// model/width-specific row reorder.
    Nucore,
    CanonDifferential { header_skip: u64 },
    NikonHuffman,
    KodakCompressed,
    KodakYuv,
    FujiS2,
    FujiS5000,
    FujiF700,
    Foveon,
    /// A profile that would need the external lossless-JPEG decoder.
    LosslessJpeg,
}

/// Immutable record produced by identification, read-only for the
/// lifetime of one decode.
#[derive(Debug, Clone)]
pub struct CameraProfile {
    pub make: String,
    pub model: String,
    pub raw_width: u32,
    pub raw_height: u32,
    pub width: u32,
    pub height: u32,
    pub colors: u8,
    pub filters: u32,
    pub is_cmy: bool,
    pub is_foveon: bool,
    pub ymag: u32,
    pub black: i64,
    pub rgb_max: i64,
    pub pre_mul: [f64; 4],
    pub use_coeff: bool,
    pub coeff: [[f64; 4]; 3],
    pub decoder: DecoderKind,
    pub data_offset: u64,
    pub timestamp: i64,
    pub camera_red: f64,
    pub camera_blue: f64,
}

impl CameraProfile {
    pub fn colors_used(&self) -> usize {
        self.colors as usize
    }
}

/// The external seam identification lives behind: a real
/// implementation would sniff TIFF/CIFF/Minolta/Foveon/Rollei
/// containers and white-balance tags. The core only ever consumes the
/// resulting profile.
pub trait Identifier {
    fn identify(&self, make: &str, model: &str, raw_width: u32) -> Option<CameraProfile>;
}
