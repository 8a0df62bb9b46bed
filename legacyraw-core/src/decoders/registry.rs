use crate::profile::{CameraProfile, DecoderKind, Identifier};

/// One reference-table row. Most fields mirror `CameraProfile`
/// directly; `raw_width` is the table's lookup key, matching the
/// original `identify()`'s use of the sensor's raw column count as the
/// primary disambiguator between same-make models.
struct CameraEntry {
    make: &'static str,
    model: &'static str,
    raw_width: u32,
    raw_height: u32,
    crop: (u32, u32, u32, u32), // top, left, bottom-margin, right-margin
    colors: u8,
    filters: u32,
    is_cmy: bool,
    is_foveon: bool,
    ymag: u32,
    rgb_max: i64,
    pre_mul: [f64; 4],
    decoder: DecoderKind,
}

macro_rules! entry {
    ($make:expr, $model:expr, $rw:expr, $rh:expr, $crop:expr, $colors:expr, $filters:expr,
     $pre_mul:expr, $decoder:expr) => {
        CameraEntry {
            make: $make,
            model: $model,
            raw_width: $rw,
            raw_height: $rh,
            crop: $crop,
            colors: $colors,
            filters: $filters,
            is_cmy: false,
            is_foveon: false,
            ymag: 1,
            rgb_max: 0xffff,
            pre_mul: $pre_mul,
            decoder: $decoder,
        }
    };
}

static TABLE: &[CameraEntry] = &[
    entry!(
        "Canon", "PowerShot 600", 613, 854, (0, 0, 0, 0), 4, 0xe1e4e1e4,
        [1.137, 1.0, 1.0, 1.257], DecoderKind::PowerShot600
    ),
    entry!(
        "Canon", "PowerShot A5", 776, 960, (0, 0, 0, 0), 4, 0x1e4e1e4e,
        [1.5842, 1.2966, 1.0419, 1.0], DecoderKind::PowerShotA5
    ),
    entry!(
        "Canon", "PowerShot A50", 968, 1290, (0, 0, 0, 0), 4, 0x1b4e4b1e,
        [1.750, 1.381, 1.0, 1.182], DecoderKind::PowerShotA50
    ),
    entry!(
        "Canon", "PowerShot Pro70", 1024, 1552, (0, 0, 0, 0), 4, 0x1e4b4e1b,
        [1.389, 1.343, 1.0, 1.034], DecoderKind::PowerShotPro70
    ),
    entry!(
        "Canon", "PowerShot Pro90 IS", 1416, 1896, (0, 0, 0, 0), 4, 0xb4b4b4b4,
        [1.496, 1.509, 1.0, 1.009], DecoderKind::CanonDifferential { header_skip: 540 }
    ),
    entry!(
        "Canon", "PowerShot G1", 1550, 2088, (8, 4, 0, 0), 4, 0xb4b4b4b4,
        [1.446, 1.405, 1.016, 1.0], DecoderKind::CanonDifferential { header_skip: 540 }
    ),
    entry!(
        "Canon", "PowerShot S30", 1550, 2088, (0, 0, 0, 0), 3, 0x94949494,
        [1.785, 1.0, 1.266, 1.0], DecoderKind::CanonDifferential { header_skip: 540 }
    ),
    entry!(
        "Canon", "PowerShot G2", 1720, 2312, (6, 12, 0, 0), 3, 0x94949494,
        [1.0, 1.0, 1.0, 1.0], DecoderKind::CanonDifferential { header_skip: 540 }
    ),
    entry!(
        "Canon", "EOS D30", 1448, 2176, (6, 48, 0, 0), 3, 0x94949494,
        [1.592, 1.0, 1.261, 1.0], DecoderKind::CanonDifferential { header_skip: 540 }
    ),
    entry!(
        "Canon", "EOS D60", 2056, 3088, (12, 64, 0, 0), 3, 0x94949494,
        [2.242, 1.0, 1.245, 1.0], DecoderKind::CanonDifferential { header_skip: 540 }
    ),
    entry!(
        "Canon", "EOS-1D", 1662, 2496, (0, 0, 0, 0), 3, 0x61616161,
        [1.976, 1.0, 1.282, 1.0], DecoderKind::LosslessJpeg
    ),
    entry!(
        "Canon", "EOS-1Ds", 2718, 4082, (0, 0, 0, 0), 3, 0x61616161,
        [1.66, 1.0, 1.13, 1.0], DecoderKind::LosslessJpeg
    ),
    entry!(
        "Nikon", "D1", 1324, 2012, (0, 0, 0, 0), 3, 0x16161616,
        [0.838, 1.0, 1.095, 1.0], DecoderKind::NikonHuffman
    ),
    entry!(
        "Nikon", "D1H", 1324, 2012, (0, 0, 0, 0), 3, 0x16161616,
        [1.347, 1.0, 3.279, 1.0], DecoderKind::NikonHuffman
    ),
    entry!(
        "Nikon", "D1X", 1324, 4024, (0, 0, 0, 0), 3, 0x16161616,
        [1.910, 1.0, 1.220, 1.0], DecoderKind::NikonHuffman
    ),
    entry!(
        "Nikon", "D100", 2024, 3037, (0, 0, 0, 0), 3, 0x61616161,
        [2.374, 1.0, 1.677, 1.0], DecoderKind::NikonHuffman
    ),
    entry!(
        "Olympus", "E-10", 1684, 2256, (0, 0, 0, 0), 3, 0x94949494,
        [1.43, 1.0, 1.77, 1.0], DecoderKind::Unpacked16 { shift: -2 }
    ),
    entry!(
        "Olympus", "E-20", 1924, 2576, (0, 0, 0, 0), 3, 0x94949494,
        [1.43, 1.0, 1.77, 1.0], DecoderKind::Unpacked16 { shift: -2 }
    ),
    entry!(
        "Olympus", "C5050Z", 1926, 2576, (0, 0, 0, 0), 3, 0x16161616,
        [1.533, 1.0, 1.880, 1.0],
        DecoderKind::Packed { bits: 12, shift: 2, interleaved: false, mask10: false, row_stride_bytes: None }
    ),
    entry!(
        "Kyocera", "N Digital", 2047, 3072, (0, 0, 0, 0), 3, 0x61616161,
        [1.366, 1.0, 1.251, 1.0],
        DecoderKind::Packed { bits: 12, shift: 2, interleaved: false, mask10: false, row_stride_bytes: None }
    ),
    entry!(
        "Rollei", "d530flex", 1316, 2016, (0, 0, 0, 0), 3, 0x16161616,
        [1.8, 1.0, 1.3, 1.0], DecoderKind::Rollei
    ),
    // Nucore's `identify()` branch doesn't discriminate on model at all
    // (`height = raw_height; width = raw_width; filters = 0x61616161;`);
    // "BMQ" is the body whose 2598-wide row reorder `decode_nucore`
    // special-cases, raw_height chosen to be a plausible sensor height
    // since the original reads it from the container rather than a
    // per-model table.
    entry!(
        "Nucore", "BMQ", 2598, 1944, (0, 0, 0, 0), 3, 0x61616161,
        [1.0, 1.0, 1.0, 1.0], DecoderKind::Nucore
    ),
    entry!(
        "Fuji", "FinePixS2Pro", 3583, 3584, (0, 0, 0, 0), 3, 0x61616161,
        [1.424, 1.0, 1.718, 1.0], DecoderKind::FujiS2
    ),
    entry!(
        "Fuji", "FinePix S5000", 2500, 2499, (0, 0, 0, 0), 3, 0x49494949,
        [1.639, 1.0, 1.438, 1.0], DecoderKind::FujiS5000
    ),
    entry!(
        "Fuji", "FinePix F700", 2524, 2523, (0, 0, 0, 0), 3, 0x49494949,
        [1.639, 1.0, 1.438, 1.0], DecoderKind::FujiF700
    ),
    entry!(
        "Casio", "QV-5700", 2576, 1924, (0, 0, 0, 0), 3, 0x94949494,
        [1.0, 1.0, 1.0, 1.0], DecoderKind::CasioQv5700
    ),
    // QV-2000UX's `raw_width == width` (no margin), so `decode_easy8`
    // never touches its black-level path regardless of `margin_black`;
    // it's still `false` here because `casio_easy_load_raw` never
    // computes one even on the bodies that do carry a margin.
    entry!(
        "Casio", "QV-2000UX", 1632, 1208, (0, 0, 0, 0), 3, 0x94949494,
        [1.0, 1.0, 1.0, 1.0], DecoderKind::Easy8 { margin_black: false, shift: 6 }
    ),
    // DCS420's 4-column-narrower sensor (`width -= 4` in `identify()`)
    // splits into a 2-column margin each side; raw dimensions are
    // representative since the original reads them from the container's
    // own tags rather than a literal per-model table.
    entry!(
        "Kodak", "DCS420", 1548, 1020, (0, 2, 0, 2), 3, 0x61616161,
        [1.21, 1.0, 1.63, 1.0], DecoderKind::Easy8 { margin_black: true, shift: 6 }
    ),
    // DCS Pro 14n's two DCR compression variants share an identify
    // branch; `raw_width` stands in as the table's disambiguator since
    // the original distinguishes them via `kodak_data_compression`
    // instead. Dimensions are representative for the same reason as
    // DCS420 above.
    entry!(
        "Kodak", "DCS Pro 14n", 4540, 3048, (0, 0, 0, 0), 3, 0x61616161,
        [1.0, 1.0191, 1.1567, 1.0], DecoderKind::KodakCompressed
    ),
    entry!(
        "Kodak", "DCS Pro 14n", 4541, 3048, (0, 0, 0, 0), 3, 0,
        [1.0, 1.0191, 1.1567, 1.0], DecoderKind::KodakYuv
    ),
    // SD9's border trim matches `foveon_border`'s literal 763/1152
    // case; `bottom`/`right` make up the rest of dcraw's 763->756 and
    // 1152->1136 reductions that the border function alone doesn't
    // account for (it only trims the top/left origin).
    CameraEntry {
        make: "Sigma",
        model: "SD9",
        raw_width: 1152,
        raw_height: 763,
        crop: (2, 8, 5, 8),
        colors: 3,
        filters: 0,
        is_cmy: false,
        is_foveon: true,
        ymag: 1,
        rgb_max: 5600,
        pre_mul: [1.0, 1.0, 1.0, 1.0],
        decoder: DecoderKind::Foveon,
    },
];

/// `Identifier` built over the reference table above, matching the
/// exact make/model/raw_width triples a few hundred lines of `identify()`
/// string comparisons would resolve to; the ambiguity-breaking by
/// `raw_width` mirrors dcraw's own use of it as the final tiebreaker
/// between same-make models.
pub struct TableIdentifier;

impl Identifier for TableIdentifier {
    fn identify(&self, make: &str, model: &str, raw_width: u32) -> Option<CameraProfile> {
        let candidate = TABLE.iter().find(|e| {
            e.make.eq_ignore_ascii_case(make) && e.model.eq_ignore_ascii_case(model) && e.raw_width == raw_width
        })?;

        let (top, left, bottom, right) = candidate.crop;
        let width = candidate.raw_width - left - right;
        let height = candidate.raw_height - top - bottom;

        Some(CameraProfile {
            make: candidate.make.to_string(),
            model: candidate.model.to_string(),
            raw_width: candidate.raw_width,
            raw_height: candidate.raw_height,
            width,
            height,
            colors: candidate.colors,
            filters: candidate.filters,
            is_cmy: candidate.is_cmy,
            is_foveon: candidate.is_foveon,
            ymag: candidate.ymag,
            black: 0,
            rgb_max: candidate.rgb_max,
            pre_mul: candidate.pre_mul,
            use_coeff: false,
            coeff: [[0.0; 4]; 3],
            decoder: candidate.decoder.clone(),
            data_offset: 0,
            timestamp: 0,
            camera_red: 1.0,
            camera_blue: 1.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_model_by_raw_width() {
        let id = TableIdentifier;
        let profile = id.identify("Canon", "EOS D30", 1448).unwrap();
        assert_eq!(profile.width, 1448 - 48);
        assert_eq!(profile.height, 2176 - 6);
        assert_eq!(profile.filters, 0x94949494);
    }

    #[test]
    fn unknown_model_returns_none() {
        let id = TableIdentifier;
        assert!(id.identify("Acme", "Imaginary 9000", 1234).is_none());
    }

    #[test]
    fn every_decoder_kind_has_a_reachable_table_entry() {
        use std::mem::discriminant;

        let kinds = [
            discriminant(&DecoderKind::Packed {
                bits: 0,
                shift: 0,
                interleaved: false,
                mask10: false,
                row_stride_bytes: None,
            }),
            discriminant(&DecoderKind::Rollei),
            discriminant(&DecoderKind::CasioQv5700),
            discriminant(&DecoderKind::PowerShotA5),
            discriminant(&DecoderKind::PowerShotA50),
            discriminant(&DecoderKind::PowerShotPro70),
            discriminant(&DecoderKind::Easy8 { margin_black: false, shift: 0 }),
            discriminant(&DecoderKind::Unpacked16 { shift: 0 }),
            discriminant(&DecoderKind::PowerShot600),
            discriminant(&DecoderKind::Nucore),
            discriminant(&DecoderKind::CanonDifferential { header_skip: 0 }),
            discriminant(&DecoderKind::NikonHuffman),
            discriminant(&DecoderKind::KodakCompressed),
            discriminant(&DecoderKind::KodakYuv),
            discriminant(&DecoderKind::FujiS2),
            discriminant(&DecoderKind::FujiS5000),
            discriminant(&DecoderKind::FujiF700),
            discriminant(&DecoderKind::Foveon),
            discriminant(&DecoderKind::LosslessJpeg),
        ];

        for kind in kinds {
            assert!(
                TABLE.iter().any(|e| discriminant(&e.decoder) == kind),
                "no table entry reaches decoder variant {:?}",
                kind
            );
        }
    }
}
