//! `.badpixels` side-channel support: a plain-text list of `col row
//! time` triples, one entry per known-defective sensor site, applied
//! by averaging same-color neighbors around it.

use std::fs;
use std::path::{Path, PathBuf};

use crate::cfa::fc;
use crate::image::MosaicImage;

#[derive(Debug, Clone, Copy)]
pub struct BadPixel {
    pub col: i64,
    pub row: i64,
    pub timestamp: i64,
}

/// Search `start` and its ancestors for a `.badpixels` file, the way
/// the original walks up from the current directory by string-splicing
/// its own path; `Path::ancestors()` gives the same upward walk without
/// manual separator surgery.
pub fn find_badpixels_file(start: &Path) -> Option<PathBuf> {
    for dir in start.ancestors() {
        let candidate = dir.join(".badpixels");
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

pub fn parse_badpixels(contents: &str) -> Vec<BadPixel> {
    contents
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let col = parts.next()?.parse().ok()?;
            let row = parts.next()?.parse().ok()?;
            let timestamp = parts.next()?.parse().ok()?;
            Some(BadPixel { col, row, timestamp })
        })
        .collect()
}

pub fn load_badpixels(start: &Path) -> std::io::Result<Vec<BadPixel>> {
    match find_badpixels_file(start) {
        Some(path) => Ok(parse_badpixels(&fs::read_to_string(path)?)),
        None => Ok(Vec::new()),
    }
}

/// Replace every entry whose `timestamp <= as_of` with the mean of its
/// same-color neighbors, starting at radius 1 and widening to radius 2
/// if no same-color neighbor exists at radius 1, matching the
/// original's retry-at-wider-radius behavior.
pub fn apply_badpixels(image: &mut MosaicImage, filters: u32, colors: usize, entries: &[BadPixel], as_of: i64) {
    let dim = image.dim;
    for entry in entries {
        if entry.timestamp > as_of {
            continue;
        }
        if entry.row < 0 || entry.col < 0 {
            continue;
        }
        let (row, col) = (entry.row as usize, entry.col as usize);
        if row >= dim.height || col >= dim.width {
            continue;
        }
        let channel = fc(filters, row as i32, col as i32) as usize;
        if channel >= colors {
            continue;
        }

        let mut replaced = false;
        for radius in [1i64, 2] {
            let (sum, count) = same_color_mean(image, filters, dim, row, col, channel, radius);
            if count > 0 {
                image.set_channel(row, col, channel, (sum / count as f64).round() as u16);
                replaced = true;
                break;
            }
        }
        let _ = replaced;
    }
}

fn same_color_mean(
    image: &MosaicImage,
    filters: u32,
    dim: crate::image::Dim2,
    row: usize,
    col: usize,
    channel: usize,
    radius: i64,
) -> (f64, u32) {
    let mut sum = 0f64;
    let mut count = 0u32;
    for dr in -radius..=radius {
        for dc in -radius..=radius {
            if dr == 0 && dc == 0 {
                continue;
            }
            let r = row as i64 + dr;
            let c = col as i64 + dc;
            if r < 0 || c < 0 || r as usize >= dim.height || c as usize >= dim.width {
                continue;
            }
            if fc(filters, r as i32, c as i32) as usize != channel {
                continue;
            }
            sum += image.get(r as usize, c as usize)[channel] as f64;
            count += 1;
        }
    }
    (sum, count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Dim2;

    #[test]
    fn parses_col_row_time_lines() {
        let text = "10 20 1000000000\n5 5 999999999\n";
        let entries = parse_badpixels(text);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].col, 10);
        assert_eq!(entries[0].row, 20);
        assert_eq!(entries[0].timestamp, 1_000_000_000);
    }

    #[test]
    fn finds_badpixels_file_in_an_ancestor_directory() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(root.path().join(".badpixels"), "1 1 0\n").unwrap();

        let found = find_badpixels_file(&nested).expect("should find the file in an ancestor");
        assert_eq!(found, root.path().join(".badpixels"));
    }

    #[test]
    fn radius_one_same_color_average_replaces_bad_pixel() {
        // 0x94949494 -> row0: col0=2,col1=3 ; row1: col0=1,col1=0 pattern
        let filters = 0x94949494u32;
        let dim = Dim2::new(5, 5);
        let mut image = MosaicImage::new(dim);
        let center_channel = fc(filters, 2, 2) as usize;
        for dr in -1i64..=1 {
            for dc in -1i64..=1 {
                let r = (2 + dr) as usize;
                let c = (2 + dc) as usize;
                if fc(filters, r as i32, c as i32) as usize == center_channel {
                    image.set_channel(r, c, center_channel, 250);
                }
            }
        }
        image.set_channel(2, 2, center_channel, 9999);

        let entries = vec![BadPixel {
            col: 2,
            row: 2,
            timestamp: 0,
        }];
        apply_badpixels(&mut image, filters, 3, &entries, 100);
        assert_eq!(image.get(2, 2)[center_channel], 250);
    }
}
