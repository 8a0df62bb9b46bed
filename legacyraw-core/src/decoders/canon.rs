use std::io::{Read, Seek, SeekFrom};

use crate::bitreader::BitReader;
use crate::cfa::fc;
use crate::error::{DecodeError, Result};
use crate::huffman::{canon_trees, HuffmanTree};
use crate::image::MosaicImage;
use crate::profile::CameraProfile;

/// Probe the first 8192 bytes for the Canon byte-stuffing convention:
/// a literal `0xFF` not followed by `0x00` means the low-order-bits
/// plane is present after the Huffman stream.
pub fn canon_has_lowbits<R: Read + Seek>(src: &mut R) -> Result<bool> {
    src.seek(SeekFrom::Start(0))?;
    let mut buf = vec![0u8; 8192];
    let n = src.read(&mut buf)?;
    let mut ret = true;
    for i in 0..n.saturating_sub(1) {
        if buf[i] == 0xFF {
            if buf[i + 1] != 0 {
                return Ok(true);
            }
            ret = false;
        }
    }
    Ok(ret)
}

/// Border dimensions keyed on `raw_width`, matching the specific
/// camera models that use the Canon differential Huffman codec.
pub fn canon_border(raw_width: u32) -> (u32, u32) {
    match raw_width {
        2144 => (8, 4),   // G1
        2224 => (6, 48),  // EOS D30
        2376 => (6, 12),  // G2 / G3
        2672 => (6, 12),  // S50
        3152 => (12, 64), // EOS D60
        _ => (0, 0),
    }
}

struct BlockDecoder {
    carry: i32,
    base: [i32; 2],
    pixel: i64,
    raw_width: i64,
}

impl BlockDecoder {
    fn new(raw_width: i64) -> Self {
        BlockDecoder {
            carry: 0,
            base: [512, 512],
            pixel: 0,
            raw_width,
        }
    }

    fn decode_block<R: Read>(
        &mut self,
        br: &mut BitReader<R>,
        first: &HuffmanTree,
        second: &HuffmanTree,
        out: &mut [i32; 64],
    ) -> Result<()> {
        let mut diffbuf = [0i32; 64];
        let mut i: i32 = 0;
        while i < 64 {
            let leaf = if i == 0 {
                first.decode(br)?
            } else {
                second.decode(br)?
            };
            if leaf == 0 && i != 0 {
                break;
            }
            if leaf == 0xFF {
                i += 1;
                continue;
            }
            i += (leaf >> 4) as i32;
            let len = leaf & 0x0F;
            if len == 0 {
                i += 1;
                continue;
            }
            let sign = br.take_bit()?;
            let mut diff = br.take(len as u32 - 1)? as i32;
            if sign != 0 {
                diff += 1 << (len - 1);
            } else {
                diff += (-1i32 << len) + 1;
            }
            if (i as usize) < 64 {
                diffbuf[i as usize] = diff;
            }
            i += 1;
        }
        diffbuf[0] += self.carry;
        self.carry = diffbuf[0];
        for (k, d) in diffbuf.iter().enumerate() {
            if self.pixel % self.raw_width == 0 {
                self.base = [512, 512];
            }
            self.pixel += 1;
            self.base[k & 1] += d;
            out[k] = self.base[k & 1];
        }
        Ok(())
    }
}

/// Decode a full Canon-compressed raw payload into `image`. Returns
/// the border black-level estimate (already averaged).
pub fn decode_canon_compressed<R: Read + Seek>(
    src: &mut R,
    image: &mut MosaicImage,
    profile: &CameraProfile,
    table_index: usize,
    data_offset: u64,
    header_skip: u64,
) -> Result<i64> {
    let raw_width = profile.raw_width as i64;
    let raw_height = profile.raw_height as i64;
    let width = profile.width as i64;
    let height = profile.height as i64;
    let (top, left) = canon_border(profile.raw_width);

    let lowbits = canon_has_lowbits(src)?;
    let shift: i32 = if lowbits { 2 } else { 4 };

    let (first, second) = canon_trees(table_index)?;

    let huffman_start =
        data_offset as i64 + header_skip as i64 + if lowbits { raw_height * raw_width / 4 } else { 0 };
    src.seek(SeekFrom::Start(huffman_start as u64))?;
    let mut br = BitReader::new(&mut *src, false);

    let mut decoder = BlockDecoder::new(raw_width);
    let mut black_sum: i64 = 0;
    let mut black_count: i64 = 0;

    let mut row = 0i64;
    while row < raw_height {
        let blocks = (raw_width / 8) as usize;
        let mut pixel_buf = vec![0u16; (raw_width * 8) as usize];
        let mut block_out = [0i32; 64];
        for b in 0..blocks {
            decoder.decode_block(&mut br, &first, &second, &mut block_out)?;
            for (k, &v) in block_out.iter().enumerate() {
                pixel_buf[b * 64 + k] = v.max(0) as u16;
            }
        }

        if lowbits {
            // the Huffman bit reader has no exposed byte position, so the
            // low-bits pass saves/restores the raw stream position around it
            // rather than interleaving seeks with buffered bit state.
            drop(br);
            let cur = src.stream_position()?;
            let lowbits_offset = data_offset as i64 + 26 + row * raw_width / 4;
            src.seek(SeekFrom::Start(lowbits_offset as u64))?;
            let mut prow = 0usize;
            for _ in 0..(raw_width * 2) {
                let mut byte = [0u8; 1];
                src.read_exact(&mut byte).map_err(|_| DecodeError::Truncated {
                    offset: lowbits_offset as usize,
                    expected: 1,
                })?;
                let c = byte[0];
                let mut r = 0u32;
                while r < 8 {
                    let cur_val = pixel_buf[prow] as u32;
                    pixel_buf[prow] = ((cur_val << 2) + ((c as u32 >> r) & 3)) as u16;
                    prow += 1;
                    r += 2;
                }
            }
            src.seek(SeekFrom::Start(cur))?;
            br = BitReader::new(&mut *src, false);
        }

        for r in 0..8i64 {
            if row + r >= raw_height {
                break;
            }
            for col in 0..raw_width {
                let irow = row + r - top as i64;
                let icol = col - left as i64;
                let sample = pixel_buf[(r * raw_width + col) as usize];
                if irow < 0 || irow >= height {
                    continue;
                }
                if icol >= 0 && icol < width {
                    let channel = fc(profile.filters, irow as i32, icol as i32) as usize;
                    let shifted = ((sample as u32) << shift as u32) as u16;
                    image.set_channel(irow as usize, icol as usize, channel, shifted);
                } else {
                    black_sum += sample as i64;
                    black_count += 1;
                }
            }
        }
        row += 8;
    }

    if black_count > 0 {
        Ok((black_sum << shift) / black_count)
    } else {
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::huffman::canon_trees;
    use std::io::Cursor;

    /// First differential token 0x04 followed by a 4-bit positive raw
    /// value 0b1010 decodes to first sample 512 + 10 = 522 (leaf
    /// 0x04 -> skip 0, len 4; sign bit 1 means positive, magnitude bits
    /// 010 -> 0b1010 as a whole raw value of (sign=1, mag=010) = 2,
    /// plus 1<<(4-1)=8, total 10).
    #[test]
    fn first_sample_of_block_decodes_to_522() {
        let (first, second) = canon_trees(0).unwrap();

        struct BitWriter {
            bytes: Vec<u8>,
            cur: u8,
            n: u32,
        }
        impl BitWriter {
            fn new() -> Self {
                BitWriter {
                    bytes: Vec::new(),
                    cur: 0,
                    n: 0,
                }
            }
            fn push(&mut self, bit: u32) {
                self.cur = (self.cur << 1) | (bit as u8 & 1);
                self.n += 1;
                if self.n == 8 {
                    self.bytes.push(self.cur);
                    self.cur = 0;
                    self.n = 0;
                }
            }
            fn push_bits(&mut self, value: u32, nbits: u32) {
                for i in (0..nbits).rev() {
                    self.push((value >> i) & 1);
                }
            }
            fn finish(mut self) -> Vec<u8> {
                while self.n != 0 {
                    self.push(0);
                }
                self.bytes
            }
        }

        // Canon's first_tree[0] has bit-length histogram [0,1,4,2,3,1,2,...],
        // so the one 2-bit code is its sole length-2 slot: leaf 0x04 ->
        // canonical code "00".
        let mut w = BitWriter::new();
        w.push_bits(0b00, 2); // leaf 0x04 on the first tree
        w.push_bits(1, 1); // sign = positive
        w.push_bits(0b010, 3); // magnitude bits (len-1 = 3 bits)
        let bytes = w.finish();
        let mut br = BitReader::new(Cursor::new(bytes), false);

        let mut decoder = BlockDecoder::new(1000000);
        let mut out = [0i32; 64];
        decoder.decode_block(&mut br, &first, &second, &mut out).unwrap();
        assert_eq!(out[0], 522);
    }
}
