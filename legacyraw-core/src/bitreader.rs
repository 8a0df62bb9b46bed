use std::io::Read;

use crate::error::{DecodeError, Result};

/// Sequential MSB-first bit extraction over a byte source.
///
/// After any `take(n)` with `n <= 25` the reader has refilled to at
/// least 25 valid bits, so a caller never needs to special-case a
/// mid-call refill. `stuffed` mirrors the Canon byte-stuffing
/// convention: every literal `0xFF` read from the source is followed
/// by discarding one more byte before continuing.
pub struct BitReader<R: Read> {
    src: R,
    accum: u32,
    valid: u32,
    stuffed: bool,
    eof: bool,
}

impl<R: Read> BitReader<R> {
    pub fn new(src: R, stuffed: bool) -> Self {
        BitReader {
            src,
            accum: 0,
            valid: 0,
            stuffed,
            eof: false,
        }
    }

    pub fn reset(&mut self) {
        self.accum = 0;
        self.valid = 0;
        self.eof = false;
    }

    fn next_byte(&mut self) -> u8 {
        if self.eof {
            return 0;
        }
        let mut buf = [0u8; 1];
        match self.src.read_exact(&mut buf) {
            Ok(()) => {}
            Err(_) => {
                self.eof = true;
                return 0;
            }
        }
        let byte = buf[0];
        if self.stuffed && byte == 0xFF {
            let mut stuff = [0u8; 1];
            let _ = self.src.read_exact(&mut stuff);
        }
        byte
    }

    fn refill(&mut self) {
        while self.valid < 25 {
            let byte = self.next_byte();
            self.accum = (self.accum << 8) | byte as u32;
            self.valid += 8;
        }
    }

    /// Consume `n` bits (`0 <= n <= 25`) and return them right-justified.
    pub fn take(&mut self, n: u32) -> Result<u32> {
        if n == 0 {
            return Ok(0);
        }
        if n > 25 {
            return Err(DecodeError::MalformedCodec(format!(
                "bit take of {n} exceeds 25-bit limit"
            )));
        }
        if self.valid < n {
            self.refill();
        }
        let shift = self.valid - n;
        let value = (self.accum >> shift) & ((1u32 << n) - 1);
        self.valid -= n;
        self.refill();
        Ok(value)
    }

    /// Consume a single bit.
    pub fn take_bit(&mut self) -> Result<u32> {
        self.take(1)
    }

    /// Discard `k` whole bytes from the underlying source, resetting
    /// the accumulator first.
    pub fn skip_bytes(&mut self, k: usize) -> Result<()> {
        self.reset();
        let mut buf = vec![0u8; k];
        self.src
            .read_exact(&mut buf)
            .map_err(|_| DecodeError::Truncated {
                offset: 0,
                expected: k,
            })
    }

    pub fn at_eof(&self) -> bool {
        self.eof
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn take_additivity() {
        let data = vec![0b1010_1100, 0b1111_0000, 0b0011_0011, 0xAA, 0x55, 0x00];
        let mut a = BitReader::new(Cursor::new(data.clone()), false);
        let mut b = BitReader::new(Cursor::new(data), false);

        let combined = a.take(11).unwrap();
        let split_hi = b.take(4).unwrap();
        let split_lo = b.take(7).unwrap();
        let split = (split_hi << 7) | split_lo;
        assert_eq!(combined, split);
    }

    #[test]
    fn reads_msb_first() {
        let mut r = BitReader::new(Cursor::new(vec![0b1000_0000]), false);
        assert_eq!(r.take(1).unwrap(), 1);
        assert_eq!(r.take(1).unwrap(), 0);
    }

    #[test]
    fn byte_stuffing_discards_zero_after_ff() {
        let mut r = BitReader::new(Cursor::new(vec![0xFF, 0x00, 0xAB]), true);
        let first = r.take(8).unwrap();
        assert_eq!(first, 0xFF);
        let second = r.take(8).unwrap();
        assert_eq!(second, 0xAB);
    }
}
