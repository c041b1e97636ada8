//! Bit field extraction from navigation message buffers (MSB first)
use crate::error::Error;

/// Number of bits in one GPS LNAV subframe, parity included
pub(crate) const SUBFRAME_BITS: usize = 300;

/// Number of bytes in one subframe, once packed
pub(crate) const SUBFRAME_BYTES: usize = (SUBFRAME_BITS + 7) / 8;

/// Number of 30 bit words in one subframe
const WORDS_PER_SUBFRAME: usize = 10;

/// Extracts `len` (<= 32) bits starting at bit `pos`, as unsigned
pub(crate) fn getbitu(buf: &[u8], pos: usize, len: usize) -> u32 {
    (pos..pos + len).fold(0_u32, |bits, i| {
        (bits << 1) | ((buf[i / 8] >> (7 - i % 8)) & 1) as u32
    })
}

/// Extracts `len` (<= 32) bits starting at bit `pos`, as two's complement
pub(crate) fn getbits(buf: &[u8], pos: usize, len: usize) -> i32 {
    let bits = getbitu(buf, pos, len);
    if len == 0 || len >= 32 || bits & (1 << (len - 1)) == 0 {
        bits as i32
    } else {
        (bits | (!0_u32 << len)) as i32
    }
}

/// Concatenates two unsigned fields
pub(crate) fn getbitu2(buf: &[u8], p1: usize, l1: usize, p2: usize, l2: usize) -> u32 {
    (getbitu(buf, p1, l1) << l2) | getbitu(buf, p2, l2)
}

/// Concatenates two fields, the result being two's complement
pub(crate) fn getbits2(buf: &[u8], p1: usize, l1: usize, p2: usize, l2: usize) -> i32 {
    if getbitu(buf, p1, 1) == 1 {
        ((getbits(buf, p1, l1) as i64) << l2 | getbitu(buf, p2, l2) as i64) as i32
    } else {
        getbitu2(buf, p1, l1, p2, l2) as i32
    }
}

/// Repacks a subframe delivered as 10 big endian 32 bit words,
/// each holding one 30 bit word right aligned, into a contiguous buffer.
pub(crate) fn pack_subframe(data: &[u8]) -> Result<[u8; SUBFRAME_BYTES], Error> {
    if data.len() != 4 * WORDS_PER_SUBFRAME {
        return Err(Error::InvalidFrame("gps l1 c/a subframe must be 40 bytes"));
    }

    let mut packed = [0_u8; SUBFRAME_BYTES];
    let mut pos = 0;

    for word in data.chunks_exact(4) {
        let word = u32::from_be_bytes([word[0], word[1], word[2], word[3]]);
        for bit in (0..30).rev() {
            if (word >> bit) & 1 == 1 {
                packed[pos / 8] |= 1 << (7 - pos % 8);
            }
            pos += 1;
        }
    }

    Ok(packed)
}
