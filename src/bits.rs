//! Text <-> bit conversions used by the border channel.
//!
//! Bits are ordered most-significant first within each byte. Decoding is
//! lossy on purpose: any byte outside printable ASCII is dropped.

/// Lowest and highest printable ASCII code points.
const PRINTABLE_MIN: u8 = 32;
const PRINTABLE_MAX: u8 = 126;

/// Whether a character survives [`binary_to_text`].
#[inline]
pub fn is_printable(c: char) -> bool {
    (PRINTABLE_MIN as char..=PRINTABLE_MAX as char).contains(&c)
}

/// Keep only printable ASCII characters.
pub fn printable(text: &str) -> String {
    text.chars().filter(|&c| is_printable(c)).collect()
}

/// UTF-8 encode `text` and render every byte as eight `'0'`/`'1'` characters.
pub fn text_to_binary(text: &str) -> String {
    let mut out = String::with_capacity(text.len() * 8);
    for byte in text.bytes() {
        for i in (0..8).rev() {
            out.push(if (byte >> i) & 1 == 1 { '1' } else { '0' });
        }
    }
    out
}

/// Inverse of [`text_to_binary`] for printable ASCII.
///
/// The input is right-padded with `'0'` to a whole number of bytes. Any
/// character other than `'1'` counts as a zero bit.
pub fn binary_to_text(bits: &str) -> String {
    let bits: Vec<u8> = bits.chars().map(|c| u8::from(c == '1')).collect();
    bytes_to_printable(&bits_to_bytes(&bits))
}

/// Expand bytes into one `0`/`1` value per bit.
pub fn bytes_to_bits(data: &[u8]) -> Vec<u8> {
    let mut bits = Vec::with_capacity(data.len() * 8);
    for &byte in data {
        for i in (0..8).rev() {
            bits.push((byte >> i) & 1);
        }
    }
    bits
}

/// Pack bit values back into bytes; a trailing partial byte is zero-padded.
pub fn bits_to_bytes(bits: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; bits.len().div_ceil(8)];
    for (i, &bit) in bits.iter().enumerate() {
        out[i / 8] |= (bit & 1) << (7 - (i % 8));
    }
    out
}

/// Map bytes to characters, dropping everything outside printable ASCII.
pub fn bytes_to_printable(bytes: &[u8]) -> String {
    bytes
        .iter()
        .filter(|b| (PRINTABLE_MIN..=PRINTABLE_MAX).contains(b))
        .map(|&b| b as char)
        .collect()
}
