//! Modified UTF-8 encoding and decoding for constant pool text entries.
//!
//! Constant pool `Utf8` entries use the JVM's modified UTF-8: standard UTF-8
//! with two deviations - the NUL character is encoded as the two-byte sequence
//! `0xC0 0x80` so that encoded strings never contain a zero byte, and
//! characters outside the basic multilingual plane are encoded as CESU-8
//! style surrogate pairs (two three-byte sequences) rather than a single
//! four-byte sequence.
//!
//! For the ASCII-only names this library typically rewrites, modified UTF-8
//! and plain UTF-8 coincide, but both deviations are handled so that patched
//! classes survive arbitrary text constants.

use crate::Result;

/// Decode a modified UTF-8 byte sequence into a string.
///
/// # Arguments
/// * `bytes` - The raw payload of a `Utf8` pool entry (without length prefix)
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for byte sequences that are not valid
/// modified UTF-8, including zero bytes, truncated multi-byte sequences and
/// unpaired surrogates.
pub fn decode(bytes: &[u8]) -> Result<String> {
    let mut out = String::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match b {
            0x00 => return Err(malformed_error!("Zero byte in modified UTF-8 at {}", i)),
            0x01..=0x7F => {
                out.push(b as char);
                i += 1;
            }
            0xC0..=0xDF => {
                let b2 = continuation(bytes, i + 1)?;
                let code = (u32::from(b & 0x1F) << 6) | u32::from(b2 & 0x3F);
                // 0xC0 0x80 is the modified encoding of NUL
                out.push(char_from(code, i)?);
                i += 2;
            }
            0xE0..=0xEF => {
                let b2 = continuation(bytes, i + 1)?;
                let b3 = continuation(bytes, i + 2)?;
                let code = (u32::from(b & 0x0F) << 12)
                    | (u32::from(b2 & 0x3F) << 6)
                    | u32::from(b3 & 0x3F);

                if (0xD800..=0xDBFF).contains(&code) {
                    // High surrogate, must be followed by an encoded low surrogate
                    let low = decode_low_surrogate(bytes, i + 3)?;
                    let combined = 0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00);
                    out.push(char_from(combined, i)?);
                    i += 6;
                } else if (0xDC00..=0xDFFF).contains(&code) {
                    return Err(malformed_error!("Unpaired low surrogate at {}", i));
                } else {
                    out.push(char_from(code, i)?);
                    i += 3;
                }
            }
            _ => return Err(malformed_error!("Invalid modified UTF-8 byte 0x{:02X} at {}", b, i)),
        }
    }

    Ok(out)
}

/// Encode a string as modified UTF-8.
///
/// Never fails: every Rust `char` has a modified UTF-8 representation.
#[must_use]
pub fn encode(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());

    for c in text.chars() {
        let code = c as u32;
        match code {
            0 => out.extend_from_slice(&[0xC0, 0x80]),
            0x01..=0x7F => out.push(code as u8),
            0x80..=0x7FF => {
                out.push(0xC0 | ((code >> 6) as u8));
                out.push(0x80 | ((code & 0x3F) as u8));
            }
            0x800..=0xFFFF => {
                out.push(0xE0 | ((code >> 12) as u8));
                out.push(0x80 | (((code >> 6) & 0x3F) as u8));
                out.push(0x80 | ((code & 0x3F) as u8));
            }
            _ => {
                // Supplementary plane: CESU-8 style surrogate pair
                let offset = code - 0x10000;
                let high = 0xD800 + (offset >> 10);
                let low = 0xDC00 + (offset & 0x3FF);
                for surrogate in [high, low] {
                    out.push(0xE0 | ((surrogate >> 12) as u8));
                    out.push(0x80 | (((surrogate >> 6) & 0x3F) as u8));
                    out.push(0x80 | ((surrogate & 0x3F) as u8));
                }
            }
        }
    }

    out
}

fn continuation(bytes: &[u8], index: usize) -> Result<u8> {
    match bytes.get(index) {
        Some(b) if b & 0xC0 == 0x80 => Ok(*b),
        Some(b) => Err(malformed_error!("Expected continuation byte, found 0x{:02X} at {}", b, index)),
        None => Err(crate::Error::Truncated),
    }
}

fn decode_low_surrogate(bytes: &[u8], index: usize) -> Result<u32> {
    let Some(&b1) = bytes.get(index) else {
        return Err(crate::Error::Truncated);
    };
    if b1 & 0xF0 != 0xE0 {
        return Err(malformed_error!("Unpaired high surrogate at {}", index));
    }

    let b2 = continuation(bytes, index + 1)?;
    let b3 = continuation(bytes, index + 2)?;
    let code = (u32::from(b1 & 0x0F) << 12) | (u32::from(b2 & 0x3F) << 6) | u32::from(b3 & 0x3F);

    if (0xDC00..=0xDFFF).contains(&code) {
        Ok(code)
    } else {
        Err(malformed_error!("Unpaired high surrogate at {}", index))
    }
}

fn char_from(code: u32, index: usize) -> Result<char> {
    char::from_u32(code).ok_or_else(|| malformed_error!("Invalid code point U+{:X} at {}", code, index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_passthrough() {
        let encoded = encode("java/lang/System");
        assert_eq!(encoded, b"java/lang/System");
        assert_eq!(decode(&encoded).unwrap(), "java/lang/System");
    }

    #[test]
    fn nul_uses_two_bytes() {
        let encoded = encode("a\0b");
        assert_eq!(encoded, [b'a', 0xC0, 0x80, b'b']);
        assert_eq!(decode(&encoded).unwrap(), "a\0b");
    }

    #[test]
    fn two_and_three_byte_sequences() {
        let text = "πß\u{20AC}"; // U+03C0, U+00DF, U+20AC
        let encoded = encode(text);
        assert_eq!(decode(&encoded).unwrap(), text);
    }

    #[test]
    fn supplementary_uses_surrogate_pair() {
        let text = "\u{1F600}";
        let encoded = encode(text);
        assert_eq!(encoded.len(), 6);
        assert_eq!(decode(&encoded).unwrap(), text);
    }

    #[test]
    fn zero_byte_rejected() {
        assert!(decode(&[b'a', 0x00]).is_err());
    }

    #[test]
    fn truncated_sequence_rejected() {
        assert!(matches!(decode(&[0xE0, 0x80]), Err(crate::Error::Truncated)));
    }

    #[test]
    fn unpaired_surrogate_rejected() {
        // Lone high surrogate U+D800 with no low surrogate after it
        assert!(decode(&[0xED, 0xA0, 0x80, b'x']).is_err());
    }
}
