//! Legacy single-byte character set.
//!
//! The protocol stores text as one byte per character: printable ASCII and
//! `0xA0..=0xFF` map straight to the matching Unicode code points, while the
//! `0x80..=0x9F` range carries a fixed table of typographic characters.
//! Characters the set cannot represent become `?`.

/// The byte emitted for characters outside the legacy character set.
pub(crate) const REPLACEMENT: u8 = b'?';

/// Code points assigned to bytes `0x80..=0x9F`. `'\0'` marks the slots the
/// protocol never defined; they decode as `?` and are unreachable on encode.
pub(crate) const SUBSTITUTIONS: [char; 32] = [
    '\u{20ac}', // 0x80 €
    '\0',       // 0x81
    '\u{201a}', // 0x82 ‚
    '\u{0192}', // 0x83 ƒ
    '\u{201e}', // 0x84 „
    '\u{2026}', // 0x85 …
    '\u{2020}', // 0x86 †
    '\u{2021}', // 0x87 ‡
    '\u{02c6}', // 0x88 ˆ
    '\u{2030}', // 0x89 ‰
    '\u{0160}', // 0x8A Š
    '\u{2039}', // 0x8B ‹
    '\u{0152}', // 0x8C Œ
    '\0',       // 0x8D
    '\u{017d}', // 0x8E Ž
    '\0',       // 0x8F
    '\0',       // 0x90
    '\u{2018}', // 0x91 '
    '\u{2019}', // 0x92 '
    '\u{201c}', // 0x93 "
    '\u{201d}', // 0x94 "
    '\u{2022}', // 0x95 •
    '\u{2013}', // 0x96 –
    '\u{2014}', // 0x97 —
    '\u{02dc}', // 0x98 ˜
    '\u{2122}', // 0x99 ™
    '\u{0161}', // 0x9A š
    '\u{203a}', // 0x9B ›
    '\u{0153}', // 0x9C œ
    '\0',       // 0x9D
    '\u{017e}', // 0x9E ž
    '\u{0178}', // 0x9F Ÿ
];

/// Encode one character to its single-byte form.
pub(crate) fn encode_char(c: char) -> u8 {
    let code = c as u32;
    if (1..128).contains(&code) || (160..=255).contains(&code) {
        return code as u8;
    }
    for (i, &mapped) in SUBSTITUTIONS.iter().enumerate() {
        if mapped != '\0' && mapped == c {
            return 0x80 + i as u8;
        }
    }
    REPLACEMENT
}

/// Decode one non-zero byte to its character.
pub(crate) fn decode_byte(value: u8) -> char {
    if (0x80..=0x9F).contains(&value) {
        let c = SUBSTITUTIONS[(value - 0x80) as usize];
        if c == '\0' {
            return REPLACEMENT as char;
        }
        return c;
    }
    // Remaining bytes are Latin-1: the byte value is the code point.
    value as char
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_passes_through() {
        assert_eq!(encode_char('A'), b'A');
        assert_eq!(decode_byte(b'A'), 'A');
    }

    #[test]
    fn high_latin1_passes_through() {
        assert_eq!(encode_char('\u{00e9}'), 0xE9);
        assert_eq!(decode_byte(0xE9), '\u{00e9}');
        assert_eq!(encode_char('\u{00a0}'), 0xA0);
        assert_eq!(decode_byte(0xFF), '\u{00ff}');
    }

    #[test]
    fn defined_substitutions_round_trip() {
        for (i, &c) in SUBSTITUTIONS.iter().enumerate() {
            if c == '\0' {
                continue;
            }
            let byte = 0x80 + i as u8;
            assert_eq!(encode_char(c), byte);
            assert_eq!(decode_byte(byte), c);
        }
    }

    #[test]
    fn undefined_slots_decode_as_question_mark() {
        for byte in [0x81u8, 0x8D, 0x8F, 0x90, 0x9D] {
            assert_eq!(decode_byte(byte), '?');
        }
    }

    #[test]
    fn unmappable_characters_encode_as_question_mark() {
        assert_eq!(encode_char('\u{4e2d}'), REPLACEMENT);
        assert_eq!(encode_char('\0'), REPLACEMENT);
    }
}
