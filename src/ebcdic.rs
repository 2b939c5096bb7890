//! EBCDIC (code page 037) to ASCII conversion for textual headers.
//!
//! Only the printable ASCII range and space are mapped; every other byte
//! converts to `?` in either direction.

/// (ASCII, EBCDIC) pairs for the printable range.
const PAIRS: &[(u8, u8)] = &[
    (b' ', 0x40),
    (b'.', 0x4B),
    (b'<', 0x4C),
    (b'(', 0x4D),
    (b'+', 0x4E),
    (b'|', 0x4F),
    (b'&', 0x50),
    (b'!', 0x5A),
    (b'$', 0x5B),
    (b'*', 0x5C),
    (b')', 0x5D),
    (b';', 0x5E),
    (b'-', 0x60),
    (b'/', 0x61),
    (b',', 0x6B),
    (b'%', 0x6C),
    (b'_', 0x6D),
    (b'>', 0x6E),
    (b'?', 0x6F),
    (b'`', 0x79),
    (b':', 0x7A),
    (b'#', 0x7B),
    (b'@', 0x7C),
    (b'\'', 0x7D),
    (b'=', 0x7E),
    (b'"', 0x7F),
    (b'~', 0xA1),
    (b'^', 0xB0),
    (b'[', 0xBA),
    (b']', 0xBB),
    (b'{', 0xC0),
    (b'}', 0xD0),
    (b'\\', 0xE0),
];

/// Contiguous letter and digit runs: (first ASCII, first EBCDIC, length).
const RUNS: &[(u8, u8, u8)] = &[
    (b'a', 0x81, 9),
    (b'j', 0x91, 9),
    (b's', 0xA2, 8),
    (b'A', 0xC1, 9),
    (b'J', 0xD1, 9),
    (b'S', 0xE2, 8),
    (b'0', 0xF0, 10),
];

const fn build(ebcdic_to_ascii: bool) -> [u8; 256] {
    let fill = if ebcdic_to_ascii { b'?' } else { 0x6F };
    let mut table = [fill; 256];
    let mut i = 0;
    while i < PAIRS.len() {
        let (a, e) = PAIRS[i];
        if ebcdic_to_ascii {
            table[e as usize] = a;
        } else {
            table[a as usize] = e;
        }
        i += 1;
    }
    let mut r = 0;
    while r < RUNS.len() {
        let (a, e, len) = RUNS[r];
        let mut k = 0;
        while k < len {
            if ebcdic_to_ascii {
                table[(e + k) as usize] = a + k;
            } else {
                table[(a + k) as usize] = e + k;
            }
            k += 1;
        }
        r += 1;
    }
    table
}

const TO_ASCII: [u8; 256] = build(true);
const TO_EBCDIC: [u8; 256] = build(false);

pub fn to_ascii(byte: u8) -> u8 {
    TO_ASCII[byte as usize]
}

pub fn to_ebcdic(byte: u8) -> u8 {
    TO_EBCDIC[byte as usize]
}

pub fn decode(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().map(|&b| to_ascii(b)).collect()
}

pub fn encode(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().map(|&b| to_ebcdic(b)).collect()
}
