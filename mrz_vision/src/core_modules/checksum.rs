// THEORY:
// The `checksum` module is the arithmetic floor of the classification engine.
// Every check digit printed in a machine-readable zone is produced by the same
// weighted mod-10 rule, so every document checker funnels through here.
//
// Key architectural principles:
// 1.  **Character Mapping**: digits map to themselves, `A`..`Z` map to 10..35 and
//     the filler `<` maps to 0. Anything else has no value, which makes the whole
//     span uncomputable rather than silently zero.
// 2.  **Cyclic Weights**: values are multiplied by 7, 3, 1, 7, 3, 1, ... and the sum
//     is reduced modulo 10. Because every weight is coprime with 10, changing any
//     single character in a span always changes the digit.
// 3.  **Composite Spans**: the final check digit of TD1/TD2/TD3 covers several
//     discontiguous spans. The weight cycle runs continuously across them, so
//     composites are computed over the concatenation.

pub mod checksum {
    /// The filler character used to pad every MRZ field.
    pub const FILLER: u8 = b'<';

    const WEIGHTS: [u32; 3] = [7, 3, 1];

    /// Maps a single MRZ character to its checksum value.
    pub fn char_value(c: u8) -> Option<u32> {
        match c {
            b'0'..=b'9' => Some((c - b'0') as u32),
            b'A'..=b'Z' => Some((c - b'A') as u32 + 10),
            FILLER => Some(0),
            _ => None,
        }
    }

    /// Computes the check digit over one or more spans, weighting cyclically
    /// across span boundaries. Returns `None` if any character has no value.
    pub fn check_digit(spans: &[&[u8]]) -> Option<u8> {
        let mut sum = 0u32;
        let mut position = 0usize;
        for span in spans {
            for &c in *span {
                sum += char_value(c)? * WEIGHTS[position % 3];
                position += 1;
            }
        }
        Some((sum % 10) as u8)
    }

    /// Verifies an embedded check character against the spans it covers.
    ///
    /// A filler in the check position is only accepted when every covered
    /// character is itself a filler, which is how absent optional data is encoded.
    pub fn verify(spans: &[&[u8]], check: u8) -> bool {
        if check == FILLER {
            return spans.iter().all(|s| s.iter().all(|&c| c == FILLER));
        }
        if !check.is_ascii_digit() {
            return false;
        }
        match check_digit(spans) {
            Some(digit) => digit == check - b'0',
            None => false,
        }
    }
}
