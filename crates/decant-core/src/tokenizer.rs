//! Tokenizer seam between text and token ids.

/// Converts text to token ids and back.
///
/// The generation loop itself is tokenizer-agnostic: it consumes and
/// produces ids only. Implementations adapt whatever vocabulary the
/// model was exported with.
pub trait Tokenizer {
    /// Encode text into token ids.
    fn encode(&self, text: &str) -> Vec<i64>;

    /// Decode token ids back into text. Ids outside the vocabulary are
    /// skipped.
    fn decode(&self, ids: &[i64]) -> String;
}

/// Byte-level tokenizer: one token per UTF-8 byte, plus a fixed id
/// offset.
///
/// Handy for exercising the generation loop without a trained
/// vocabulary; real deployments pair the generator with the tokenizer
/// their model was trained with.
#[derive(Debug, Clone, Default)]
pub struct ByteTokenizer {
    offset: i64,
}

impl ByteTokenizer {
    /// Tokenizer mapping byte values directly to ids.
    pub fn new() -> Self {
        Self { offset: 0 }
    }

    /// Tokenizer mapping byte `b` to id `b + offset`, leaving room for
    /// special tokens below the offset.
    pub fn with_offset(offset: i64) -> Self {
        Self { offset }
    }
}

impl Tokenizer for ByteTokenizer {
    fn encode(&self, text: &str) -> Vec<i64> {
        text.bytes().map(|b| i64::from(b) + self.offset).collect()
    }

    fn decode(&self, ids: &[i64]) -> String {
        // The subtraction itself can overflow for ids near the i64
        // bounds; such ids are out of vocabulary like any other.
        let bytes: Vec<u8> = ids
            .iter()
            .filter_map(|&id| {
                id.checked_sub(self.offset)
                    .and_then(|v| u8::try_from(v).ok())
            })
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_roundtrip_ascii() {
        let tokenizer = ByteTokenizer::new();
        let ids = tokenizer.encode("hello");
        assert_eq!(ids, vec![104, 101, 108, 108, 111]);
        assert_eq!(tokenizer.decode(&ids), "hello");
    }

    #[test]
    fn test_roundtrip_multibyte() {
        let tokenizer = ByteTokenizer::new();
        let text = "żółć";
        assert_eq!(tokenizer.decode(&tokenizer.encode(text)), text);
    }

    #[test]
    fn test_offset_shifts_ids() {
        let tokenizer = ByteTokenizer::with_offset(3);
        let ids = tokenizer.encode("a");
        assert_eq!(ids, vec![100]);
        assert_eq!(tokenizer.decode(&ids), "a");
    }

    #[test]
    fn test_decode_skips_out_of_range_ids() {
        let tokenizer = ByteTokenizer::with_offset(3);
        // 0 is below the offset, 999 is above the byte range.
        assert_eq!(tokenizer.decode(&[0, 100, 999]), "a");
    }

    #[test]
    fn test_decode_skips_extreme_ids() {
        // Offset correction of ids at the i64 bounds must skip them,
        // not overflow.
        let positive = ByteTokenizer::with_offset(3);
        assert_eq!(positive.decode(&[i64::MIN, 100, i64::MAX]), "a");

        let negative = ByteTokenizer::with_offset(-3);
        assert_eq!(negative.decode(&[i64::MAX, 94]), "a");
    }
}
