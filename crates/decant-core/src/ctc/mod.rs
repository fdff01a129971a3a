//! Greedy CTC decoding of per-timestep label scores.
//!
//! A CTC labeling model scores every time step against `L` labels:
//! label 0 is the blank, labels `1..L` map to charlist symbols. Greedy
//! decoding takes the best label per step, collapses consecutive
//! repeats, and only then drops the blanks, so a blank between two
//! equal labels still separates two real occurrences.

mod charlist;

use ndarray::{ArrayD, ArrayView2, Axis, Ix2};
use serde::Serialize;
use tracing::trace;

use crate::error::DecodeError;

pub use charlist::Charlist;

/// Label index reserved for the CTC blank.
pub const BLANK_LABEL: usize = 0;

/// Result of decoding one score matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decoded {
    /// Decoded text, in time order.
    pub text: String,
    /// Time step that emitted each character of `text`.
    pub frames: Vec<usize>,
}

/// Greedy CTC decoder over a fixed charlist.
pub struct CtcDecoder {
    charlist: Charlist,
}

impl CtcDecoder {
    /// Create a decoder for the given charlist.
    pub fn new(charlist: Charlist) -> Self {
        Self { charlist }
    }

    /// The charlist this decoder maps labels through.
    pub fn charlist(&self) -> &Charlist {
        &self.charlist
    }

    /// Decode a `[timesteps, labels]` score matrix.
    ///
    /// Scores may be raw logits or probabilities; only their per-row
    /// ordering matters. Ties go to the lowest label index, so a tie
    /// with the blank stays blank.
    pub fn decode(&self, scores: ArrayView2<'_, f32>) -> Result<Decoded, DecodeError> {
        let labels = scores.ncols();
        if labels == 0 {
            return Err(DecodeError::EmptyLabelAxis);
        }
        if labels > self.charlist.label_count() {
            return Err(DecodeError::CharlistTooShort {
                symbols: self.charlist.len(),
                labels,
            });
        }

        let mut text = String::new();
        let mut frames = Vec::new();
        // Sentinel that no argmax can produce, so the first frame never
        // counts as a repeat.
        let mut prev = usize::MAX;

        for (t, row) in scores.outer_iter().enumerate() {
            let mut best = 0usize;
            let mut best_score = f32::NEG_INFINITY;
            for (label, &score) in row.iter().enumerate() {
                if score > best_score {
                    best_score = score;
                    best = label;
                }
            }

            // Collapse runs before dropping blanks: prev tracks the raw
            // argmax of the previous step, blanks included.
            if best != prev && best != BLANK_LABEL {
                if let Some(symbol) = self.charlist.symbol(best) {
                    text.push(symbol);
                    frames.push(t);
                }
            }
            prev = best;
        }

        trace!("Decoded {} characters from {} timesteps", text.chars().count(), scores.nrows());
        Ok(Decoded { text, frames })
    }

    /// Decode a dynamic-rank score tensor.
    ///
    /// Accepts `[timesteps, labels]` directly, or `[1, timesteps,
    /// labels]` as produced by batch-of-one model outputs.
    pub fn decode_dyn(&self, scores: &ArrayD<f32>) -> Result<Decoded, DecodeError> {
        let shape = scores.shape();
        let view = match shape {
            [1, _, _] => scores.view().index_axis_move(Axis(0), 0),
            [_, _] => scores.view(),
            other => return Err(DecodeError::MatrixRank(other.to_vec())),
        };
        let matrix = view
            .into_dimensionality::<Ix2>()
            .map_err(|_| DecodeError::MatrixRank(shape.to_vec()))?;
        self.decode(matrix)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array2, Array3};
    use pretty_assertions::assert_eq;

    use super::*;

    fn abc_decoder() -> CtcDecoder {
        CtcDecoder::new(Charlist::from_symbols(vec!['A', 'B', 'C']).unwrap())
    }

    /// One-hot score rows for a sequence of winning labels.
    fn one_hot(labels: &[usize], width: usize) -> Array2<f32> {
        let mut scores = Array2::zeros((labels.len(), width));
        for (t, &label) in labels.iter().enumerate() {
            scores[[t, label]] = 1.0;
        }
        scores
    }

    #[test]
    fn test_collapse_then_strip_blanks() {
        // argmax sequence 0 0 2 2 3 0 3 collapses to 0 2 3 0 3, then
        // drops blanks: B C C.
        let decoder = abc_decoder();
        let decoded = decoder.decode(one_hot(&[0, 0, 2, 2, 3, 0, 3], 4).view()).unwrap();
        assert_eq!(decoded.text, "BCC");
        assert_eq!(decoded.frames, vec![2, 4, 6]);
    }

    #[test]
    fn test_blank_separates_repeats() {
        let decoder = abc_decoder();
        let decoded = decoder.decode(one_hot(&[1, 0, 1], 4).view()).unwrap();
        assert_eq!(decoded.text, "AA");
        assert_eq!(decoded.frames, vec![0, 2]);
    }

    #[test]
    fn test_consecutive_repeats_collapse() {
        let decoder = abc_decoder();
        let decoded = decoder.decode(one_hot(&[1, 1, 1, 2], 4).view()).unwrap();
        assert_eq!(decoded.text, "AB");
    }

    #[test]
    fn test_all_blank_decodes_to_empty() {
        let decoder = abc_decoder();
        let decoded = decoder.decode(one_hot(&[0, 0, 0], 4).view()).unwrap();
        assert_eq!(decoded.text, "");
        assert!(decoded.frames.is_empty());
    }

    #[test]
    fn test_empty_matrix_decodes_to_empty() {
        let decoder = abc_decoder();
        let decoded = decoder.decode(Array2::zeros((0, 4)).view()).unwrap();
        assert_eq!(decoded.text, "");
    }

    #[test]
    fn test_ties_go_to_lowest_label() {
        let decoder = abc_decoder();
        // Tie between labels 1 and 2: label 1 ('A') wins.
        let scores = Array2::from_shape_vec((1, 4), vec![0.1, 0.7, 0.7, 0.2]).unwrap();
        assert_eq!(decoder.decode(scores.view()).unwrap().text, "A");

        // Tie between the blank and label 1: the blank wins, nothing is
        // emitted.
        let scores = Array2::from_shape_vec((1, 4), vec![0.7, 0.7, 0.1, 0.2]).unwrap();
        assert_eq!(decoder.decode(scores.view()).unwrap().text, "");
    }

    #[test]
    fn test_decode_is_idempotent() {
        let decoder = abc_decoder();
        let first = decoder.decode(one_hot(&[0, 2, 2, 0, 1, 1, 3], 4).view()).unwrap();

        // Re-encode the decoded text as one-hot frames and decode again.
        let labels: Vec<usize> = first
            .text
            .chars()
            .map(|c| decoder.charlist().symbols().iter().position(|&s| s == c).unwrap() + 1)
            .collect();
        let second = decoder.decode(one_hot(&labels, 4).view()).unwrap();
        assert_eq!(second.text, first.text);
    }

    #[test]
    fn test_charlist_may_exceed_label_axis() {
        // A charlist longer than the label axis is fine; only the
        // covered prefix is reachable.
        let decoder = CtcDecoder::new(
            Charlist::from_symbols(vec!['A', 'B', 'C', 'D', 'E']).unwrap(),
        );
        let decoded = decoder.decode(one_hot(&[1, 2], 3).view()).unwrap();
        assert_eq!(decoded.text, "AB");
    }

    #[test]
    fn test_charlist_too_short_is_rejected() {
        let decoder = abc_decoder();
        let err = decoder.decode(Array2::zeros((2, 6)).view()).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::CharlistTooShort { symbols: 3, labels: 6 }
        ));
    }

    #[test]
    fn test_empty_label_axis_is_rejected() {
        let decoder = abc_decoder();
        let err = decoder.decode(Array2::zeros((3, 0)).view()).unwrap_err();
        assert!(matches!(err, DecodeError::EmptyLabelAxis));
    }

    #[test]
    fn test_decode_dyn_squeezes_unit_batch() {
        let decoder = abc_decoder();
        let mut scores = Array3::<f32>::zeros((1, 3, 4));
        scores[[0, 0, 2]] = 1.0;
        scores[[0, 1, 0]] = 1.0;
        scores[[0, 2, 3]] = 1.0;
        let decoded = decoder.decode_dyn(&scores.into_dyn()).unwrap();
        assert_eq!(decoded.text, "BC");
    }

    #[test]
    fn test_decode_dyn_rejects_other_shapes() {
        let decoder = abc_decoder();
        let err = decoder
            .decode_dyn(&Array3::<f32>::zeros((2, 3, 4)).into_dyn())
            .unwrap_err();
        assert!(matches!(err, DecodeError::MatrixRank(shape) if shape == vec![2, 3, 4]));

        let err = decoder
            .decode_dyn(&ndarray::Array1::<f32>::zeros(4).into_dyn())
            .unwrap_err();
        assert!(matches!(err, DecodeError::MatrixRank(_)));
    }
}
