//! Marker emoji for multiple-choice prompts.

use crate::platform::Marker;

const KEYCAPS: [&str; 10] = [
    "1\u{fe0f}\u{20e3}",
    "2\u{fe0f}\u{20e3}",
    "3\u{fe0f}\u{20e3}",
    "4\u{fe0f}\u{20e3}",
    "5\u{fe0f}\u{20e3}",
    "6\u{fe0f}\u{20e3}",
    "7\u{fe0f}\u{20e3}",
    "8\u{fe0f}\u{20e3}",
    "9\u{fe0f}\u{20e3}",
    "\u{1f51f}",
];

const LETTERS: [&str; 10] = [
    "\u{1f1e6}", "\u{1f1e7}", "\u{1f1e8}", "\u{1f1e9}", "\u{1f1ea}", "\u{1f1eb}", "\u{1f1ec}",
    "\u{1f1ed}", "\u{1f1ee}", "\u{1f1ef}",
];

/// The largest candidate set a single prompt can offer.
pub const MAX_CHOICES: usize = KEYCAPS.len() + LETTERS.len();

/// Returns `n` distinct choice markers (keycap digits, then letter flags),
/// capped at [`MAX_CHOICES`].
pub fn choice_markers(n: usize) -> Vec<Marker> {
    KEYCAPS
        .iter()
        .chain(LETTERS.iter())
        .take(n.min(MAX_CHOICES))
        .map(|&s| Marker::from(s))
        .collect()
}
