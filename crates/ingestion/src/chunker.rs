//! Text chunking
//!
//! Splits raw section text into overlapping, bounded-length segments with a
//! deterministic boundary policy: paragraph break, line break, sentence end,
//! word boundary, then raw character as the last resort. The coarsest
//! boundary that keeps a piece within the size bound wins.
//!
//! All positions are computed in `char` space, so a chunk (and the overlap
//! window sliced from its tail) can never start inside a multi-byte scalar.

/// Split `text` into chunks of at most `max_size` characters, adjacent
/// chunks sharing the last `overlap` characters of the preceding chunk.
///
/// Pure function of its input: the same text always produces the same
/// chunks. Empty or whitespace-only input yields no chunks; input at or
/// under `max_size` yields a single chunk.
///
/// # Panics
///
/// Panics if `max_size` is zero or `overlap >= max_size`; both are
/// programmer errors, not recoverable conditions.
pub fn chunk(text: &str, max_size: usize, overlap: usize) -> Vec<String> {
    assert!(max_size > 0, "max_size must be positive");
    assert!(overlap < max_size, "overlap must be smaller than max_size");

    if text.trim().is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    if len <= max_size {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut pos = 0;
    while pos < len {
        let window_end = (pos + max_size).min(len);
        if window_end == len {
            chunks.push(chars[pos..len].iter().collect());
            break;
        }

        let brk = find_break(&chars, pos, window_end, overlap);
        chunks.push(chars[pos..brk].iter().collect());
        // The chosen break always leaves the chunk longer than `overlap`,
        // so the next start strictly advances.
        pos = brk - overlap;
    }

    chunks
}

/// Pick the break position (exclusive char index) for the chunk starting at
/// `pos`, trying the coarsest boundary first. A boundary is only accepted
/// when it leaves the chunk strictly longer than `overlap`; otherwise the
/// next finer level is tried, bottoming out in a hard cut at `window_end`.
fn find_break(chars: &[char], pos: usize, window_end: usize, overlap: usize) -> usize {
    let min_break = pos + overlap + 1;

    let levels: [fn(&[char], usize) -> bool; 4] = [
        is_paragraph_break,
        is_line_break,
        is_sentence_break,
        is_word_break,
    ];

    for boundary in levels {
        let mut b = window_end;
        while b >= min_break {
            if boundary(chars, b) {
                return b;
            }
            b -= 1;
        }
    }

    window_end
}

/// Break position `b` sits just past a blank line
fn is_paragraph_break(chars: &[char], b: usize) -> bool {
    b >= 2 && chars[b - 1] == '\n' && chars[b - 2] == '\n'
}

/// Break position `b` sits just past a newline
fn is_line_break(chars: &[char], b: usize) -> bool {
    b >= 1 && chars[b - 1] == '\n'
}

/// Break position `b` sits just past sentence-ending punctuation and its
/// trailing whitespace
fn is_sentence_break(chars: &[char], b: usize) -> bool {
    b >= 2 && chars[b - 1].is_whitespace() && matches!(chars[b - 2], '.' | '!' | '?')
}

/// Break position `b` sits just past any whitespace
fn is_word_break(chars: &[char], b: usize) -> bool {
    b >= 1 && chars[b - 1].is_whitespace()
}
