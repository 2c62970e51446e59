//! Overlapping fixed-size windows over page text.

/// Share of the window, counted from its end, searched for a sentence break.
const SNAP_FRACTION: usize = 5;

/// Split `text` into windows of about `target` characters, where each window
/// starts `overlap` characters before the previous one ended.
///
/// A window end is pulled back to the last `". "`, `"! "`, `"? "` or newline
/// in its final fifth, so chunks tend to end on a sentence. Dropping the
/// first `overlap` characters of every chunk after the first and
/// concatenating yields `text` again.
///
/// Lengths are counted in characters, not bytes.
pub fn chunk_with_overlap(text: &str, target: usize, overlap: usize) -> Vec<String> {
    let target = target.max(1);
    let overlap = overlap.min(target - 1);

    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= target {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = start + target;
        if end >= chars.len() {
            chunks.push(chars[start..].iter().collect());
            break;
        }

        let cut = match sentence_break(&chars, end - target / SNAP_FRACTION, end) {
            Some(pos) if pos + 1 > start + overlap => pos + 1,
            _ => end,
        };
        chunks.push(chars[start..cut].iter().collect());

        let next = cut - overlap;
        assert!(next > start, "chunk window must advance");
        start = next;
    }
    chunks
}

/// Index of the last break character in `from..to` (exclusive of `from`).
fn sentence_break(chars: &[char], from: usize, to: usize) -> Option<usize> {
    (from + 1..to).rev().find(|&i| match chars[i] {
        '\n' => true,
        '.' | '!' | '?' => chars.get(i + 1) == Some(&' '),
        _ => false,
    })
}
