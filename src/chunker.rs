//! Reference document chunking
//!
//! Splits the grounding document into overlapping fragments for the
//! offline index build. Chunk boundaries snap to whitespace so retrieval
//! never surfaces half a word.

/// Minimum fragment length worth indexing. Anything shorter is heading
/// debris or blank-line residue.
const MIN_CHUNK_CHARS: usize = 10;

/// Split `text` into chunks of roughly `chunk_size` characters with
/// `overlap` characters carried between consecutive chunks.
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    assert!(chunk_size > 0, "chunk_size must be positive");
    assert!(overlap < chunk_size, "overlap must be smaller than chunk_size");

    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let mut end = (start + chunk_size).min(chars.len());

        // Snap the cut to the last whitespace inside the window.
        if end < chars.len() {
            if let Some(ws) = chars[start..end].iter().rposition(|c| c.is_whitespace()) {
                if ws > 0 {
                    end = start + ws;
                }
            }
        }

        let chunk: String = chars[start..end].iter().collect();
        let trimmed = chunk.trim();
        if trimmed.len() >= MIN_CHUNK_CHARS {
            chunks.push(trimmed.to_string());
        }

        if end >= chars.len() {
            break;
        }

        // Step back by the overlap, then snap forward to the next word
        // boundary so chunks never begin mid-word.
        let mut next = end.saturating_sub(overlap);
        while next > 0 && next < chars.len() && !chars[next - 1].is_whitespace() {
            next += 1;
        }
        start = next.max(start + 1);
    }

    chunks
}
