//! Recursive character text splitter.
//!
//! Splits on the coarsest separator that keeps pieces under the chunk
//! size, descending from paragraph breaks to single spaces, then merges
//! adjacent pieces back up to the limit with a fixed overlap.

/// Separators tried in order, coarsest first
const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

/// Split `text` into chunks of at most `chunk_size` characters with
/// `overlap` characters carried over between consecutive chunks.
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    if text.chars().count() <= chunk_size {
        return vec![text.to_string()];
    }

    let pieces = split_recursive(text, chunk_size, 0);
    merge_pieces(&pieces, chunk_size, overlap)
}

fn split_recursive(text: &str, chunk_size: usize, level: usize) -> Vec<String> {
    if text.chars().count() <= chunk_size {
        return vec![text.to_string()];
    }

    if level >= SEPARATORS.len() {
        // No separator left: hard-cut on char boundaries
        let chars: Vec<char> = text.chars().collect();
        return chars
            .chunks(chunk_size)
            .map(|c| c.iter().collect())
            .collect();
    }

    let sep = SEPARATORS[level];
    let mut out = Vec::new();
    for part in text.split(sep) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if part.chars().count() <= chunk_size {
            out.push(part.to_string());
        } else {
            out.extend(split_recursive(part, chunk_size, level + 1));
        }
    }
    out
}

/// Greedily re-merge small pieces and apply the overlap window
fn merge_pieces(pieces: &[String], chunk_size: usize, overlap: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for piece in pieces {
        let candidate_len = if current.is_empty() {
            piece.chars().count()
        } else {
            current.chars().count() + 1 + piece.chars().count()
        };

        if candidate_len > chunk_size && !current.is_empty() {
            chunks.push(current.clone());

            // Seed the next chunk with the tail of this one
            let tail: String = current
                .chars()
                .rev()
                .take(overlap)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            current = tail;
        }

        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(piece);
    }

    if !current.trim().is_empty() {
        chunks.push(current);
    }

    chunks
}
