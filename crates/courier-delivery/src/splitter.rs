// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message splitting for transports with a maximum message length.
//!
//! Bodies are split on line boundaries where possible, greedily packing
//! lines into chunks. A single line longer than the limit is hard-split
//! into fixed-size pieces with headroom reserved for transport framing.
//!
//! The split is lossless: chunks produced by line packing reconstruct the
//! body exactly when rejoined with `\n`; pieces of one hard-split line
//! reconstruct that line by direct concatenation.

/// Headroom subtracted from the maximum length when hard-splitting a single
/// oversized line, leaving room for transport framing.
pub const HARD_SPLIT_RESERVE: usize = 50;

/// Split `body` into chunks of at most `max_length` bytes.
///
/// Bodies that already fit are returned unchanged as a single chunk.
pub fn split_message(body: &str, max_length: usize) -> Vec<String> {
    if body.len() <= max_length {
        return vec![body.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_started = false;

    for line in body.split('\n') {
        if line.len() > max_length {
            if current_started {
                chunks.push(std::mem::take(&mut current));
                current_started = false;
            }
            hard_split_into(line, max_length, &mut chunks);
            continue;
        }

        // +1 for the newline that joins this line to the current chunk.
        if current_started && current.len() + 1 + line.len() > max_length {
            chunks.push(std::mem::take(&mut current));
            current_started = false;
        }

        if current_started {
            current.push('\n');
        }
        current.push_str(line);
        current_started = true;
    }

    if current_started {
        chunks.push(current);
    }

    chunks
}

/// Hard-split one oversized line into pieces of `max_length - reserve`,
/// respecting char boundaries.
fn hard_split_into(line: &str, max_length: usize, chunks: &mut Vec<String>) {
    let target = max_length.saturating_sub(HARD_SPLIT_RESERVE).max(1);
    let mut rest = line;

    while !rest.is_empty() {
        if rest.len() <= target {
            chunks.push(rest.to_string());
            break;
        }

        let mut end = target;
        while !rest.is_char_boundary(end) {
            end -= 1;
        }
        if end == 0 {
            // target fell inside the first char; take it whole.
            end = rest.chars().next().map_or(rest.len(), char::len_utf8);
        }

        chunks.push(rest[..end].to_string());
        rest = &rest[end..];
    }
}
