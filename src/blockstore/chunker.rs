//! Appendix chunking
//!
//! Decides where the appendix is cut into segments.

use crate::codec::EOL;

/// Split `buf` into consecutive chunk lengths that cover it exactly.
///
/// Binary content is cut every `block_size` bytes. Line-oriented content
/// is cut after the last line terminator inside the block window; when a
/// single line is longer than the window the cut moves forward to the end
/// of that line, and when no terminator remains at all the rest of the
/// buffer becomes one chunk.
pub(crate) fn plan_chunks(buf: &[u8], block_size: usize, line_aware: bool) -> Vec<usize> {
    let block_size = block_size.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start + block_size < buf.len() {
        let len = if line_aware {
            let window = &buf[start..start + block_size];
            match window.iter().rposition(|&b| b == EOL) {
                Some(pos) => pos + 1,
                None => match buf[start + block_size..].iter().position(|&b| b == EOL) {
                    Some(pos) => block_size + pos + 1,
                    None => break,
                },
            }
        } else {
            block_size
        };
        chunks.push(len);
        start += len;
    }

    if start < buf.len() {
        chunks.push(buf.len() - start);
    }
    chunks
}
