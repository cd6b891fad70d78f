//! Reassembly and emission of `CHUNK:n/N:data` messages for payloads that
//! exceed the transport's MTU.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::config::CHUNK_TIMEOUT_S;

/// Reassembles a sequence of `CHUNK:n/N:data` frames into one message.
///
/// Lives as a field of the owning transport worker, not a global — each BLE
/// connection (and, in principle, each HTTP client) gets its own assembler
/// so unrelated peers can't interleave chunk sequences.
pub struct ChunkAssembler {
    slots: Vec<Option<String>>,
    expected: usize,
    received: HashSet<usize>,
    started: Option<Instant>,
    timeout: Duration,
}

impl Default for ChunkAssembler {
    fn default() -> Self {
        Self::new(Duration::from_secs_f64(CHUNK_TIMEOUT_S))
    }
}

impl ChunkAssembler {
    pub fn new(timeout: Duration) -> Self {
        Self {
            slots: Vec::new(),
            expected: 0,
            received: HashSet::new(),
            started: None,
            timeout,
        }
    }

    pub fn is_chunk(line: &str) -> bool {
        line.starts_with("CHUNK:")
    }

    /// Feeds one `CHUNK:` line. Returns `Some(message)` once every chunk of
    /// the current sequence has arrived, `None` while still accumulating.
    pub fn feed(&mut self, line: &str) -> Option<String> {
        let (seq, total, data) = match parse_chunk(line) {
            Some(parsed) => parsed,
            None => {
                self.reset();
                return None;
            }
        };

        let now = Instant::now();
        let timed_out = self
            .started
            .is_some_and(|started| now.duration_since(started) > self.timeout);
        if total != self.expected || timed_out {
            self.reset();
        }

        if self.slots.is_empty() {
            self.slots = vec![None; total];
            self.expected = total;
            self.started = Some(now);
        }

        if seq >= 1 && seq <= total {
            self.slots[seq - 1] = Some(data);
            self.received.insert(seq);
        }

        if self.received.len() == self.expected {
            let assembled = self.slots.iter().flatten().cloned().collect::<String>();
            self.reset();
            return Some(assembled);
        }

        None
    }

    pub fn reset(&mut self) {
        self.slots.clear();
        self.expected = 0;
        self.received.clear();
        self.started = None;
    }
}

/// Parses `CHUNK:<seq>/<total>:<data>`, matching on the first two
/// delimiters only so `data` may itself contain `/` or `:`.
fn parse_chunk(line: &str) -> Option<(usize, usize, String)> {
    let rest = line.strip_prefix("CHUNK:")?;
    let slash = rest.find('/')?;
    let seq: usize = rest[..slash].parse().ok()?;
    let after_slash = &rest[slash + 1..];
    let colon = after_slash.find(':')?;
    let total: usize = after_slash[..colon].parse().ok()?;
    let data = after_slash[colon + 1..].to_string();
    Some((seq, total, data))
}

/// Splits `message` into `CHUNK:n/N:data` frames if it exceeds `max_size`
/// bytes; returns the message unchanged (as a single-element vec) otherwise.
///
/// Splitting operates on raw bytes, not UTF-8 code points, matching the
/// transport's own framing — a multi-byte character may straddle two
/// chunks and is replaced with the UTF-8 replacement character on decode.
pub fn chunk_response(message: &str, max_size: usize) -> Vec<String> {
    let encoded = message.as_bytes();
    if encoded.len() <= max_size {
        return vec![message.to_string()];
    }

    const HEADER_RESERVE: usize = 16;
    let chunk_data_size = max_size.saturating_sub(HEADER_RESERVE).max(1);

    let parts: Vec<String> = encoded
        .chunks(chunk_data_size)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect();

    let total = parts.len();
    parts
        .into_iter()
        .enumerate()
        .map(|(index, part)| format!("CHUNK:{}/{total}:{part}", index + 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn short_message_is_not_chunked() {
        assert_eq!(vec!["RSP:pong".to_string()], chunk_response("RSP:pong", 480));
    }

    #[test]
    fn long_message_splits_into_numbered_chunks() {
        let message = "x".repeat(1000);
        let chunks = chunk_response(&message, 480);
        assert_eq!(3, chunks.len());
        assert!(chunks[0].starts_with("CHUNK:1/3:"));
        assert!(chunks[2].starts_with("CHUNK:3/3:"));
    }

    #[test]
    fn assembler_reassembles_in_order_arrival() {
        let mut assembler = ChunkAssembler::default();
        let chunks = chunk_response(&"y".repeat(1000), 480);
        assert!(assembler.feed(&chunks[0]).is_none());
        assert!(assembler.feed(&chunks[1]).is_none());
        let assembled = assembler.feed(&chunks[2]).expect("complete");
        assert_eq!("y".repeat(1000), assembled);
    }

    #[test]
    fn assembler_reassembles_out_of_order_arrival() {
        let mut assembler = ChunkAssembler::default();
        let chunks = chunk_response(&"z".repeat(1000), 480);
        assert!(assembler.feed(&chunks[2]).is_none());
        assert!(assembler.feed(&chunks[0]).is_none());
        let assembled = assembler.feed(&chunks[1]).expect("complete");
        assert_eq!("z".repeat(1000), assembled);
    }

    #[test]
    fn assembler_resets_on_mismatched_total() {
        let mut assembler = ChunkAssembler::default();
        assert!(assembler.feed("CHUNK:1/3:a").is_none());
        // A new sequence announcing a different total discards the old one.
        assert!(assembler.feed("CHUNK:1/2:b").is_none());
        let assembled = assembler.feed("CHUNK:2/2:c").expect("complete");
        assert_eq!("bc", assembled);
    }

    #[test]
    fn assembler_resets_after_timeout() {
        let mut assembler = ChunkAssembler::new(Duration::from_millis(1));
        assert!(assembler.feed("CHUNK:1/2:a").is_none());
        std::thread::sleep(Duration::from_millis(5));
        // Same total, but stale -- must restart the sequence rather than
        // complete with a phantom first chunk.
        assert!(assembler.feed("CHUNK:1/2:b").is_none());
        let assembled = assembler.feed("CHUNK:2/2:c").expect("complete");
        assert_eq!("bc", assembled);
    }

    #[rstest]
    #[case("CHUNK:garbage")]
    #[case("CHUNK:1:nototal")]
    #[case("CHUNK:1/notanumber:data")]
    fn assembler_resets_on_malformed_chunk(#[case] malformed: &str) {
        let mut assembler = ChunkAssembler::default();
        assert!(assembler.feed("CHUNK:1/2:a").is_none());
        assert!(assembler.feed(malformed).is_none());
        // The malformed frame reset state; completing the original sequence
        // with just the second chunk must not produce a result.
        assert!(assembler.feed("CHUNK:2/2:b").is_none());
    }
}
