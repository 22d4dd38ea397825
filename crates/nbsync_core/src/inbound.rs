//! Reassembly of complete command lines from arbitrarily chunked input.

use std::collections::VecDeque;

/// FIFO of received chunks, drained one complete line at a time.
#[derive(Debug, Default)]
pub struct InboundQueue {
    chunks: VecDeque<Vec<u8>>,
}

impl InboundQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a received chunk; empty chunks are ignored.
    pub fn feed(&mut self, bytes: &[u8]) {
        if !bytes.is_empty() {
            self.chunks.push_back(bytes.to_vec());
        }
    }

    /// Take the next complete line, without its newline.
    ///
    /// # Returns
    /// `None` while the buffered data holds no newline; the partial line stays
    /// queued until more input arrives.
    pub fn next_line(&mut self) -> Option<Vec<u8>> {
        loop {
            let front = self.chunks.front_mut()?;
            if let Some(at) = front.iter().position(|b| *b == b'\n') {
                let rest = front.split_off(at + 1);
                let mut line = std::mem::replace(front, rest);
                line.pop();
                if self.chunks.front().is_some_and(Vec::is_empty) {
                    self.chunks.pop_front();
                }
                return Some(line);
            }

            if self.chunks.len() < 2 {
                return None;
            }
            let head = self.chunks.pop_front()?;
            if let Some(next) = self.chunks.front_mut() {
                let mut merged = head;
                merged.append(next);
                *next = merged;
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
    }
}
