//! EventFrame parser
//!
//! Turns an append-only sequence of byte chunks into completed [`Event`]s.
//! Chunks need not align with line, frame, or even UTF-8 character
//! boundaries: the parser carries every unterminated fragment over to the
//! next chunk.
//!
//! # Wire format
//!
//! ```text
//! event:<type>         optional, defaults to "message"
//! data:<payload line>  repeatable, joined by line-feed
//! id:<event id>        optional
//! <blank line>         terminates the event
//! ```
//!
//! Unknown fields are ignored. Whitespace right after a field's colon is
//! trimmed. A blank line with no accumulated data emits nothing.

use crate::core::event::{Event, MESSAGE_EVENT};

/// Incremental parser for one connection attempt
///
/// Owned by the reader driving a single attempt and discarded with it; a
/// frame that was only partially received when the connection dropped is
/// lost.
#[derive(Debug, Default)]
pub struct FrameParser {
    /// Incomplete UTF-8 sequence from the end of the previous chunk
    undecoded: Vec<u8>,
    /// Unterminated trailing line
    buffer: String,
    event_type: Option<String>,
    data: String,
    id: Option<String>,
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a raw byte chunk, returning every event it completed
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Event> {
        let text = self.decode(chunk);
        self.feed_str(&text)
    }

    /// Feed already decoded text, returning every event it completed
    pub fn feed_str(&mut self, text: &str) -> Vec<Event> {
        self.buffer.push_str(text);

        let Some(last_lf) = self.buffer.rfind('\n') else {
            return Vec::new();
        };

        // Keep the trailing fragment, process everything up to the last LF
        let fragment = self.buffer.split_off(last_lf + 1);
        let complete = std::mem::replace(&mut self.buffer, fragment);

        complete[..last_lf]
            .split('\n')
            .filter_map(|line| self.process_line(line))
            .collect()
    }

    /// Text received but not yet terminated by a line-feed
    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    /// True when no partial line or partial frame is pending
    pub fn is_idle(&self) -> bool {
        self.buffer.is_empty()
            && self.undecoded.is_empty()
            && self.data.is_empty()
            && self.event_type.is_none()
            && self.id.is_none()
    }

    fn process_line(&mut self, line: &str) -> Option<Event> {
        let line = line.strip_suffix('\r').unwrap_or(line);

        if line.is_empty() {
            return self.terminate();
        }

        if let Some(value) = field_value(line, "event") {
            self.event_type = Some(value.to_string());
        } else if let Some(value) = field_value(line, "data") {
            self.data.push_str(value);
            self.data.push('\n');
        } else if let Some(value) = field_value(line, "id") {
            self.id = Some(value.to_string());
        }

        None
    }

    fn terminate(&mut self) -> Option<Event> {
        let event_type = self.event_type.take();
        let id = self.id.take();

        if self.data.is_empty() {
            return None;
        }

        let mut data = std::mem::take(&mut self.data);
        data.pop();

        Some(Event {
            event_type: event_type.unwrap_or_else(|| MESSAGE_EVENT.to_string()),
            data,
            id,
        })
    }

    /// Decode a chunk, carrying an incomplete trailing UTF-8 sequence over
    /// to the next call. Invalid sequences become U+FFFD.
    fn decode(&mut self, chunk: &[u8]) -> String {
        self.undecoded.extend_from_slice(chunk);

        let mut text = String::with_capacity(self.undecoded.len());
        loop {
            match std::str::from_utf8(&self.undecoded) {
                Ok(valid) => {
                    text.push_str(valid);
                    self.undecoded.clear();
                    break;
                }
                Err(e) => {
                    let valid_up_to = e.valid_up_to();
                    text.push_str(&String::from_utf8_lossy(&self.undecoded[..valid_up_to]));
                    match e.error_len() {
                        Some(invalid) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            self.undecoded.drain(..valid_up_to + invalid);
                        }
                        None => {
                            self.undecoded.drain(..valid_up_to);
                            break;
                        }
                    }
                }
            }
        }
        text
    }
}

/// Value of `name:` in `line`, with leading whitespace trimmed
fn field_value<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    line.strip_prefix(name)?
        .strip_prefix(':')
        .map(str::trim_start)
}
