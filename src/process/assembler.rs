//! Line assembly for child output
//!
//! Pipes deliver output in arbitrary chunks. The assembler buffers bytes
//! until a record terminator arrives and then classifies the record:
//! records that start with the sentinel character are progress markers,
//! everything else is plain output.

/// Longest record kept before it is flushed without a terminator
const MAX_RECORD_LEN: usize = 64 * 1024;

/// One complete record of child output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// Starts with the sentinel; contents are opaque to the runner
    Marker(String),
    /// Any other output
    Line(String),
}

/// Splits a byte stream into records on `\n` or `\r`
#[derive(Debug)]
pub struct RecordAssembler {
    sentinel: char,
    pending: Vec<u8>,
    /// The pending bytes continue a record that was already flushed
    continuation: bool,
}

impl RecordAssembler {
    pub fn new(sentinel: char) -> Self {
        Self {
            sentinel,
            pending: Vec::new(),
            continuation: false,
        }
    }

    /// Buffer `bytes` and return every record they complete
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Record> {
        let mut records = Vec::new();
        for &byte in bytes {
            if byte == b'\n' || byte == b'\r' {
                self.flush_into(&mut records);
                self.continuation = false;
            } else {
                self.pending.push(byte);
                if self.pending.len() >= MAX_RECORD_LEN {
                    self.flush_overlong(&mut records);
                }
            }
        }
        records
    }

    /// Flush whatever is buffered once the stream has closed
    pub fn finish(&mut self) -> Option<Record> {
        let mut records = Vec::new();
        self.flush_into(&mut records);
        self.continuation = false;
        records.pop()
    }

    /// Emit the first part of an unterminated record. A trailing partial
    /// UTF-8 sequence stays buffered for the next part.
    fn flush_overlong(&mut self, records: &mut Vec<Record>) {
        let split = self.pending.len() - incomplete_suffix_len(&self.pending);
        let rest = self.pending.split_off(split);
        self.flush_into(records);
        self.pending = rest;
        self.continuation = true;
    }

    fn flush_into(&mut self, records: &mut Vec<Record>) {
        if self.pending.is_empty() {
            return;
        }
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        records.push(self.classify(text));
    }

    fn classify(&self, text: String) -> Record {
        if !self.continuation && text.starts_with(self.sentinel) {
            Record::Marker(text)
        } else {
            Record::Line(text)
        }
    }
}

/// Length of an unfinished multi-byte sequence at the end of `bytes`
fn incomplete_suffix_len(bytes: &[u8]) -> usize {
    for back in 1..=bytes.len().min(4) {
        let byte = bytes[bytes.len() - back];
        if byte & 0xC0 != 0x80 {
            let width = match byte {
                0xC0..=0xDF => 2,
                0xE0..=0xEF => 3,
                0xF0..=0xF7 => 4,
                _ => 1,
            };
            return if width > back { back } else { 0 };
        }
    }
    0
}
