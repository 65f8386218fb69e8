//! We use this mocking module in unit tests to emulate the supply.
//!
//! The real instrument only speaks when spoken to: a reply queued here is
//! released when the next query is written, stays readable until exhausted,
//! and whatever is left over is dropped by `discard_input`. That is enough
//! to script multi-round-trip retry sequences byte for byte.

use std::collections::VecDeque;

use crate::transport::Link;

#[derive(Debug)]
pub enum MockSerialError {
    /// No data arrived within the (simulated) read timeout.
    TimedOut,
    /// Simulated hard I/O failure.
    Broken,
}

impl std::fmt::Display for MockSerialError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MockSerialError::TimedOut => write!(f, "timed out"),
            MockSerialError::Broken => write!(f, "broken"),
        }
    }
}

impl std::error::Error for MockSerialError {}

impl embedded_io::Error for MockSerialError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            MockSerialError::TimedOut => embedded_io::ErrorKind::TimedOut,
            MockSerialError::Broken => embedded_io::ErrorKind::BrokenPipe,
        }
    }
}

/// Our mock type used to emulate the serial side of the supply.
pub struct MockSerial {
    /// Every write call, frame by frame.
    writes: Vec<Vec<u8>>,
    /// Replies released one per query write.
    replies: VecDeque<Vec<u8>>,
    /// Bytes currently readable.
    pending: Vec<u8>,
    /// Served for every query once the queue runs dry.
    repeat: Option<Vec<u8>>,
    /// Number of `discard_input` calls observed.
    discards: usize,
    /// Flag to simulate hard I/O errors.
    should_error: bool,
}

impl MockSerial {
    pub fn new() -> Self {
        MockSerial {
            writes: Vec::new(),
            replies: VecDeque::new(),
            pending: Vec::new(),
            repeat: None,
            discards: 0,
            should_error: false,
        }
    }

    /// Queue the reply released by the next unanswered query.
    pub fn queue_reply(&mut self, data: &[u8]) {
        self.replies.push_back(data.to_vec());
    }

    /// Serve `data` for every query once the queue is empty.
    pub fn repeat_reply(&mut self, data: &[u8]) {
        self.repeat = Some(data.to_vec());
    }

    /// Make every subsequent read and write fail hard.
    pub fn break_link(&mut self) {
        self.should_error = true;
    }

    /// All frames written so far, in order.
    pub fn writes(&self) -> &[Vec<u8>] {
        &self.writes
    }

    /// How many times the input buffer was discarded.
    pub fn discards(&self) -> usize {
        self.discards
    }
}

impl embedded_io::ErrorType for MockSerial {
    type Error = MockSerialError;
}

impl embedded_io::Write for MockSerial {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if self.should_error {
            return Err(MockSerialError::Broken);
        }
        self.writes.push(buf.to_vec());
        // Queries end in '?'; set-commands keep the device silent.
        if buf.last() == Some(&b'?') {
            let reply = self
                .replies
                .pop_front()
                .or_else(|| self.repeat.clone())
                .unwrap_or_default();
            self.pending.extend_from_slice(&reply);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        if self.should_error {
            return Err(MockSerialError::Broken);
        }
        Ok(())
    }
}

impl embedded_io::Read for MockSerial {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.should_error {
            return Err(MockSerialError::Broken);
        }
        if self.pending.is_empty() {
            return Err(MockSerialError::TimedOut);
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}

impl Link for MockSerial {
    fn discard_input(&mut self) -> Result<(), Self::Error> {
        self.discards += 1;
        self.pending.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::{Read, Write};

    #[test]
    fn writes_are_logged_frame_by_frame() {
        let mut mock = MockSerial::new();
        mock.write(b"VSET1:05.00").unwrap();
        mock.write(b"VSET1?").unwrap();
        assert_eq!(mock.writes().len(), 2);
        assert_eq!(mock.writes()[0], b"VSET1:05.00");
    }

    #[test]
    fn only_queries_release_replies() {
        let mut mock = MockSerial::new();
        mock.queue_reply(b"05.00");

        mock.write(b"VSET1:05.00").unwrap();
        let mut buf = [0u8; 8];
        assert!(matches!(mock.read(&mut buf), Err(MockSerialError::TimedOut)));

        mock.write(b"VSET1?").unwrap();
        assert_eq!(mock.read(&mut buf).unwrap(), 5);
        assert_eq!(&buf[..5], b"05.00");
    }

    #[test]
    fn discard_drops_unread_bytes() {
        let mut mock = MockSerial::new();
        mock.queue_reply(b"05.00X");
        mock.write(b"VSET1?").unwrap();

        let mut buf = [0u8; 5];
        mock.read(&mut buf).unwrap();
        mock.discard_input().unwrap();
        assert_eq!(mock.discards(), 1);

        // The stray 'X' is gone.
        assert!(matches!(mock.read(&mut buf), Err(MockSerialError::TimedOut)));
    }

    #[test]
    fn exhausted_queue_reads_time_out() {
        let mut mock = MockSerial::new();
        mock.write(b"VOUT1?").unwrap();
        let mut buf = [0u8; 5];
        assert!(matches!(mock.read(&mut buf), Err(MockSerialError::TimedOut)));
    }

    #[test]
    fn broken_link_fails_everything() {
        let mut mock = MockSerial::new();
        mock.break_link();
        let mut buf = [0u8; 5];
        assert!(matches!(mock.write(b"OUT1"), Err(MockSerialError::Broken)));
        assert!(matches!(mock.read(&mut buf), Err(MockSerialError::Broken)));
        assert!(matches!(mock.flush(), Err(MockSerialError::Broken)));
    }
}
