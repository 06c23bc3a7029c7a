//! Notice Receiver - reassembles newline-delimited records from a byte stream
//!
//! Bytes arrive in whatever chunks the transport produces. The receiver
//! buffers them and hands each complete record (delimiter stripped) to a
//! callback, in stream order. A record split across many writes is dispatched
//! once, when its delimiter finally arrives; a write holding several
//! delimiters dispatches several records.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use tracing::debug;

/// Byte that terminates every record on the wire
pub const NOTICE_DELIMITER: u8 = b'\n';

struct ReceiverState<F> {
    buffer: Vec<u8>,
    /// Prefix of `buffer` already handed to the callback; nonzero between
    /// calls only if a callback panicked mid-dispatch
    consumed: usize,
    callback: F,
}

impl<F> ReceiverState<F> {
    fn discard_consumed(&mut self) {
        if self.consumed > 0 {
            self.buffer.drain(..self.consumed);
            self.consumed = 0;
        }
    }
}

/// Byte sink that invokes a callback for each discrete notice record
///
/// The callback runs while the receiver's lock is held and must not write
/// back into the same receiver.
pub struct NoticeReceiver<F> {
    state: Mutex<ReceiverState<F>>,
}

impl<F> NoticeReceiver<F>
where
    F: FnMut(&[u8]),
{
    /// Create a receiver that calls `callback` once per record
    pub fn new(callback: F) -> Self {
        Self {
            state: Mutex::new(ReceiverState {
                buffer: Vec::new(),
                consumed: 0,
                callback,
            }),
        }
    }

    /// Accept a chunk, dispatching every record it completes
    ///
    /// Always accepts the whole chunk.
    pub fn receive(&self, chunk: &[u8]) -> usize {
        if chunk.is_empty() {
            return 0;
        }

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        // Bytes already buffered hold no delimiter, so only the new chunk needs
        // scanning, unless a panicking callback left records undispatched
        let mut search = if state.consumed > 0 {
            state.discard_consumed();
            0
        } else {
            state.buffer.len()
        };
        let ReceiverState {
            buffer,
            consumed,
            callback,
        } = &mut *state;
        let mut dispatched = 0;
        buffer.extend_from_slice(chunk);

        while let Some(offset) = buffer[search..].iter().position(|&b| b == NOTICE_DELIMITER) {
            let start = *consumed;
            let end = search + offset;
            // Marked consumed before dispatch so a panicking callback never sees it twice
            *consumed = end + 1;
            search = end + 1;
            callback(&buffer[start..end]);
            dispatched += 1;
        }

        state.discard_consumed();
        if dispatched > 0 {
            debug!(dispatched, pending = state.buffer.len(), "NoticeReceiver::receive: dispatched records");
        }

        chunk.len()
    }

    /// Number of buffered bytes not yet handed to the callback
    pub fn pending(&self) -> usize {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.buffer.len() - state.consumed
    }

    /// Consume the receiver, returning the bytes of an unterminated trailing record
    pub fn into_remainder(self) -> Vec<u8> {
        let mut state = self.state.into_inner().unwrap_or_else(PoisonError::into_inner);
        state.discard_consumed();
        state.buffer
    }
}

impl<F> Write for NoticeReceiver<F>
where
    F: FnMut(&[u8]),
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.receive(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Lets several writers share one receiver; their chunks are serialized by the lock
impl<F> Write for &NoticeReceiver<F>
where
    F: FnMut(&[u8]),
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.receive(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<F> fmt::Debug for NoticeReceiver<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pending = self.state.lock().map(|s| s.buffer.len() - s.consumed).unwrap_or_default();
        f.debug_struct("NoticeReceiver").field("pending", &pending).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::cell::RefCell;

    fn collecting() -> (NoticeReceiver<impl FnMut(&[u8])>, std::rc::Rc<RefCell<Vec<Vec<u8>>>>) {
        let records = std::rc::Rc::new(RefCell::new(Vec::new()));
        let sink = records.clone();
        let receiver = NoticeReceiver::new(move |record: &[u8]| sink.borrow_mut().push(record.to_vec()));
        (receiver, records)
    }

    #[test]
    fn test_single_record() {
        let (receiver, records) = collecting();
        assert_eq!(receiver.receive(b"{\"a\":1}\n"), 8);
        assert_eq!(*records.borrow(), vec![b"{\"a\":1}".to_vec()]);
        assert_eq!(receiver.pending(), 0);
    }

    #[test]
    fn test_no_delimiter_accumulates() {
        let (receiver, records) = collecting();
        assert_eq!(receiver.receive(b"{\"partial\":"), 11);
        assert!(records.borrow().is_empty());
        assert_eq!(receiver.pending(), 11);
    }

    #[test]
    fn test_multiple_records_in_one_chunk() {
        let (receiver, records) = collecting();
        receiver.receive(b"one\ntwo\nthree\nfour");
        assert_eq!(
            *records.borrow(),
            vec![b"one".to_vec(), b"two".to_vec(), b"three".to_vec()]
        );
        assert_eq!(receiver.pending(), 4);
    }

    #[test]
    fn test_record_split_across_writes() {
        let (receiver, records) = collecting();
        receiver.receive(b"A");
        receiver.receive(br#"{"noticeType":"Tun"#);
        assert!(records.borrow().is_empty());
        receiver.receive(b"nels\"}\nB");
        assert_eq!(*records.borrow(), vec![br#"A{"noticeType":"Tunnels"}"#.to_vec()]);
        assert_eq!(receiver.into_remainder(), b"B".to_vec());
    }

    #[test]
    fn test_empty_chunk_is_noop() {
        let (receiver, records) = collecting();
        receiver.receive(b"abc");
        assert_eq!(receiver.receive(b""), 0);
        assert!(records.borrow().is_empty());
        assert_eq!(receiver.pending(), 3);
    }

    #[test]
    fn test_empty_records_and_carriage_returns_are_preserved() {
        let (receiver, records) = collecting();
        receiver.receive(b"\nx\r\n");
        assert_eq!(*records.borrow(), vec![b"".to_vec(), b"x\r".to_vec()]);
    }

    #[test]
    fn test_io_copy_into_receiver() {
        let (mut receiver, records) = collecting();
        let mut input: &[u8] = b"first\nsecond\n";
        let copied = io::copy(&mut input, &mut receiver).unwrap();
        assert_eq!(copied, 13);
        assert_eq!(records.borrow().len(), 2);
    }

    #[test]
    fn test_shared_reference_writer() {
        let (receiver, records) = collecting();
        let mut writer = &receiver;
        writer.write_all(b"via ref\n").unwrap();
        writer.flush().unwrap();
        assert_eq!(*records.borrow(), vec![b"via ref".to_vec()]);
    }

    #[test]
    fn test_callback_panic_does_not_redeliver_or_merge_records() {
        let records = std::rc::Rc::new(RefCell::new(Vec::new()));
        let sink = records.clone();
        let receiver = NoticeReceiver::new(move |record: &[u8]| {
            if record == b"boom" {
                panic!("callback failed");
            }
            sink.borrow_mut().push(record.to_vec());
        });

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            receiver.receive(b"one\nboom\nthree\npart");
        }));
        assert!(result.is_err());
        assert_eq!(receiver.pending(), "three\npart".len());

        receiver.receive(b"ial\ntwo\n");
        assert_eq!(
            *records.borrow(),
            vec![b"one".to_vec(), b"three".to_vec(), b"partial".to_vec(), b"two".to_vec()]
        );
        assert_eq!(receiver.pending(), 0);
    }

    /// Split `bytes` at the given (sorted, deduplicated) cut points
    fn chunked(bytes: &[u8], mut cuts: Vec<usize>) -> Vec<&[u8]> {
        cuts.retain(|&c| c < bytes.len());
        cuts.sort_unstable();
        cuts.dedup();
        let mut chunks = Vec::new();
        let mut last = 0;
        for cut in cuts {
            chunks.push(&bytes[last..cut]);
            last = cut;
        }
        chunks.push(&bytes[last..]);
        chunks
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// However the stream is chunked, each record comes out intact and in order
        #[test]
        fn proptest_chunking_preserves_records(
            records in prop::collection::vec(prop::collection::vec(any::<u8>().prop_filter("no delimiter", |b| *b != NOTICE_DELIMITER), 0..40), 0..12),
            cuts in prop::collection::vec(0usize..600, 0..20),
        ) {
            let mut stream = Vec::new();
            for record in &records {
                stream.extend_from_slice(record);
                stream.push(NOTICE_DELIMITER);
            }

            let (receiver, seen) = collecting();
            for chunk in chunked(&stream, cuts) {
                prop_assert_eq!(receiver.receive(chunk), chunk.len());
            }

            prop_assert_eq!(&*seen.borrow(), &records);
            prop_assert_eq!(receiver.pending(), 0);
        }
    }
}
