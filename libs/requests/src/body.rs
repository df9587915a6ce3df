use bytes::Bytes;
use parking_lot::Mutex;
use std::io::Read;
use std::sync::OnceLock;

/// Unconsumed response body stream handed over by a transport
pub type BodyReader = Box<dyn Read + Send + 'static>;

/// Response body that is drained from its stream at most once.
///
/// The first call to [`get`](BodyBuffer::get) reads the stream to the end,
/// drops it and caches the bytes; every later call returns the cache.
pub(crate) struct BodyBuffer {
    stream: Mutex<Option<BodyReader>>,
    buffered: OnceLock<Bytes>,
}

impl std::fmt::Debug for BodyBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.buffered.get() {
            Some(bytes) => f.debug_tuple("BodyBuffer::Buffered").field(&bytes.len()).finish(),
            None => write!(f, "BodyBuffer::Unread(..)"),
        }
    }
}

impl BodyBuffer {
    pub(crate) fn new(stream: Option<BodyReader>) -> Self {
        Self {
            stream: Mutex::new(stream),
            buffered: OnceLock::new(),
        }
    }

    /// Buffered body, draining the stream on first use
    pub(crate) fn get(&self) -> &Bytes {
        self.buffered
            .get_or_init(|| drain(self.stream.lock().take()))
    }

    pub(crate) fn is_buffered(&self) -> bool {
        self.buffered.get().is_some()
    }
}

// A failed read yields an empty body; the stream is dropped either way.
fn drain(stream: Option<BodyReader>) -> Bytes {
    let Some(mut stream) = stream else {
        return Bytes::new();
    };
    let mut buf = Vec::new();
    match stream.read_to_end(&mut buf) {
        Ok(len) => {
            tracing::trace!(len, "response body buffered");
            Bytes::from(buf)
        }
        Err(error) => {
            tracing::warn!(
                %error,
                partial = buf.len(),
                "failed to read response body, treating it as empty"
            );
            Bytes::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing_test::traced_test;

    /// Counts how many times the reader reported end-of-stream
    struct EofCounter {
        inner: Cursor<Vec<u8>>,
        eofs: Arc<AtomicUsize>,
    }

    impl Read for EofCounter {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.inner.read(buf)?;
            if n == 0 {
                self.eofs.fetch_add(1, Ordering::SeqCst);
            }
            Ok(n)
        }
    }

    struct Failing;

    impl Read for Failing {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer"))
        }
    }

    #[test]
    fn test_stream_is_drained_once() {
        let eofs = Arc::new(AtomicUsize::new(0));
        let body = BodyBuffer::new(Some(Box::new(EofCounter {
            inner: Cursor::new(b"Hello world!".to_vec()),
            eofs: Arc::clone(&eofs),
        })));

        assert!(!body.is_buffered());
        assert_eq!(&body.get()[..], b"Hello world!");
        assert!(body.is_buffered());
        assert_eq!(body.get().len(), 12);
        assert_eq!(&body.get()[..], b"Hello world!");
        assert_eq!(eofs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_absent_stream_is_empty() {
        let body = BodyBuffer::new(None);
        assert!(body.get().is_empty());
        assert!(body.is_buffered());
    }

    #[test]
    #[traced_test]
    fn test_failed_read_is_empty() {
        let body = BodyBuffer::new(Some(Box::new(Failing)));
        assert!(body.get().is_empty());
        assert!(body.get().is_empty());
        assert!(logs_contain("failed to read response body"));
    }

    #[test]
    fn test_debug_reports_state() {
        let body = BodyBuffer::new(Some(Box::new(Cursor::new(vec![1, 2, 3]))));
        assert_eq!(format!("{body:?}"), "BodyBuffer::Unread(..)");
        body.get();
        assert_eq!(format!("{body:?}"), "BodyBuffer::Buffered(3)");
    }
}
