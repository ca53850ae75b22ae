//! In-memory sink (feature `sink-mock`) that captures everything written per worker.
use crate::sink::{RecordSink, SinkConnector, SinkError, SinkOutput};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct MockConnector {
    inner: Arc<MockState>,
}

#[derive(Default)]
struct MockState {
    captured: Mutex<BTreeMap<usize, Vec<u8>>>,
    opened: AtomicUsize,
    finished: AtomicUsize,
    written: AtomicUsize,
    discard: bool,
    exit_code: Option<i32>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only count bytes, keep nothing. For unbounded runs.
    pub fn discarding() -> Self {
        Self {
            inner: Arc::new(MockState {
                discard: true,
                ..Default::default()
            }),
        }
    }

    /// Every sink reports a failed exit with `code` on finish.
    pub fn failing(code: i32) -> Self {
        Self {
            inner: Arc::new(MockState {
                exit_code: Some(code),
                ..Default::default()
            }),
        }
    }

    pub fn opened(&self) -> usize {
        self.inner.opened.load(Ordering::SeqCst)
    }

    pub fn finished(&self) -> usize {
        self.inner.finished.load(Ordering::SeqCst)
    }

    pub fn bytes_written(&self) -> usize {
        self.inner.written.load(Ordering::SeqCst)
    }

    /// Bytes each finished worker wrote, keyed by worker index.
    pub fn captured(&self) -> BTreeMap<usize, Vec<u8>> {
        self.inner
            .captured
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl SinkConnector for MockConnector {
    async fn open(&self, worker: usize) -> Result<Box<dyn RecordSink>, SinkError> {
        self.inner.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSink {
            worker,
            buf: Vec::new(),
            state: Arc::clone(&self.inner),
        }))
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}

struct MockSink {
    worker: usize,
    buf: Vec<u8>,
    state: Arc<MockState>,
}

#[async_trait::async_trait]
impl RecordSink for MockSink {
    async fn write(&mut self, frame: &[u8]) -> Result<(), SinkError> {
        self.state.written.fetch_add(frame.len(), Ordering::SeqCst);
        if !self.state.discard {
            self.buf.extend_from_slice(frame);
        }
        Ok(())
    }

    async fn finish(self: Box<Self>) -> Result<SinkOutput, SinkError> {
        let MockSink { worker, buf, state } = *self;
        state.finished.fetch_add(1, Ordering::SeqCst);
        state
            .captured
            .lock()
            .map_err(|_| SinkError::Other("mock state poisoned".into()))?
            .insert(worker, buf);
        match state.exit_code {
            Some(code) => Err(SinkError::Exit {
                program: "mock".to_string(),
                code: Some(code),
            }),
            None => Ok(SinkOutput::default()),
        }
    }
}
