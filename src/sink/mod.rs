//! Sink abstraction: the external producer a worker feeds framed records into.

pub mod kcat;
#[cfg(any(test, feature = "sink-mock"))]
pub mod mock;
pub mod process;

/// Whatever the external producer printed before it exited.
#[derive(Clone, Debug, Default)]
pub struct SinkOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    #[error("spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("write: {0}")]
    Write(#[source] std::io::Error),
    #[error("wait: {0}")]
    Wait(#[source] std::io::Error),
    #[error("{program} exited unsuccessfully ({})", describe_exit(.code))]
    Exit { program: String, code: Option<i32> },
    #[error("sink already closed")]
    Closed,
    #[error("other: {0}")]
    Other(String),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("exit code {}", c),
        None => "terminated by signal".to_string(),
    }
}

impl SinkError {
    pub fn is_exit(&self) -> bool {
        matches!(self, Self::Exit { .. })
    }
}

/// Write side of one worker's pipeline.
#[async_trait::async_trait]
pub trait RecordSink: Send {
    /// Write one framed record. May wait while the consumer is behind.
    async fn write(&mut self, frame: &[u8]) -> Result<(), SinkError>;
    /// Close the input, wait for the consumer to finish and hand back its output.
    async fn finish(self: Box<Self>) -> Result<SinkOutput, SinkError>;
}

/// Opens one sink per worker.
#[async_trait::async_trait]
pub trait SinkConnector: Send + Sync {
    async fn open(&self, worker: usize) -> Result<Box<dyn RecordSink>, SinkError>;
    fn describe(&self) -> String;
}
