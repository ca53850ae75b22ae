//! External process sink: records go to the child's stdin, its output is
//! collected until it exits.
use crate::sink::{RecordSink, SinkConnector, SinkError, SinkOutput};
use std::process::{Output, Stdio};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::process::{ChildStdin, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const STDIN_BUFFER: usize = 1 << 16;

#[derive(Clone, Debug)]
pub struct ProcessConnector {
    program: String,
    args: Vec<String>,
    forward_output: bool,
}

impl ProcessConnector {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            forward_output: true,
        }
    }

    /// Print the child's captured output once it exits (on by default).
    pub fn forward_output(mut self, on: bool) -> Self {
        self.forward_output = on;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

#[async_trait::async_trait]
impl SinkConnector for ProcessConnector {
    async fn open(&self, worker: usize) -> Result<Box<dyn RecordSink>, SinkError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SinkError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        debug!(worker, pid = ?child.id(), program = %self.program, "spawned producer process");
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SinkError::Other("child stdin not captured".into()))?;
        // Output has to be drained while we write, or a chatty child can block on its stdout.
        let waiter = tokio::spawn(child.wait_with_output());
        Ok(Box::new(ProcessSink {
            program: self.program.clone(),
            worker,
            stdin: Some(BufWriter::with_capacity(STDIN_BUFFER, stdin)),
            waiter,
            forward_output: self.forward_output,
        }))
    }

    fn describe(&self) -> String {
        format!("{} {}", self.program, self.args.join(" "))
    }
}

struct ProcessSink {
    program: String,
    worker: usize,
    stdin: Option<BufWriter<ChildStdin>>,
    waiter: JoinHandle<std::io::Result<Output>>,
    forward_output: bool,
}

impl ProcessSink {
    async fn close_stdin(&mut self) -> std::io::Result<()> {
        match self.stdin.take() {
            Some(mut w) => {
                w.flush().await?;
                w.shutdown().await
            }
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl RecordSink for ProcessSink {
    async fn write(&mut self, frame: &[u8]) -> Result<(), SinkError> {
        let stdin = self.stdin.as_mut().ok_or(SinkError::Closed)?;
        stdin.write_all(frame).await.map_err(SinkError::Write)
    }

    async fn finish(mut self: Box<Self>) -> Result<SinkOutput, SinkError> {
        let closed = self.close_stdin().await;
        let output = (&mut self.waiter)
            .await
            .map_err(|e| SinkError::Other(format!("wait task: {}", e)))?
            .map_err(SinkError::Wait)?;

        if self.forward_output {
            if !output.stdout.is_empty() {
                println!("{}", String::from_utf8_lossy(&output.stdout));
            }
            if !output.stderr.is_empty() {
                eprintln!("{}", String::from_utf8_lossy(&output.stderr));
            }
        }

        if !output.status.success() {
            warn!(worker = self.worker, status = %output.status, "producer process failed");
            return Err(SinkError::Exit {
                program: self.program.clone(),
                code: output.status.code(),
            });
        }
        closed.map_err(SinkError::Write)?;
        debug!(worker = self.worker, "producer process exited cleanly");
        Ok(SinkOutput {
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

impl Drop for ProcessSink {
    fn drop(&mut self) {
        // Dropping the wait future drops the child, which kills it.
        self.waiter.abort();
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let c = ProcessConnector::new("/definitely/not/here", vec![]);
        match c.open(0).await {
            Err(SinkError::Spawn { program, .. }) => assert_eq!(program, "/definitely/not/here"),
            Err(e) => panic!("unexpected error: {e}"),
            Ok(_) => panic!("spawn should fail"),
        }
    }

    #[tokio::test]
    async fn dead_child_reports_exit_code() {
        let c = ProcessConnector::new("sh", vec!["-c".into(), "exit 3".into()]).forward_output(false);
        let mut sink = c.open(0).await.unwrap();
        let _ = sink.write(b"a:b\n").await;
        let err = sink.finish().await.unwrap_err();
        assert!(err.is_exit());
        assert_eq!(err.to_string(), "sh exited unsuccessfully (exit code 3)");
    }
}
