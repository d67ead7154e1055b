//! Audio transcoding through an external `ffmpeg` process
//!
//! The provider's audio is written to the child's stdin while its stdout is
//! read back as a stream, so output starts flowing before the input ends.
//! Dropping the returned stream aborts the pump task, which kills the child
//! and drops the upstream stream with it.

use std::{
    path::PathBuf,
    pin::Pin,
    process::Stdio,
    sync::Arc,
    task::{Context, Poll},
};

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use relay_config::{TranscodeConfig, TranscodeInput};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    process::{Child, ChildStderr, ChildStdin, ChildStdout, Command},
    sync::mpsc,
    task::JoinHandle,
};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::io::ReaderStream;

use crate::{error::TtsError, types::AudioStream};

/// Transcoded audio is always mono
pub const OUTPUT_CHANNELS: u16 = 1;

/// Diagnostic lines kept for the failure message
const STDERR_TAIL_LINES: usize = 8;

/// Lifecycle of one transcoding run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscodeEvent {
    /// The child process was spawned
    Started { program: PathBuf, args: Vec<String> },
    /// A line the child wrote to stderr
    Diagnostic(String),
    /// All input was handed to the child
    InputFinished { bytes: u64 },
    /// The child exited cleanly after producing `bytes` of output
    Completed { bytes: u64 },
    /// The run failed
    Failed { reason: String },
}

/// Receives transcoding events
pub trait TranscodeObserver: Send + Sync {
    fn on_event(&self, event: &TranscodeEvent);
}

impl<F> TranscodeObserver for F
where
    F: Fn(&TranscodeEvent) + Send + Sync,
{
    fn on_event(&self, event: &TranscodeEvent) {
        self(event);
    }
}

/// Observer that forwards events to `tracing`
pub struct LogObserver;

impl TranscodeObserver for LogObserver {
    fn on_event(&self, event: &TranscodeEvent) {
        match event {
            TranscodeEvent::Started { program, args } => {
                tracing::debug!(program = %program.display(), args = %args.join(" "), "transcoder started");
            }
            TranscodeEvent::Diagnostic(line) => tracing::debug!(line = %line, "transcoder output"),
            TranscodeEvent::InputFinished { bytes } => tracing::debug!(bytes, "transcoder input finished"),
            TranscodeEvent::Completed { bytes } => tracing::debug!(bytes, "transcoding complete"),
            TranscodeEvent::Failed { reason } => tracing::error!(reason = %reason, "transcoding failed"),
        }
    }
}

/// Target format of the transcoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeSettings {
    pub sample_rate: u32,
    pub codec: String,
    pub container: String,
    pub input: Option<TranscodeInput>,
}

impl From<&TranscodeConfig> for TranscodeSettings {
    fn from(config: &TranscodeConfig) -> Self {
        Self {
            sample_rate: config.sample_rate,
            codec: config.codec.clone(),
            container: config.container.clone(),
            input: config.input.clone(),
        }
    }
}

impl TranscodeSettings {
    /// `ffmpeg` arguments reading stdin and writing stdout
    pub fn ffmpeg_args(&self) -> Vec<String> {
        let mut args: Vec<String> = ["-hide_banner", "-nostdin", "-loglevel", "error"]
            .map(String::from)
            .into();

        if let Some(ref input) = self.input {
            args.extend([
                "-f".to_string(),
                input.format.clone(),
                "-ar".to_string(),
                input.sample_rate.to_string(),
                "-ac".to_string(),
                input.channels.to_string(),
            ]);
        }

        args.extend([
            "-i".to_string(),
            "pipe:0".to_string(),
            "-ac".to_string(),
            OUTPUT_CHANNELS.to_string(),
            "-ar".to_string(),
            self.sample_rate.to_string(),
            "-acodec".to_string(),
            self.codec.clone(),
            "-f".to_string(),
            self.container.clone(),
            "pipe:1".to_string(),
        ]);

        args
    }
}

/// Runs the transcoding stage for one request at a time
pub struct Transcoder {
    program: PathBuf,
    args: Vec<String>,
    observer: Arc<dyn TranscodeObserver>,
}

impl Transcoder {
    pub fn new(program: impl Into<PathBuf>, settings: &TranscodeSettings, observer: Arc<dyn TranscodeObserver>) -> Self {
        Self::with_args(program, settings.ffmpeg_args(), observer)
    }

    /// Transcoder running an arbitrary command line
    pub fn with_args(program: impl Into<PathBuf>, args: Vec<String>, observer: Arc<dyn TranscodeObserver>) -> Self {
        Self {
            program: program.into(),
            args,
            observer,
        }
    }

    pub fn from_config(config: &TranscodeConfig) -> Self {
        Self::new(&config.program, &TranscodeSettings::from(config), Arc::new(LogObserver))
    }

    /// Pipe `input` through the child process
    ///
    /// Fails immediately if the child cannot be spawned. Later failures
    /// (upstream errors, non-zero exit) arrive as the final stream item.
    pub fn transcode(&self, input: AudioStream) -> crate::Result<AudioStream> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                let reason = format!("failed to start {}: {e}", self.program.display());
                self.observer.on_event(&TranscodeEvent::Failed { reason: reason.clone() });
                TtsError::Transcode(reason)
            })?;

        self.observer.on_event(&TranscodeEvent::Started {
            program: self.program.clone(),
            args: self.args.clone(),
        });

        let (Some(stdin), Some(stdout), Some(stderr)) = (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            return Err(TtsError::Transcode("child process pipes unavailable".to_string()));
        };

        let (tx, rx) = mpsc::channel(16);
        let pump = Pump {
            program: self.program.display().to_string(),
            observer: Arc::clone(&self.observer),
            tx,
        };

        let task = tokio::spawn(pump.run(child, input, stdin, stdout, stderr));

        Ok(Box::pin(TranscodedStream {
            inner: ReceiverStream::new(rx),
            task,
        }))
    }
}

/// Why feeding the child stopped early
enum FeedError {
    Upstream(TtsError),
    Write(std::io::Error),
}

struct Pump {
    program: String,
    observer: Arc<dyn TranscodeObserver>,
    tx: mpsc::Sender<crate::Result<Bytes>>,
}

impl Pump {
    async fn run(self, mut child: Child, input: AudioStream, stdin: ChildStdin, stdout: ChildStdout, stderr: ChildStderr) {
        let (fed, produced, diagnostics) =
            tokio::join!(self.feed(input, stdin), self.forward(stdout), self.diagnostics(stderr));

        let outcome = match (fed, produced, child.wait().await) {
            (Err(FeedError::Upstream(e)), _, _) => Err(e),
            (_, _, Ok(status)) if !status.success() => Err(TtsError::Transcode(format!(
                "{} exited with {status}: {}",
                self.program,
                diagnostics.join("; ")
            ))),
            (_, _, Err(e)) => Err(TtsError::Transcode(format!("failed to wait for {}: {e}", self.program))),
            (Err(FeedError::Write(e)), _, _) => {
                Err(TtsError::Transcode(format!("failed to write to {}: {e}", self.program)))
            }
            (_, Err(e), _) => Err(TtsError::Transcode(format!("failed to read from {}: {e}", self.program))),
            (Ok(_), Ok(bytes), Ok(_)) => Ok(bytes),
        };

        match outcome {
            Ok(bytes) => self.observer.on_event(&TranscodeEvent::Completed { bytes }),
            Err(e) => {
                self.observer.on_event(&TranscodeEvent::Failed { reason: e.to_string() });
                // Receiver may be gone already
                let _ = self.tx.send(Err(e)).await;
            }
        }
    }

    /// Copy upstream audio into the child's stdin, closing it at the end
    async fn feed(&self, mut input: AudioStream, mut stdin: ChildStdin) -> Result<u64, FeedError> {
        let mut written = 0u64;

        while let Some(chunk) = input.next().await {
            let chunk = chunk.map_err(FeedError::Upstream)?;
            stdin.write_all(&chunk).await.map_err(FeedError::Write)?;
            written += chunk.len() as u64;
        }

        stdin.shutdown().await.map_err(FeedError::Write)?;
        drop(stdin);

        self.observer.on_event(&TranscodeEvent::InputFinished { bytes: written });
        Ok(written)
    }

    /// Forward the child's stdout to the receiver in order
    async fn forward(&self, stdout: ChildStdout) -> std::io::Result<u64> {
        let mut reader = ReaderStream::new(stdout);
        let mut produced = 0u64;

        while let Some(chunk) = reader.next().await {
            let chunk = chunk?;
            produced += chunk.len() as u64;

            if self.tx.send(Ok(chunk)).await.is_err() {
                tracing::debug!("transcoder output receiver dropped");
                break;
            }
        }

        Ok(produced)
    }

    /// Report stderr lines and keep the last few for error messages
    async fn diagnostics(&self, stderr: ChildStderr) -> Vec<String> {
        let mut lines = BufReader::new(stderr).lines();
        let mut tail = Vec::with_capacity(STDERR_TAIL_LINES);

        while let Ok(Some(line)) = lines.next_line().await {
            self.observer.on_event(&TranscodeEvent::Diagnostic(line.clone()));

            if tail.len() == STDERR_TAIL_LINES {
                tail.remove(0);
            }
            tail.push(line);
        }

        tail
    }
}

/// Output side of a transcoding run; aborts the run when dropped
struct TranscodedStream {
    inner: ReceiverStream<crate::Result<Bytes>>,
    task: JoinHandle<()>,
}

impl Stream for TranscodedStream {
    type Item = crate::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl Drop for TranscodedStream {
    fn drop(&mut self) {
        self.task.abort();
    }
}
