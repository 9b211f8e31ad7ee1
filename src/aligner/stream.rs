use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Split};
use tokio::process::Child;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::aligner::AlignerError;
use crate::parsing::sam::{AcceptedAlignment, AlignmentFilter, FilterStats, Filtered};

type LineSource = Split<BufReader<Box<dyn AsyncRead + Unpin + Send>>>;

/// Lazily read SAM output of one mapping run.
///
/// Lines are pulled from the producer as the consumer asks for them, so the
/// producer is only ever blocked by the consumer's own pace. A stream can be
/// read once; a retried stage starts a new run.
pub struct AlignmentStream {
    tool: String,
    lines: LineSource,
    line_number: usize,
    child: Option<Child>,
    stderr_task: Option<JoinHandle<()>>,
}

impl AlignmentStream {
    /// Stream lines from any async reader, e.g. a file or an in-memory buffer
    pub fn from_reader<R>(tool: impl Into<String>, reader: R) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let boxed: Box<dyn AsyncRead + Unpin + Send> = Box::new(reader);
        Self {
            tool: tool.into(),
            lines: BufReader::new(boxed).split(b'\n'),
            line_number: 0,
            child: None,
            stderr_task: None,
        }
    }

    /// Stream the stdout of a spawned process.
    ///
    /// Stderr, when piped, is drained on a background task so a chatty
    /// process cannot stall on a full pipe.
    ///
    /// # Errors
    ///
    /// Returns `AlignerError::Io` if the child was spawned without a stdout pipe.
    pub fn from_child(tool: impl Into<String>, mut child: Child) -> Result<Self, AlignerError> {
        let tool = tool.into();

        let stdout = child.stdout.take().ok_or_else(|| AlignerError::Io {
            tool: tool.clone(),
            source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "stdout is not piped"),
        })?;

        let stderr_task = child.stderr.take().map(|stderr| {
            let tool = tool.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(tool = %tool, "{line}");
                }
            })
        });

        let mut stream = Self::from_reader(tool, stdout);
        stream.child = Some(child);
        stream.stderr_task = stderr_task;

        Ok(stream)
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    /// Next raw line with its 1-based number, `None` at end of output.
    ///
    /// Lines that are not valid UTF-8 are returned lossily converted; the
    /// filter will reject them as malformed.
    ///
    /// # Errors
    ///
    /// Returns `AlignerError::Io` if reading the pipe fails.
    pub async fn next_line(&mut self) -> Result<Option<(usize, String)>, AlignerError> {
        let segment = self
            .lines
            .next_segment()
            .await
            .map_err(|source| AlignerError::Io {
                tool: self.tool.clone(),
                source,
            })?;

        Ok(segment.map(|mut bytes| {
            if bytes.last() == Some(&b'\r') {
                bytes.pop();
            }
            self.line_number += 1;
            let line = String::from_utf8(bytes)
                .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned());
            (self.line_number, line)
        }))
    }

    /// Next line accepted by `filter`, counting every outcome in `stats`
    ///
    /// # Errors
    ///
    /// Returns `AlignerError::Io` if reading the pipe fails.
    pub async fn next_accepted(
        &mut self,
        filter: &AlignmentFilter,
        stats: &mut FilterStats,
    ) -> Result<Option<AcceptedAlignment>, AlignerError> {
        while let Some((line_number, line)) = self.next_line().await? {
            let outcome = filter.classify(&line);
            stats.record(&outcome, line_number);

            if let Filtered::Accept(accepted) = outcome {
                return Ok(Some(accepted));
            }
        }

        Ok(None)
    }

    /// Wait for the producing process to exit and check its status.
    ///
    /// Must be called after the output has been drained.
    ///
    /// # Errors
    ///
    /// Returns `AlignerError::Process` for a non-zero exit or
    /// `AlignerError::Io` if waiting fails.
    pub async fn finish(mut self) -> Result<(), AlignerError> {
        if let Some(task) = self.stderr_task.take() {
            // Stderr logging is best effort
            let _ = task.await;
        }

        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        let status = child.wait().await.map_err(|source| AlignerError::Io {
            tool: self.tool.clone(),
            source,
        })?;

        if status.success() {
            Ok(())
        } else {
            Err(AlignerError::Process {
                tool: self.tool.clone(),
                status: status.code(),
            })
        }
    }
}
