use crate::decoder::{LineDecoder, LineOutcome, parse_line};
use crate::{ReelClientError, Result};

use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use reel_core::job::JobEvent;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::warn;

/// The decoded progress stream of one job.
///
/// Reads the response body chunk by chunk, yielding one [`JobEvent`] per complete line.
/// Malformed lines are logged and skipped.
pub struct JobEventStream {
    body: BoxStream<'static, reqwest::Result<Bytes>>,
    decoder: LineDecoder,
    pending: VecDeque<Vec<u8>>,
    idle_timeout: Option<Duration>,
    ended: bool,
    malformed: usize,
}

impl JobEventStream {
    /// `idle_timeout` bounds the wait for each chunk, not the job as a whole.
    pub fn new(
        body: BoxStream<'static, reqwest::Result<Bytes>>,
        idle_timeout: Option<Duration>,
    ) -> Self {
        Self {
            body,
            decoder: LineDecoder::new(),
            pending: VecDeque::new(),
            idle_timeout,
            ended: false,
            malformed: 0,
        }
    }

    /// The next event, or `None` once the body has ended.
    pub async fn next_event(&mut self) -> Result<Option<JobEvent>> {
        loop {
            while let Some(line) = self.pending.pop_front() {
                match parse_line(&line) {
                    LineOutcome::Event(event) => return Ok(Some(event)),
                    LineOutcome::Skip => {}
                    LineOutcome::Malformed(e) => {
                        self.malformed += 1;
                        warn!(
                            "Skipping malformed stream line ({e}): {}",
                            String::from_utf8_lossy(&line)
                        );
                    }
                }
            }

            if self.ended {
                return Ok(None);
            }

            let chunk = match self.idle_timeout {
                Some(limit) => tokio::time::timeout(limit, self.body.next())
                    .await
                    .map_err(|_| ReelClientError::Timeout(limit))?,
                None => self.body.next().await,
            };

            match chunk {
                Some(chunk) => {
                    let chunk = chunk?;
                    self.pending.extend(self.decoder.push(&chunk));
                }
                None => {
                    self.ended = true;
                    self.pending.extend(self.decoder.finish());
                }
            }
        }
    }

    /// Number of lines skipped because they were not valid events or were too long.
    pub fn malformed_lines(&self) -> usize {
        self.malformed + self.decoder.overflowed()
    }
}
