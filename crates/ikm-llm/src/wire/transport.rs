//! HTTP send and cancellable SSE frame reading.

use std::fmt::Display;
use std::pin::Pin;
use std::time::Instant;

use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use super::{SseDecoder, SseFrame, WireAdapter, WireRequest};
use crate::error::LlmError;

/// Sends `request` and returns the response once its status is 2xx.
pub(crate) async fn send<A: WireAdapter>(
    adapter: &A,
    request: WireRequest,
) -> Result<reqwest::Response, LlmError> {
    let started = Instant::now();
    let response = adapter
        .http_client()
        .post(request.url)
        .headers(request.headers)
        .json(&request.body)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout {
                    elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                }
            } else {
                LlmError::Http {
                    status: e.status(),
                    message: e.to_string(),
                    retryable: e.is_connect(),
                }
            }
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(adapter.convert_error(status, &body));
    }
    Ok(response)
}

/// Reads SSE frames from a byte stream, observing a cancellation token
/// at every read boundary.
pub(crate) struct FrameReader<S> {
    inner: Pin<Box<S>>,
    decoder: SseDecoder,
    eof: bool,
}

impl<S, B, E> FrameReader<S>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    pub(crate) fn new(inner: S) -> Self {
        Self {
            inner: Box::pin(inner),
            decoder: SseDecoder::new(),
            eof: false,
        }
    }

    /// Returns the frames completed by the next chunk, `Ok(None)` once the
    /// body is exhausted, or [`LlmError::Cancelled`] if `cancel` fires first.
    pub(crate) async fn next_batch(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Option<Vec<SseFrame>>, LlmError> {
        if self.eof {
            return Ok(None);
        }
        let chunk = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(LlmError::Cancelled),
            chunk = self.inner.next() => chunk,
        };
        match chunk {
            Some(Ok(bytes)) => self.decoder.push(bytes.as_ref()).map(Some),
            Some(Err(e)) => Err(LlmError::Http {
                status: None,
                message: format!("Stream read error: {e}"),
                retryable: true,
            }),
            None => {
                self.eof = true;
                Ok(Some(self.decoder.finish().into_iter().collect()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(parts: &[&'static str]) -> impl Stream<Item = Result<&'static [u8], String>> {
        futures::stream::iter(parts.iter().map(|&p| Ok(p.as_bytes())).collect::<Vec<_>>())
    }

    #[tokio::test]
    async fn test_reads_frames_until_eof() {
        let mut reader = FrameReader::new(chunks(&["data: a\n\nda", "ta: b\n\n", "data: c"]));
        let cancel = CancellationToken::new();
        let mut all = Vec::new();
        while let Some(frames) = reader.next_batch(&cancel).await.unwrap() {
            all.extend(frames.into_iter().map(|f| f.data));
        }
        assert_eq!(all, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_cancel_wins_over_pending_read() {
        let mut reader = FrameReader::new(futures::stream::pending::<Result<Vec<u8>, String>>());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = reader.next_batch(&cancel).await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_read_error_maps_to_http() {
        let stream = futures::stream::iter(vec![Err::<Vec<u8>, _>("reset".to_owned())]);
        let mut reader = FrameReader::new(stream);
        let err = reader
            .next_batch(&CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Http { status: None, .. }));
    }
}
