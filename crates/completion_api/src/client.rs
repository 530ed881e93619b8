use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use cas_auth::endpoints::CHAT_COMPLETIONS_PATH;
use cas_auth::{endpoint, SessionManager};
use chat_contract::{
    ChatLogRecorder, CompletionRequest, NoopChatLog, PartialResultSink, PartialUpdate,
    StreamStatus,
};
use futures_util::StreamExt;
use reqwest::{Client, Proxy, RequestBuilder, Response, StatusCode};
use session_store::Session;
use tokio::time::{timeout, Instant};

use crate::config::CompletionConfig;
use crate::error::{parse_error_message, CompletionError};
use crate::events::{CompletionBody, StreamChunk};
use crate::headers::build_headers;
use crate::payload::build_payload;
use crate::retry::{RetryBudgets, RetryState};
use crate::sse::LineStreamParser;

/// How a successful stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// `data: [DONE]` arrived.
    Sentinel,
    /// The body closed without the sentinel after some text arrived,
    /// or the request was not streamed at all.
    EndOfStream,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOutcome {
    pub text: String,
    pub terminated_by: Termination,
}

/// Completion client bound to a shared gateway session.
pub struct StreamingCompletionClient {
    http: Client,
    config: CompletionConfig,
    sessions: Arc<SessionManager>,
    chat_log: Arc<dyn ChatLogRecorder>,
}

impl std::fmt::Debug for StreamingCompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingCompletionClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl StreamingCompletionClient {
    pub fn new(
        config: CompletionConfig,
        sessions: Arc<SessionManager>,
    ) -> Result<Self, CompletionError> {
        let mut builder = Client::builder();
        if let Some(proxy) = &config.proxy {
            let proxy = Proxy::all(proxy).map_err(|source| CompletionError::InvalidProxy {
                url: proxy.clone(),
                source,
            })?;
            builder = builder.proxy(proxy);
        }
        let http = builder.build().map_err(CompletionError::Client)?;

        Ok(Self {
            http,
            config,
            sessions,
            chat_log: Arc::new(NoopChatLog),
        })
    }

    pub fn with_chat_log(mut self, chat_log: Arc<dyn ChatLogRecorder>) -> Self {
        self.chat_log = chat_log;
        self
    }

    pub fn config(&self) -> &CompletionConfig {
        &self.config
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn endpoint(&self) -> String {
        endpoint(&self.config.base_url, CHAT_COMPLETIONS_PATH)
    }

    fn budgets(&self) -> RetryBudgets {
        RetryBudgets {
            auth: self.config.auth_retries,
            transport: self.config.max_transport_retries,
        }
    }

    pub fn build_request(
        &self,
        request: &CompletionRequest,
        session: &Session,
        stream: bool,
    ) -> Result<RequestBuilder, CompletionError> {
        let headers = build_headers(&self.config, session, request.api_key(), stream)?;
        let payload = build_payload(request, stream);
        Ok(self.http.post(self.endpoint()).headers(headers).json(&payload))
    }

    /// Sends the request until it is answered with HTTP 200.
    ///
    /// A 401/403 invalidates the shared session, fetches a fresh one, and
    /// retries within the auth budget. A timed-out attempt is retried within
    /// the transport budget. Any other status is terminal.
    pub async fn send_with_retry(
        &self,
        request: &CompletionRequest,
        stream: bool,
    ) -> Result<Response, CompletionError> {
        let budgets = self.budgets();
        let mut state = RetryState::default();
        let mut session = self.sessions.get_session().await;

        loop {
            let sent = timeout(
                self.config.read_timeout,
                self.build_request(request, &session, stream)?.send(),
            )
            .await;

            let response = match sent {
                Ok(Ok(response)) => response,
                Ok(Err(error)) if !error.is_timeout() => {
                    return Err(CompletionError::Request(error));
                }
                Ok(Err(_)) | Err(_) => {
                    if state.record_timeout(budgets) {
                        tracing::warn!(
                            attempt = state.timeouts(),
                            max_retries = budgets.transport,
                            "completion request timed out, retrying"
                        );
                        continue;
                    }
                    tracing::error!(attempts = state.timeouts(), "completion request timed out");
                    return Err(CompletionError::TransportTimeout {
                        attempts: state.timeouts(),
                    });
                }
            };

            let status = response.status();
            if status == StatusCode::OK {
                return Ok(response);
            }

            let body = self.error_body(response).await;
            if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
                if state.record_auth_failure(budgets) {
                    tracing::warn!(
                        %status,
                        attempt = state.auth_retries(),
                        max_retries = budgets.auth,
                        "completion request rejected, refreshing session"
                    );
                    self.sessions.force_invalidate(&session).await;
                    session = self.sessions.get_session().await;
                    continue;
                }
                tracing::error!(%status, "completion request still rejected after re-authentication");
                return Err(CompletionError::AuthenticationFailed { status, body });
            }

            tracing::error!(
                %status,
                message = %parse_error_message(status, &body),
                "completion request failed"
            );
            return Err(CompletionError::Protocol { status, body });
        }
    }

    /// Non-streaming call returning `choices[0].message.content`.
    pub async fn predict_blocking(
        &self,
        request: &CompletionRequest,
    ) -> Result<String, CompletionError> {
        let text = self.fetch_whole(request).await?;
        self.chat_log.record(request.model(), request.input(), &text);
        Ok(text)
    }

    /// Streams the reply into `sink`, one notification per text delta.
    ///
    /// `sink` sees a `Waiting` notification first, `Streaming` snapshots of
    /// the accumulated text, and a final `Finished` snapshot on success. A
    /// request built with `stream(false)` is answered with a single `Finished`
    /// notification. A sink that returns `Break` cancels the call.
    pub async fn predict_streaming<S>(
        &self,
        request: &CompletionRequest,
        sink: &mut S,
    ) -> Result<StreamOutcome, CompletionError>
    where
        S: PartialResultSink + ?Sized,
    {
        notify(sink, "", StreamStatus::Waiting)?;

        let outcome = if request.stream() {
            self.consume_stream(request, sink).await?
        } else {
            StreamOutcome {
                text: self.fetch_whole(request).await?,
                terminated_by: Termination::EndOfStream,
            }
        };

        notify(sink, &outcome.text, StreamStatus::Finished)?;
        self.chat_log
            .record(request.model(), request.input(), &outcome.text);
        Ok(outcome)
    }

    async fn fetch_whole(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let response = self.send_with_retry(request, false).await?;
        let body = match timeout(self.config.read_timeout, response.text()).await {
            Ok(Ok(body)) => body,
            Ok(Err(error)) if !error.is_timeout() => return Err(CompletionError::Request(error)),
            Ok(Err(_)) | Err(_) => return Err(CompletionError::TransportTimeout { attempts: 1 }),
        };

        let parsed: CompletionBody = serde_json::from_str(&body)
            .map_err(|error| CompletionError::MalformedResponse(error.to_string()))?;
        parsed.into_content().ok_or_else(|| {
            CompletionError::MalformedResponse("missing choices[0].message.content".to_string())
        })
    }

    async fn consume_stream<S>(
        &self,
        request: &CompletionRequest,
        sink: &mut S,
    ) -> Result<StreamOutcome, CompletionError>
    where
        S: PartialResultSink + ?Sized,
    {
        let response = self.send_with_retry(request, true).await?;
        let mut body = response.bytes_stream();
        let mut parser = LineStreamParser::default();
        let mut accumulator = StreamAccumulator::new(self.config.min_refresh_interval);

        loop {
            let next = match timeout(self.config.read_timeout, body.next()).await {
                Ok(next) => next,
                Err(_) => {
                    tracing::error!(
                        received = accumulator.text.len(),
                        "completion stream stalled"
                    );
                    return Err(CompletionError::TransportTimeout { attempts: 1 });
                }
            };
            let Some(bytes) = next else {
                break;
            };
            let bytes = bytes.map_err(|error| {
                if error.is_timeout() {
                    CompletionError::TransportTimeout { attempts: 1 }
                } else {
                    CompletionError::Request(error)
                }
            })?;

            for chunk in parser.feed(&bytes) {
                if accumulator.apply(chunk, sink)?.is_break() {
                    return Ok(accumulator.finish(Termination::Sentinel));
                }
            }
        }

        if let Some(chunk) = parser.finish() {
            if accumulator.apply(chunk, sink)?.is_break() {
                return Ok(accumulator.finish(Termination::Sentinel));
            }
        }

        if accumulator.text.trim().is_empty() {
            tracing::warn!("completion stream ended without content");
            return Err(CompletionError::EmptyResponse);
        }
        tracing::debug!("completion stream ended without the done sentinel");
        Ok(accumulator.finish(Termination::EndOfStream))
    }

    async fn error_body(&self, response: Response) -> String {
        timeout(self.config.read_timeout, response.text())
            .await
            .ok()
            .and_then(Result::ok)
            .unwrap_or_default()
    }
}

/// Accumulated text plus notification throttling for one stream.
struct StreamAccumulator {
    text: String,
    min_interval: Duration,
    last_push: Option<Instant>,
}

impl StreamAccumulator {
    fn new(min_interval: Duration) -> Self {
        Self {
            text: String::new(),
            min_interval,
            last_push: None,
        }
    }

    /// `Break` once the done sentinel has been seen.
    fn apply<S>(
        &mut self,
        chunk: StreamChunk,
        sink: &mut S,
    ) -> Result<ControlFlow<()>, CompletionError>
    where
        S: PartialResultSink + ?Sized,
    {
        match chunk {
            StreamChunk::Done => return Ok(ControlFlow::Break(())),
            StreamChunk::Delta(delta) => {
                self.text.push_str(&delta);
                if self.due() {
                    self.last_push = Some(Instant::now());
                    notify(sink, &self.text, StreamStatus::Streaming)?;
                }
            }
            StreamChunk::Malformed(payload) => {
                tracing::debug!(%payload, "skipping malformed stream chunk");
            }
            StreamChunk::Heartbeat | StreamChunk::Ignored => {}
        }
        Ok(ControlFlow::Continue(()))
    }

    fn due(&self) -> bool {
        self.min_interval.is_zero()
            || self
                .last_push
                .map_or(true, |last| last.elapsed() >= self.min_interval)
    }

    fn finish(self, terminated_by: Termination) -> StreamOutcome {
        StreamOutcome {
            text: self.text,
            terminated_by,
        }
    }
}

fn notify<S>(sink: &mut S, text: &str, status: StreamStatus) -> Result<(), CompletionError>
where
    S: PartialResultSink + ?Sized,
{
    match sink.push(PartialUpdate { text, status }) {
        ControlFlow::Continue(()) => Ok(()),
        ControlFlow::Break(()) => {
            tracing::info!(%status, "partial-result sink closed, cancelling completion");
            Err(CompletionError::Cancelled)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(text: &str) -> StreamChunk {
        StreamChunk::Delta(text.to_string())
    }

    #[test]
    fn accumulator_pushes_every_delta_in_order_when_unthrottled() {
        let mut seen = Vec::new();
        let mut sink = |update: PartialUpdate<'_>| {
            seen.push(update.to_owned_result());
            ControlFlow::Continue(())
        };
        let mut accumulator = StreamAccumulator::new(Duration::ZERO);

        for chunk in [delta("A"), StreamChunk::Heartbeat, delta("B")] {
            assert!(accumulator
                .apply(chunk, &mut sink)
                .expect("apply")
                .is_continue());
        }
        assert!(accumulator
            .apply(StreamChunk::Done, &mut sink)
            .expect("apply")
            .is_break());

        let texts: Vec<_> = seen.iter().map(|update| update.text.as_str()).collect();
        assert_eq!(texts, ["A", "AB"]);
        assert!(seen
            .iter()
            .all(|update| update.status == StreamStatus::Streaming));
        assert_eq!(accumulator.finish(Termination::Sentinel).text, "AB");
    }

    #[test]
    fn accumulator_throttles_notifications_but_keeps_text() {
        let mut pushes = 0;
        let mut sink = |_: PartialUpdate<'_>| {
            pushes += 1;
            ControlFlow::Continue(())
        };
        let mut accumulator = StreamAccumulator::new(Duration::from_secs(3600));

        for text in ["a", "b", "c"] {
            accumulator.apply(delta(text), &mut sink).expect("apply");
        }

        assert_eq!(pushes, 1);
        assert_eq!(accumulator.text, "abc");
    }

    #[test]
    fn malformed_chunks_are_skipped() {
        let mut sink = |_: PartialUpdate<'_>| ControlFlow::Continue(());
        let mut accumulator = StreamAccumulator::new(Duration::ZERO);

        accumulator.apply(delta("A"), &mut sink).expect("apply");
        accumulator
            .apply(StreamChunk::Malformed("{oops".to_string()), &mut sink)
            .expect("malformed chunk is not an error");
        accumulator.apply(delta("B"), &mut sink).expect("apply");

        assert_eq!(accumulator.text, "AB");
    }

    #[test]
    fn closed_sink_cancels() {
        let mut sink = |_: PartialUpdate<'_>| ControlFlow::Break(());
        let mut accumulator = StreamAccumulator::new(Duration::ZERO);

        assert!(matches!(
            accumulator.apply(delta("A"), &mut sink),
            Err(CompletionError::Cancelled)
        ));
    }
}
