//! Incremental generation.
//!
//! [`GenerationStream`] is lazy, finite and fused. It forwards provider
//! fragments as `Token` chunks and ends with exactly one `Done` or `Error`.
//! Fallback to the secondary only happens while no token has been forwarded;
//! after that a failure ends the stream with an interrupted `Error`.

use crate::selector::Route;
use crate::session::{SessionTracker, StreamPhase, Terminal};
use async_stream::stream;
use futures::stream::{BoxStream, Stream, StreamExt};
use gateway_core::{
    CallContext, GatewayError, GatewayResult, GenerationObserver, GenerationRequest,
    GenerationResult, LLMProvider, ObserverSet, RequestId, StreamChunk,
};
use gateway_guardrail::Guardrail;
use gateway_resilience::ProviderBulkheads;
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tracing::{debug, warn};

/// Everything a stream needs once detached from the orchestrator
pub(crate) struct StreamRun {
    pub(crate) request: GenerationRequest,
    pub(crate) route: GatewayResult<Route>,
    pub(crate) guardrail: Arc<dyn Guardrail>,
    pub(crate) bulkheads: ProviderBulkheads,
    pub(crate) observers: ObserverSet,
    pub(crate) ctx: CallContext,
}

pin_project! {
    /// Chunks of one streaming generation.
    ///
    /// Dropping the stream, or calling [`GenerationStream::cancel`], before
    /// the terminal chunk closes the provider connection, releases the
    /// bulkhead slot and notifies observers of the cancellation.
    pub struct GenerationStream {
        #[pin]
        inner: BoxStream<'static, StreamChunk>,
        tracker: Arc<SessionTracker>,
        observers: ObserverSet,
        ctx: CallContext,
        finished: bool,
    }

    impl PinnedDrop for GenerationStream {
        fn drop(this: Pin<&mut Self>) {
            let this = this.project();
            if let Some(tokens) = this.tracker.cancel() {
                debug!(
                    request_id = %this.ctx.request_id,
                    tokens,
                    "Stream dropped before completion"
                );
                this.observers.on_cancelled(this.ctx, tokens);
            }
        }
    }
}

impl GenerationStream {
    pub(crate) fn start(run: StreamRun) -> Self {
        let tracker = Arc::new(SessionTracker::new());
        let observers = run.observers.clone();
        let ctx = run.ctx.clone();

        Self {
            inner: drive(run, Arc::clone(&tracker)).boxed(),
            tracker,
            observers,
            ctx,
            finished: false,
        }
    }

    /// Request this stream answers
    #[must_use]
    pub fn request_id(&self) -> &RequestId {
        &self.ctx.request_id
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> StreamPhase {
        self.tracker.phase()
    }

    /// Non-empty tokens forwarded so far
    #[must_use]
    pub fn tokens_delivered(&self) -> usize {
        self.tracker.tokens_delivered()
    }

    /// Result with guardrail-cleared text, available once `Done` was emitted
    #[must_use]
    pub fn outcome(&self) -> Option<GenerationResult> {
        self.tracker.outcome()
    }

    /// Stop the stream now. Later polls yield `None`.
    pub fn cancel(&mut self) {
        if let Some(tokens) = self.tracker.cancel() {
            debug!(request_id = %self.ctx.request_id, tokens, "Stream cancelled");
            self.observers.on_cancelled(&self.ctx, tokens);
        }
        self.inner = futures::stream::empty().boxed();
        self.finished = true;
    }
}

impl std::fmt::Debug for GenerationStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationStream")
            .field("request_id", &self.ctx.request_id)
            .field("phase", &self.tracker.phase())
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl Stream for GenerationStream {
    type Item = StreamChunk;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        if *this.finished {
            return Poll::Ready(None);
        }

        match this.inner.poll_next(cx) {
            Poll::Ready(Some(chunk)) => {
                if chunk.is_terminal() {
                    *this.finished = true;
                }
                Poll::Ready(Some(chunk))
            }
            Poll::Ready(None) => {
                *this.finished = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.finished {
            (0, Some(0))
        } else {
            (0, None)
        }
    }
}

/// End the stream with an error chunk
fn fail(
    tracker: &SessionTracker,
    observers: &ObserverSet,
    ctx: &CallContext,
    error: &GatewayError,
) -> StreamChunk {
    tracker.advance(StreamPhase::Terminal(Terminal::Error));
    observers.on_error(ctx, error);
    StreamChunk::error(error.to_string())
}

/// Open a provider stream while holding its bulkhead slot
async fn open(
    bulkheads: &ProviderBulkheads,
    provider: &Arc<dyn LLMProvider>,
    request: &GenerationRequest,
) -> GatewayResult<BoxStream<'static, GatewayResult<String>>> {
    let permit = bulkheads.acquire(provider.identity()).await?;
    let fragments = provider.stream(request).await?;
    // The slot is released when the fragment stream ends or is dropped
    Ok(fragments
        .map(move |item| {
            let _held = &permit;
            item
        })
        .boxed())
}

fn drive(run: StreamRun, tracker: Arc<SessionTracker>) -> impl Stream<Item = StreamChunk> + Send {
    let StreamRun {
        request,
        route,
        guardrail,
        bulkheads,
        observers,
        ctx,
    } = run;

    stream! {
        let route = match route {
            Ok(route) => route,
            Err(error) => {
                yield fail(&tracker, &observers, &ctx, &error);
                return;
            }
        };

        let mut provider = Arc::clone(route.primary());
        let mut fell_back = false;
        let mut raw = String::new();

        loop {
            let identity = provider.identity();
            tracker.advance(StreamPhase::Streaming(identity));

            let failure = match open(&bulkheads, &provider, &request).await {
                Err(error) => Some(error),
                Ok(mut fragments) => {
                    let mut failure = None;
                    while let Some(item) = fragments.next().await {
                        match item {
                            Ok(fragment) if fragment.is_empty() => {}
                            Ok(fragment) => {
                                tracker.record_token();
                                raw.push_str(&fragment);
                                yield StreamChunk::Token(fragment);
                            }
                            Err(error) => {
                                failure = Some(error);
                                break;
                            }
                        }
                    }
                    failure
                }
            };

            let Some(error) = failure else {
                break;
            };

            let delivered = tracker.tokens_delivered();
            if delivered > 0 {
                let interrupted = GatewayError::StreamInterrupted {
                    provider: identity,
                    message: error.to_string(),
                    tokens_delivered: delivered,
                };
                warn!(
                    request_id = %ctx.request_id,
                    provider = %identity,
                    tokens = delivered,
                    error = %error,
                    "Stream interrupted"
                );
                yield fail(&tracker, &observers, &ctx, &interrupted);
                return;
            }

            observers.on_attempt_failed(&ctx, identity, &error);
            let secondary = if fell_back || !error.is_fallback_eligible() {
                None
            } else {
                route.secondary().cloned()
            };
            let Some(secondary) = secondary else {
                yield fail(&tracker, &observers, &ctx, &error);
                return;
            };

            warn!(
                request_id = %ctx.request_id,
                from = %identity,
                to = %secondary.identity(),
                error = %error,
                "Stream failed before first token, falling back"
            );
            tracker.advance(StreamPhase::FallbackSelecting);
            observers.on_fallback(&ctx, identity, secondary.identity());
            provider = secondary;
            fell_back = true;
        }

        tracker.advance(StreamPhase::Completing);
        let verdict = guardrail.process(&raw, request.content_type());
        if let Some(reason) = &verdict.degraded {
            observers.on_guardrail_degraded(&ctx, reason.reason());
        }

        let result = GenerationResult::new(
            request.id().clone(),
            verdict.text,
            provider.identity(),
            fell_back,
        );
        let tokens = tracker.tokens_delivered();
        tracker.complete(result.clone());
        tracker.advance(StreamPhase::Terminal(Terminal::Done));
        observers.on_complete(&ctx, &result, Some(tokens));
        yield StreamChunk::Done;
    }
}
