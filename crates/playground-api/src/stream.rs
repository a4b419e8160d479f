// Event relay: proxy the beacon's per-thread SSE feed to the client.
//
// One relay is one task for the lifetime of one stream request; relays share
// no state. The upstream read is deliberately unbounded in duration (feeds
// are long-lived), but each chunk is a cancellation point: axum drops this
// stream when the client goes away, which stops the upstream read at the
// next poll without emitting anything further.

use std::collections::VecDeque;
use std::convert::Infallible;

use axum::extract::{Path, State};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use futures::stream::{self, BoxStream, Stream};
use futures::StreamExt;
use serde_json::json;

use playground_core::{FrameBuffer, RelayFrame, DONE_SENTINEL};

use crate::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/threads/:thread_id/events/stream", get(stream_events))
        .with_state(state)
}

/// Client for the beacon event gateway. The inner reqwest client has no
/// request timeout so streams can stay open indefinitely.
#[derive(Clone)]
pub struct EventFeed {
    client: reqwest::Client,
    base_url: String,
}

impl EventFeed {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Open the raw byte stream for one thread's feed.
    async fn open(
        &self,
        thread_id: &str,
    ) -> reqwest::Result<impl Stream<Item = reqwest::Result<Bytes>>> {
        let url = format!("{}/threads/{}/events/stream", self.base_url, thread_id);
        tracing::info!(url = %url, "proxying event stream");
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes_stream())
    }
}

/// GET /api/threads/{thread_id}/events/stream
pub async fn stream_events(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    Sse::new(relay_stream(state.feed.clone(), thread_id)).keep_alive(KeepAlive::default())
}

struct RelayState {
    feed: EventFeed,
    thread_id: String,
    upstream: Option<BoxStream<'static, reqwest::Result<Bytes>>>,
    buf: FrameBuffer,
    pending: VecDeque<RelayFrame>,
    done: bool,
}

/// Forward upstream frames until the terminal sentinel, an upstream error,
/// or end of feed. Closed-connection upstream errors end the relay quietly;
/// anything else surfaces once as a terminal error frame.
fn relay_stream(
    feed: EventFeed,
    thread_id: String,
) -> impl Stream<Item = Result<SseEvent, Infallible>> {
    let initial = RelayState {
        feed,
        thread_id,
        upstream: None,
        buf: FrameBuffer::new(),
        pending: VecDeque::new(),
        done: false,
    };

    stream::unfold(initial, |mut st| async move {
        loop {
            if let Some(frame) = st.pending.pop_front() {
                let event = match frame {
                    RelayFrame::Data(payload) => SseEvent::default().data(payload),
                    RelayFrame::Done => {
                        st.done = true;
                        st.pending.clear();
                        SseEvent::default().data(DONE_SENTINEL)
                    }
                };
                return Some((Ok(event), st));
            }
            if st.done {
                return None;
            }

            if st.upstream.is_none() {
                match st.feed.open(&st.thread_id).await {
                    Ok(upstream) => st.upstream = Some(upstream.boxed()),
                    Err(e) => {
                        tracing::error!(thread_id = %st.thread_id, error = %e, "failed to open event stream");
                        st.done = true;
                        return Some((Ok(error_frame(&e)), st));
                    }
                }
            }
            let Some(upstream) = st.upstream.as_mut() else {
                continue;
            };

            match upstream.next().await {
                Some(Ok(chunk)) => st.pending.extend(st.buf.push(&chunk)),
                Some(Err(e)) if is_disconnect(&e) => {
                    tracing::warn!(thread_id = %st.thread_id, "event stream connection closed");
                    st.done = true;
                }
                Some(Err(e)) => {
                    tracing::error!(thread_id = %st.thread_id, error = %e, "event stream failed");
                    st.done = true;
                    return Some((Ok(error_frame(&e)), st));
                }
                // upstream ended without a sentinel; nothing more to forward
                None => st.done = true,
            }
        }
    })
}

/// Remote hung up mid-stream. Expected for abandoned threads, not an error
/// worth showing the client.
fn is_disconnect(err: &reqwest::Error) -> bool {
    err.is_body() || err.is_connect()
}

fn error_frame(err: &reqwest::Error) -> SseEvent {
    SseEvent::default().data(json!({ "error": err.to_string() }).to_string())
}
