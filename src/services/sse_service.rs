use std::{convert::Infallible, time::Duration, time::Instant};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::{
        matches::MatchSnapshot,
        sse::{ServerEvent, SnapshotEvent},
    },
    error::ServiceError,
    services::{match_service::publish_clock_expiry, sse_events::EVENT_SNAPSHOT},
    state::{SharedState, broadcast::Subscriber},
};

/// A viewer registered on a match topic.
pub struct MatchSubscription {
    /// Match being followed.
    pub match_id: Uuid,
    /// Identifier used to leave the topic.
    pub subscriber_id: Uuid,
    /// Queue of events for this viewer, starting with the current snapshot.
    pub receiver: mpsc::Receiver<ServerEvent>,
}

/// Subscribe to a match, queueing its current snapshot as the first event.
///
/// The snapshot is taken under the match lock, so no command can slip between
/// it and the registration. A finished or cancelled match only yields its final
/// snapshot; the stream then ends.
pub async fn subscribe_match(
    state: &SharedState,
    match_id: Uuid,
) -> Result<MatchSubscription, ServiceError> {
    let handle = state.match_handle(match_id)?;
    let mut live = handle.lock().await;
    if live.sync_clock(Instant::now()) {
        publish_clock_expiry(state, &live);
    }

    let (tx, receiver) = state.broadcaster().channel();
    let snapshot = SnapshotEvent(MatchSnapshot::from(&*live));
    match ServerEvent::json(Some(EVENT_SNAPSHOT.to_string()), &snapshot) {
        Ok(event) => {
            // A fresh queue always has room for the first event.
            let _ = tx.try_send(event);
        }
        Err(err) => warn!(%match_id, error = %err, "failed to serialize initial snapshot"),
    }

    let subscriber_id = Uuid::new_v4();
    if live.status().is_terminal() {
        debug!(%match_id, "match is over; stream carries the final snapshot only");
    } else {
        state.broadcaster().subscribe(
            match_id,
            Subscriber {
                id: subscriber_id,
                tx,
            },
        );
    }
    drop(live);

    Ok(MatchSubscription {
        match_id,
        subscriber_id,
        receiver,
    })
}

/// Convert a match subscription into an SSE response, forwarding events and
/// leaving the topic once the client disconnects.
pub fn to_sse_stream(
    state: SharedState,
    subscription: MatchSubscription,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let MatchSubscription {
        match_id,
        subscriber_id,
        mut receiver,
    } = subscription;

    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tx.closed() => break,
                payload = receiver.recv() => {
                    // The broadcaster dropped this viewer's queue.
                    let Some(payload) = payload else { break };
                    let mut event = Event::default().data(payload.data);
                    if let Some(name) = payload.event {
                        event = event.event(name);
                    }
                    if tx.send(Ok(event)).await.is_err() {
                        break;
                    }
                }
            }
        }

        state.broadcaster().unsubscribe(match_id, subscriber_id);
        info!(%match_id, %subscriber_id, "match SSE stream disconnected");
    });

    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
