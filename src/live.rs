//! Live channel: one server-sent event stream per connected display
//!
//! A [`LiveChannel`] subscribes to the [`Publisher`] when it is opened and
//! yields [`Frame`]s: a data frame for the newest published snapshot (the
//! latest one first) and a comment frame whenever the keep-alive interval
//! passes. Each channel holds a single pending snapshot, so a display that
//! reads slowly skips intermediate states and still ends on the latest one.
//! Closing or dropping the channel cancels the keep-alive timer and removes
//! the subscription.

use std::{
    fmt,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};

use futures::{FutureExt, Stream, future::BoxFuture};
use tokio::{
    sync::watch,
    time::{Instant, Interval, MissedTickBehavior, interval_at},
};
use tracing::debug;

use crate::{
    Snapshot,
    constants::live::KEEP_ALIVE_COMMENT,
    publisher::{Publisher, Sink, SinkError, Subscription},
};

/// A single server-sent event frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A serialized snapshot
    Data(String),
    /// A comment that keeps idle connections open; carries no data
    KeepAlive,
}

impl Frame {
    /// Creates a data frame carrying a snapshot
    pub fn snapshot(snapshot: &Snapshot) -> Self {
        Self::Data(snapshot.to_message())
    }

    /// Encodes the frame as event-stream text
    ///
    /// Data frames become `data: <payload>\n\n`, with one `data:` line per
    /// payload line. Keep-alive frames become `: keepalive\n\n`.
    pub fn encode(&self) -> String {
        match self {
            Self::Data(payload) => {
                let mut encoded = String::with_capacity(payload.len() + 8);
                for line in payload.split('\n') {
                    encoded.push_str("data: ");
                    encoded.push_str(line);
                    encoded.push('\n');
                }
                encoded.push('\n');
                encoded
            }
            Self::KeepAlive => format!(": {KEEP_ALIVE_COMMENT}\n\n"),
        }
    }
}

type Slot = Option<Arc<Snapshot>>;

/// Replaces the pending snapshot of one channel
struct ChannelSink(watch::Sender<Slot>);

impl Sink for ChannelSink {
    fn deliver(&self, snapshot: &Arc<Snapshot>) -> Result<(), SinkError> {
        if self.0.is_closed() {
            return Err(SinkError::Closed);
        }
        self.0.send_replace(Some(Arc::clone(snapshot)));
        Ok(())
    }
}

/// Resolves once the slot holds a snapshot the channel has not sent yet
///
/// The receiver is handed back so the next wait can reuse it.
type Changed = BoxFuture<'static, (Result<(), watch::error::RecvError>, watch::Receiver<Slot>)>;

fn changed(mut updates: watch::Receiver<Slot>) -> Changed {
    async move {
        let result = updates.changed().await;
        (result, updates)
    }
    .boxed()
}

/// The push stream of a single display
///
/// Implements [`Stream`]; the stream ends once the channel is closed.
pub struct LiveChannel {
    /// Wait for the next snapshot; `None` once closed
    updates: Option<Changed>,
    /// Keep-alive timer; `None` once closed
    keep_alive: Option<Interval>,
    /// Registration with the publisher; `None` once closed
    subscription: Option<Subscription>,
}

impl fmt::Debug for LiveChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveChannel")
            .field("subscription", &self.subscription)
            .finish_non_exhaustive()
    }
}

impl LiveChannel {
    /// Opens a channel on a publisher
    ///
    /// The latest snapshot, if any, is pending as the first frame. The first
    /// keep-alive is due one full period after opening.
    ///
    /// # Arguments
    ///
    /// * `publisher` - The publisher to subscribe to
    /// * `keep_alive` - Interval between keep-alive frames
    pub fn open(publisher: &Arc<Publisher>, keep_alive: Duration) -> Self {
        let (tx, updates) = watch::channel(None);
        let subscription = publisher.subscribe(ChannelSink(tx));

        let period = keep_alive.max(Duration::from_millis(1));
        let mut keep_alive = interval_at(Instant::now() + period, period);
        keep_alive.set_missed_tick_behavior(MissedTickBehavior::Delay);

        debug!(subscription = %subscription.id(), "live channel opened");
        Self {
            updates: Some(changed(updates)),
            keep_alive: Some(keep_alive),
            subscription: Some(subscription),
        }
    }

    /// Returns `true` once the channel has been closed
    pub fn is_closed(&self) -> bool {
        self.subscription.is_none()
    }

    /// Stops the keep-alive timer and unsubscribes
    ///
    /// Closing an already closed channel does nothing.
    pub fn close(&mut self) {
        self.keep_alive = None;
        self.updates = None;
        if let Some(mut subscription) = self.subscription.take() {
            subscription.unsubscribe();
            debug!(subscription = %subscription.id(), "live channel closed");
        }
    }

    /// Polls for a snapshot not yet sent on this channel
    fn poll_update(&mut self, cx: &mut Context<'_>) -> Poll<Option<Arc<Snapshot>>> {
        while let Some(waiting) = self.updates.as_mut() {
            let (result, mut updates) = match waiting.poll_unpin(cx) {
                Poll::Ready(ready) => ready,
                Poll::Pending => return Poll::Pending,
            };
            if result.is_err() {
                return Poll::Ready(None);
            }

            let latest = updates.borrow_and_update().clone();
            self.updates = Some(changed(updates));
            if let Some(snapshot) = latest {
                return Poll::Ready(Some(snapshot));
            }
        }
        Poll::Ready(None)
    }
}

impl Stream for LiveChannel {
    type Item = Frame;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.is_closed() {
            return Poll::Ready(None);
        }

        match this.poll_update(cx) {
            Poll::Ready(Some(snapshot)) => return Poll::Ready(Some(Frame::snapshot(&snapshot))),
            Poll::Ready(None) => {
                this.close();
                return Poll::Ready(None);
            }
            Poll::Pending => {}
        }

        match this.keep_alive.as_mut().map(|timer| timer.poll_tick(cx)) {
            Some(Poll::Ready(_)) => Poll::Ready(Some(Frame::KeepAlive)),
            _ => Poll::Pending,
        }
    }
}

impl Drop for LiveChannel {
    fn drop(&mut self) {
        self.close();
    }
}
