//! C8 Reactive Fabric: a byte-chunk publisher/pull-reader pair bridging an
//! async producer (the HTTP request/response body) and the synchronous
//! codec pipeline, with bounded prefetch, a stall timeout, and cancellation
//! (spec.md §4.8, §5). See `SPEC_FULL.md` §4.8.
//!
//! The producer side is driven by an `epcis_coroutines::try_coroutine`
//! yielding chunks (see [`drive`]), mirroring the teacher's own
//! `tokio`-based consumer-task style for long-running background work; the
//! pull side is an ordinary `tokio::sync::mpsc` receiver wrapped with a
//! reactive-streams-style demand counter so a slow reader naturally
//! backpressures a fast producer instead of buffering without bound.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use epcis_coroutines::{try_coroutine, Suspend};
use futures::TryStreamExt;
use tokio::sync::{mpsc, Notify};
use tokio::time::timeout;

/// Outstanding demand the consumer grants the producer, in items. The
/// consumer reissues demand once outstanding requests drop below half this
/// window (spec.md §4.8).
pub const PREFETCH_WINDOW: i64 = 16;

/// How long [`Reader::next_chunk`] waits for the next chunk before
/// surfacing [`ReadError::Stalled`] (spec.md §4.8).
pub const DEFAULT_STALL_TIMEOUT: Duration = Duration::from_secs(5 * 60);

struct Inner {
    demand: AtomicI64,
    notify: Notify,
    cancelled: AtomicBool,
}

enum Signal<T, E> {
    Item(T),
    Complete,
    Error(E),
}

enum Terminal<E> {
    Complete,
    Error(E),
}

/// The error a caller sees trying to publish past a cancelled subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("conversion aborted by caller")]
pub struct Cancelled;

/// What [`Reader::next_chunk`] can fail with: a fabric-level stall, or the
/// producer's own error surfacing through the channel.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ReadError<E: std::fmt::Display + std::fmt::Debug> {
    #[error("upstream stalled: no chunk received within the timeout")]
    Stalled,
    #[error("upstream error: {0}")]
    Upstream(E),
}

/// The producer-facing half: publishes chunks respecting demand, or signals
/// completion/failure exactly once.
pub struct Publisher<T, E> {
    sender: mpsc::UnboundedSender<Signal<T, E>>,
    inner: Arc<Inner>,
}

impl<T, E> Publisher<T, E> {
    /// Waits for available demand, then publishes one item. Returns
    /// `Err(Cancelled)` if the reader has cancelled its subscription or
    /// dropped, in which case the caller should stop producing.
    pub async fn publish(&self, item: T) -> Result<(), Cancelled> {
        self.wait_for_demand().await?;
        self.inner.demand.fetch_sub(1, Ordering::AcqRel);
        self.sender.send(Signal::Item(item)).map_err(|_| Cancelled)
    }

    /// Signals normal end of stream. Consumes the publisher: exactly one
    /// terminal signal (`complete` or `fail`) may ever be sent.
    pub fn complete(self) {
        let _ = self.sender.send(Signal::Complete);
    }

    /// Signals that production failed with `err`. The reader will surface
    /// this exactly once via [`ReadError::Upstream`] and then treat the
    /// stream as ended.
    pub fn fail(self, err: E) {
        let _ = self.sender.send(Signal::Error(err));
    }

    async fn wait_for_demand(&self) -> Result<(), Cancelled> {
        loop {
            if self.inner.cancelled.load(Ordering::Acquire) {
                return Err(Cancelled);
            }
            if self.inner.demand.load(Ordering::Acquire) > 0 {
                return Ok(());
            }
            self.inner.notify.notified().await;
        }
    }
}

/// The consumer-facing half: a pull-style reader. Each call to
/// [`next_chunk`](Reader::next_chunk) replenishes demand before waiting, so
/// a producer blocked on `wait_for_demand` is woken well before the window
/// is actually exhausted.
pub struct Reader<T, E> {
    receiver: mpsc::UnboundedReceiver<Signal<T, E>>,
    inner: Arc<Inner>,
    terminal: Option<Terminal<E>>,
    stall_timeout: Duration,
}

impl<T, E: Clone + std::fmt::Display + std::fmt::Debug> Reader<T, E> {
    /// Pulls the next chunk, or `Ok(None)` at normal end of stream. Once a
    /// terminal signal (end or error) has been observed, every subsequent
    /// call returns that same outcome again rather than blocking on an
    /// already-closed channel.
    pub async fn next_chunk(&mut self) -> Result<Option<T>, ReadError<E>> {
        if let Some(terminal) = &self.terminal {
            return match terminal {
                Terminal::Complete => Ok(None),
                Terminal::Error(e) => Err(ReadError::Upstream(e.clone())),
            };
        }

        self.replenish_demand();

        match timeout(self.stall_timeout, self.receiver.recv()).await {
            Ok(Some(Signal::Item(item))) => Ok(Some(item)),
            Ok(Some(Signal::Complete)) | Ok(None) => {
                self.terminal = Some(Terminal::Complete);
                Ok(None)
            }
            Ok(Some(Signal::Error(err))) => {
                self.terminal = Some(Terminal::Error(err.clone()));
                Err(ReadError::Upstream(err))
            }
            Err(_elapsed) => Err(ReadError::Stalled),
        }
    }

    /// Cancels the subscription: the producer's next `publish` (or its next
    /// demand wait) observes [`Cancelled`], and any chunk still in flight is
    /// dropped along with `self` without being handed to a caller.
    pub fn cancel(self) {
        self.inner.cancelled.store(true, Ordering::Release);
        self.inner.notify.notify_waiters();
    }

    fn replenish_demand(&self) {
        let outstanding = self.inner.demand.load(Ordering::Acquire);
        if outstanding < PREFETCH_WINDOW / 2 {
            self.inner.demand.fetch_add(PREFETCH_WINDOW - outstanding, Ordering::AcqRel);
            self.inner.notify.notify_one();
        }
    }
}

/// Creates a linked publisher/reader pair with the default stall timeout.
pub fn channel<T, E>() -> (Publisher<T, E>, Reader<T, E>) {
    channel_with_timeout(DEFAULT_STALL_TIMEOUT)
}

/// Like [`channel`], with an explicit stall timeout — primarily for tests,
/// where waiting out the real five-minute default isn't practical.
pub fn channel_with_timeout<T, E>(stall_timeout: Duration) -> (Publisher<T, E>, Reader<T, E>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let inner = Arc::new(Inner {
        demand: AtomicI64::new(PREFETCH_WINDOW),
        notify: Notify::new(),
        cancelled: AtomicBool::new(false),
    });
    (Publisher { sender, inner: inner.clone() }, Reader { receiver, inner, terminal: None, stall_timeout })
}

/// Drives `produce` — a coroutine that yields byte chunks and may fail —
/// into `publisher`, respecting backpressure and cancellation. Returns once
/// the coroutine completes, fails, or the reader cancels.
#[tracing::instrument(skip_all)]
pub async fn drive<F, Fut, E>(publisher: Publisher<Bytes, E>, produce: F)
where
    F: FnOnce(Suspend<Bytes, ()>) -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    let mut stream = Box::pin(try_coroutine(produce));
    loop {
        match stream.try_next().await {
            Ok(Some(chunk)) => {
                if publisher.publish(chunk).await.is_err() {
                    tracing::debug!("reader cancelled; stopping producer");
                    return;
                }
            }
            Ok(None) => {
                publisher.complete();
                return;
            }
            Err(err) => {
                publisher.fail(err);
                return;
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn publishes_and_reads_items_in_order() {
        let (publisher, mut reader) = channel_with_timeout::<u32, String>(Duration::from_millis(200));
        tokio::spawn(async move {
            for i in 0..3u32 {
                publisher.publish(i).await.unwrap();
            }
            publisher.complete();
        });

        assert_eq!(reader.next_chunk().await.unwrap(), Some(0));
        assert_eq!(reader.next_chunk().await.unwrap(), Some(1));
        assert_eq!(reader.next_chunk().await.unwrap(), Some(2));
        assert_eq!(reader.next_chunk().await.unwrap(), None);
        // Terminal state is sticky.
        assert_eq!(reader.next_chunk().await.unwrap(), None);
    }

    #[tokio::test]
    async fn backpressure_reissues_demand_past_the_initial_window() {
        let (publisher, mut reader) = channel_with_timeout::<u32, String>(Duration::from_millis(200));
        tokio::spawn(async move {
            for i in 0..(PREFETCH_WINDOW as u32 * 3) {
                publisher.publish(i).await.unwrap();
            }
            publisher.complete();
        });

        let mut seen = Vec::new();
        while let Some(item) = reader.next_chunk().await.unwrap() {
            seen.push(item);
        }
        assert_eq!(seen.len(), PREFETCH_WINDOW as usize * 3);
        assert_eq!(seen.first(), Some(&0));
        assert_eq!(seen.last(), Some(&(PREFETCH_WINDOW as u32 * 3 - 1)));
    }

    #[tokio::test]
    async fn upstream_error_surfaces_and_then_stays_terminal() {
        let (publisher, mut reader) = channel_with_timeout::<u32, String>(Duration::from_millis(200));
        publisher.publish(7).await.unwrap();
        publisher.fail("boom".to_string());

        assert_eq!(reader.next_chunk().await.unwrap(), Some(7));
        match reader.next_chunk().await {
            Err(ReadError::Upstream(e)) => assert_eq!(e, "boom"),
            other => panic!("expected an upstream error, got {other:?}"),
        }
        match reader.next_chunk().await {
            Err(ReadError::Upstream(e)) => assert_eq!(e, "boom"),
            other => panic!("expected the same upstream error again, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn a_silent_producer_trips_the_stall_timeout() {
        let (_publisher, mut reader) = channel_with_timeout::<u32, String>(Duration::from_millis(20));
        match reader.next_chunk().await {
            Err(ReadError::Stalled) => {}
            other => panic!("expected Stalled, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancelling_the_reader_stops_further_publishes() {
        let (publisher, reader) = channel_with_timeout::<u32, String>(Duration::from_millis(200));
        reader.cancel();
        let err = publisher.publish(1).await.unwrap_err();
        assert_eq!(err, Cancelled);
    }

    #[tokio::test]
    async fn drive_feeds_coroutine_chunks_through_to_the_reader() {
        let (publisher, mut reader) = channel_with_timeout::<Bytes, String>(Duration::from_millis(200));
        tokio::spawn(drive(publisher, |mut yielder| async move {
            yielder.yield_(Bytes::from_static(b"ab")).await;
            yielder.yield_(Bytes::from_static(b"cd")).await;
            Ok::<(), String>(())
        }));

        let mut collected = Vec::new();
        while let Some(chunk) = reader.next_chunk().await.unwrap() {
            collected.extend_from_slice(&chunk);
        }
        assert_eq!(collected, b"abcd");
    }
}
