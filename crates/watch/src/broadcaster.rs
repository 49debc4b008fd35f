//! Watch broadcast engine.
//!
//! One distribution task per [`Broadcaster`] owns the upstream queue and
//! applies events strictly in arrival order. Subscribers live in a shared
//! table so registration and release take effect immediately, without a
//! round trip through the distribution task.

use crate::error::WatchError;
use crate::event::{Event, EventType, Versioned};
use crate::DEFAULT_INCOMING_LEN;
use futures::Stream;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

/// Per-subscription predicate over the event's object.
pub type Filter<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

/// Observable state of a [`Subscription`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Still registered with the engine
    Open,
    /// Released by the engine, queued events remain to be read
    Closing,
    /// Nothing more will be delivered
    Closed,
}

enum Command<T> {
    Dispatch(Event<T>),
    Stop,
}

struct Subscriber<T> {
    resume_version: u64,
    filter: Filter<T>,
    queue: mpsc::Sender<Event<T>>,
    evicted: Arc<AtomicBool>,
}

struct State<T> {
    next_id: u64,
    subscribers: HashMap<u64, Subscriber<T>>,
    stopped: bool,
}

struct Shared<T> {
    queue_len: usize,
    state: Mutex<State<T>>,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn unregister(&self, id: u64) {
        if self.lock().subscribers.remove(&id).is_some() {
            debug!(subscription = id, "watch subscription released");
        }
    }

    fn close_all(&self) {
        let mut state = self.lock();
        state.stopped = true;
        let open = state.subscribers.len();
        // Dropping the senders lets each reader drain what is already queued.
        state.subscribers.clear();
        info!(subscriptions = open, "watch broadcaster stopped");
    }
}

impl<T: Clone + Versioned> Shared<T> {
    fn dispatch(&self, event: &Event<T>) {
        let version = event.object.resource_version();
        let mut state = self.lock();
        state.subscribers.retain(|&id, subscriber| {
            if version < subscriber.resume_version || !(subscriber.filter)(&event.object) {
                return true;
            }
            match subscriber.queue.try_send(event.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    warn!(subscription = id, resource_version = version, "evicting slow watch consumer");
                    subscriber.evicted.store(true, Ordering::SeqCst);
                    false
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(subscription = id, "watch consumer went away");
                    false
                }
            }
        });
    }
}

async fn distribute<T: Clone + Versioned>(
    shared: Arc<Shared<T>>,
    mut incoming: mpsc::Receiver<Command<T>>,
) {
    while let Some(command) = incoming.recv().await {
        match command {
            Command::Dispatch(event) => shared.dispatch(&event),
            Command::Stop => break,
        }
    }
    shared.close_all();
}

/// Fans one ordered upstream feed out to many filtered subscriptions.
///
/// Must be created inside a Tokio runtime. Dropping the broadcaster stops
/// the feed exactly like [`Broadcaster::shutdown`].
pub struct Broadcaster<T> {
    shared: Arc<Shared<T>>,
    incoming: mpsc::Sender<Command<T>>,
}

impl<T> Broadcaster<T>
where
    T: Clone + Versioned + Send + Sync + 'static,
{
    /// Creates a broadcaster whose subscriptions each buffer up to
    /// `queue_len` undelivered events.
    #[must_use]
    pub fn new(queue_len: usize) -> Self {
        Self::with_incoming_len(DEFAULT_INCOMING_LEN, queue_len)
    }

    /// Like [`Broadcaster::new`], with an explicit upstream queue length.
    #[must_use]
    pub fn with_incoming_len(incoming_len: usize, queue_len: usize) -> Self {
        let shared = Arc::new(Shared {
            queue_len: queue_len.max(1),
            state: Mutex::new(State {
                next_id: 1,
                subscribers: HashMap::new(),
                stopped: false,
            }),
        });
        let (incoming, rx) = mpsc::channel(incoming_len.max(1));
        tokio::spawn(distribute(Arc::clone(&shared), rx));
        Self { shared, incoming }
    }

    /// Publishes one upstream event.
    ///
    /// Waits only for room in the upstream queue, never for a subscriber.
    /// Fails with [`WatchError::Closed`] once the feed has stopped.
    pub async fn action(&self, kind: EventType, object: T) -> Result<(), WatchError> {
        self.incoming
            .send(Command::Dispatch(Event::new(kind, object)))
            .await
            .map_err(|_| WatchError::Closed)
    }

    /// Stops the feed. Events published before this call are still
    /// delivered, then every subscription is closed.
    pub async fn shutdown(&self) {
        if self.incoming.send(Command::Stop).await.is_err() {
            debug!("watch broadcaster already stopped");
        }
    }

    /// Registers a subscription receiving events whose object has a resource
    /// version of at least `resume_version` and passes `filter`.
    ///
    /// A `resume_version` of 0 means "from now on". No history is replayed.
    pub fn watch(&self, resume_version: u64, filter: Filter<T>) -> Subscription<T> {
        let (queue, rx) = mpsc::channel(self.shared.queue_len);
        let evicted = Arc::new(AtomicBool::new(false));

        let mut state = self.shared.lock();
        let id = state.next_id;
        state.next_id += 1;
        if state.stopped {
            debug!(subscription = id, "watch requested after stop");
        } else {
            state.subscribers.insert(
                id,
                Subscriber {
                    resume_version,
                    filter,
                    queue,
                    evicted: Arc::clone(&evicted),
                },
            );
            debug!(subscription = id, resume_version, "watch subscription registered");
        }
        drop(state);

        Subscription {
            id,
            queue: rx,
            evicted,
            terminated: false,
            engine: Arc::downgrade(&self.shared),
        }
    }

    /// Registers a subscription that receives every event.
    pub fn watch_all(&self) -> Subscription<T> {
        self.watch(0, Box::new(|_| true))
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.shared.lock().subscribers.len()
    }

    /// True once the feed has stopped and all subscriptions were closed.
    pub fn is_stopped(&self) -> bool {
        self.shared.lock().stopped
    }
}

impl<T> fmt::Debug for Broadcaster<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("Broadcaster")
            .field("queue_len", &self.shared.queue_len)
            .field("subscribers", &state.subscribers.len())
            .field("stopped", &state.stopped)
            .finish()
    }
}

/// Read handle onto one filtered stream of events.
///
/// Dropping the handle releases the subscription in the engine.
pub struct Subscription<T> {
    id: u64,
    queue: mpsc::Receiver<Event<T>>,
    evicted: Arc<AtomicBool>,
    terminated: bool,
    engine: Weak<Shared<T>>,
}

impl<T> Subscription<T> {
    /// Engine-assigned identifier, unique per broadcaster.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Waits for the next event.
    ///
    /// After the engine closes the subscription, already-queued events are
    /// still returned. The first read past them reports why the subscription
    /// ended ([`WatchError::SlowConsumer`] or [`WatchError::Closed`]); every
    /// later read fails with [`WatchError::Closed`].
    pub async fn recv(&mut self) -> Result<Event<T>, WatchError> {
        if self.terminated {
            return Err(WatchError::Closed);
        }
        match self.queue.recv().await {
            Some(event) => Ok(event),
            None => {
                self.terminated = true;
                if self.evicted.load(Ordering::SeqCst) {
                    Err(WatchError::SlowConsumer)
                } else {
                    Err(WatchError::Closed)
                }
            }
        }
    }

    /// Current lifecycle state.
    pub fn lifecycle(&self) -> Lifecycle {
        if self.terminated {
            Lifecycle::Closed
        } else if !self.queue.is_closed() {
            Lifecycle::Open
        } else if self.queue.is_empty() {
            Lifecycle::Closed
        } else {
            Lifecycle::Closing
        }
    }

    /// Turns the subscription into a stream that ends when the subscription
    /// does. Dropping the stream releases the subscription.
    pub fn into_stream(self) -> impl Stream<Item = Event<T>> + Send + 'static
    where
        T: Send + 'static,
    {
        futures::stream::unfold(self, |mut subscription| async move {
            match subscription.recv().await {
                Ok(event) => Some((event, subscription)),
                Err(reason) => {
                    debug!(subscription = subscription.id, %reason, "watch stream ended");
                    None
                }
            }
        })
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(engine) = self.engine.upgrade() {
            engine.unregister(self.id);
        }
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("lifecycle", &self.lifecycle())
            .finish()
    }
}
