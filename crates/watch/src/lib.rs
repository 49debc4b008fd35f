//! Watch primitives and broadcast engine
//!
//! A [`Broadcaster`] takes a single, ordered upstream feed of [`Event`]s and
//! fans it out to any number of [`Subscription`]s. Each subscription carries
//! its own filter, resume version and bounded queue:
//!
//! - upstream events are applied one at a time, so every subscription sees
//!   the same global order
//! - queue writes never block; a subscription whose queue is full is evicted
//!   with [`WatchError::SlowConsumer`] and the others carry on
//! - stopping the feed closes every subscription after its queued events
//!   are drained
//! - dropping a [`Subscription`] unregisters it immediately

mod broadcaster;
mod error;
mod event;

pub use broadcaster::{Broadcaster, Filter, Lifecycle, Subscription};
pub use error::WatchError;
pub use event::{Event, EventType, Versioned};

/// Default length of the broadcaster's upstream queue.
pub const DEFAULT_INCOMING_LEN: usize = 100;
