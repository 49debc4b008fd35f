//! Watch errors

use thiserror::Error;

/// Terminal conditions observed by a subscription reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WatchError {
    /// The subscription has ended: the upstream feed stopped, or a read was
    /// attempted after a terminal condition was already reported
    #[error("watch subscription closed")]
    Closed,

    /// The subscription's queue overflowed and the engine evicted it
    #[error("watch subscription evicted: consumer too slow")]
    SlowConsumer,
}
