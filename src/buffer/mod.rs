//! Per-group message buffering

pub mod ring;
pub mod snapshot;
pub mod store;

pub use ring::{AddOutcome, RingBuffer};
pub use snapshot::Snapshot;
pub use store::{GroupCounters, GroupStore};
