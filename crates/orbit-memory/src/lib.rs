//! Reference in-memory implementations of `orbit-core`'s `Container` and
//! `Persistencer` traits: a FIFO queue, a priority queue, and a plain
//! output store. Not durable -- suitable for tests, demos, and as the
//! volatile half of a `orbit_core::composite::CompositeContainer`.

mod persistencer;
mod priority;
mod queue;
mod store;

pub use persistencer::MemoryPersistencer;
pub use priority::PriorityContainer;
pub use queue::FifoContainer;
