//! Bulk forwarding of a channel's history.
//!
//! A `/forward` command launches one detached routine that copies every
//! message from the source channel into the target channel.

mod registry;
mod runner;

pub use registry::{ForwardRegistry, ForwardTask, SpawnError};
pub use runner::{run_bulk_forward, ForwardReport};

#[cfg(test)]
pub(crate) use registry::tests::wait_idle;
#[cfg(test)]
pub(crate) use runner::tests::{FakeGateway, RecordingReply};
