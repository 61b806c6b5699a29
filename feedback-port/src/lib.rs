//! Local message ports.
//!
//! A port is a named Unix domain socket under a shared runtime directory,
//! namespaced by application id. Peers exchange [`Envelope`]s, each carrying
//! one [`Bundle`](feedback_core::Bundle). Delivery is best effort: a send to
//! a port nobody is listening on is dropped.

mod frame;
pub use frame::*;
mod port;
pub use port::*;
mod remote;
pub use remote::*;

pub use tokio_util::sync::CancellationToken;
