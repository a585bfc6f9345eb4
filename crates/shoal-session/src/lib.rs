//! Client session layer: typed operation catalog, call batching,
//! response caching and adaptive queue polling on top of `shoal-wire`.

mod error;

pub mod batch;
pub mod cache;
pub mod ops;
pub mod poller;
pub mod session;

pub use batch::{CallHandle, GroupCall};
pub use cache::ResponseCache;
pub use error::SessionError;
pub use poller::{PollerConfig, QueueMonitor, QueueObservation, QueuePoller, QueueTotals};
pub use session::{ConnectionState, Session, SessionConfig, Status};
