pub mod ids;
pub mod types;
pub mod wire;

pub use ids::{CommandId, ItemId};
pub use types::{
    CommandProgress, CommandState, CountedItems, ItemSort, ItemType, QueueState, QueueType,
    SortIndex,
};
pub use wire::{
    ClientMsg, ClientPayload, Credentials, Endpoint, FunctionReply, RemoteError, ServerMsg,
    WireRequest, MSG_AUTHENTICATED, MSG_AUTH_REQUIRED,
};
