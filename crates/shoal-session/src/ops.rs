//! Typed catalog of remote operations.
//!
//! The uniform call protocol is shape-agnostic: every operation is one
//! wire request and one reply payload. Each catalog entry supplies the
//! wire function name, whether the result may be cached, and the
//! validating decode of the payload into its typed form.

use std::collections::BTreeMap;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use shoal_core::{
    CommandId, CommandProgress, CommandState, CountedItems, ItemId, ItemSort, ItemType,
    QueueState, QueueType, SortIndex, WireRequest,
};

use crate::error::SessionError;

/// Dotted path selecting a field of a server item.
pub type FieldPath = String;

/// One entry of the remote operation catalog.
pub trait Operation: Serialize {
    /// Decoded result payload.
    type Output;

    /// Remote function name.
    const NAME: &'static str;

    /// Pure reads may be served from, and populate, the response cache.
    const CACHEABLE: bool = false;

    /// Validates and decodes the untyped reply payload.
    fn decode(value: Value) -> Result<Self::Output, SessionError>;

    /// Builds the wire request for this call.
    fn request(&self) -> WireRequest {
        WireRequest::new(Self::NAME, to_args(self))
    }
}

fn to_args<T: Serialize + ?Sized>(value: &T) -> Map<String, Value> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

fn decode_payload<T: DeserializeOwned>(
    op: &'static str,
    value: Value,
) -> Result<T, SessionError> {
    serde_json::from_value(value).map_err(|err| SessionError::Decode {
        op,
        reason: err.to_string(),
    })
}

/// Profile rendering options for thumbnail-producing operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileOptions {
    /// Requested (width, height).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<(u32, u32)>,
    /// Return a URI instead of raw profile data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<bool>,
}

/// Metatag filters accepted by library queries.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetaTags {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorite: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inbox: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trash: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readlater: Option<bool>,
}

/// Fetch a single item by id.
#[derive(Debug, Clone, Serialize)]
pub struct GetItem {
    pub item_type: ItemType,
    pub item_id: ItemId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldPath>>,
}

impl Operation for GetItem {
    type Output = Value;
    const NAME: &'static str = "get_item";
    const CACHEABLE: bool = true;

    fn decode(value: Value) -> Result<Self::Output, SessionError> {
        Ok(value)
    }
}

/// Fetch a window of items of one type.
#[derive(Debug, Clone, Serialize)]
pub struct GetItems {
    pub item_type: ItemType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldPath>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

impl Operation for GetItems {
    type Output = CountedItems;
    const NAME: &'static str = "get_items";
    const CACHEABLE: bool = true;

    fn decode(value: Value) -> Result<Self::Output, SessionError> {
        decode_payload(Self::NAME, value)
    }
}

/// Fetch items related to a given item.
#[derive(Debug, Clone, Serialize)]
pub struct GetRelatedItems {
    pub item_type: ItemType,
    pub item_id: ItemId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_type: Option<ItemType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldPath>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

impl Operation for GetRelatedItems {
    type Output = CountedItems;
    const NAME: &'static str = "get_related_items";
    const CACHEABLE: bool = true;

    fn decode(value: Value) -> Result<Self::Output, SessionError> {
        decode_payload(Self::NAME, value)
    }
}

/// Fetch a window of pages around a position in a gallery.
#[derive(Debug, Clone, Serialize)]
pub struct GetPages {
    pub gallery_id: ItemId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldPath>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_options: Option<ProfileOptions>,
}

impl Operation for GetPages {
    type Output = CountedItems;
    const NAME: &'static str = "get_pages";
    const CACHEABLE: bool = true;

    fn decode(value: Value) -> Result<Self::Output, SessionError> {
        decode_payload(Self::NAME, value)
    }
}

/// Fetch profile (thumbnail) handles for a set of items.
#[derive(Debug, Clone, Serialize)]
pub struct GetProfile {
    pub item_type: ItemType,
    pub item_ids: Vec<ItemId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_options: Option<ProfileOptions>,
}

impl Operation for GetProfile {
    type Output = BTreeMap<ItemId, Value>;
    const NAME: &'static str = "get_profile";
    const CACHEABLE: bool = true;

    fn decode(value: Value) -> Result<Self::Output, SessionError> {
        decode_payload(Self::NAME, value)
    }
}

/// Query the library view with filters, sorting and pagination.
#[derive(Debug, Clone, Serialize)]
pub struct LibraryView {
    pub item_type: ItemType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldPath>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metatags: Option<MetaTags>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<ItemSort>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_desc: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_query: Option<String>,
}

impl Operation for LibraryView {
    type Output = CountedItems;
    const NAME: &'static str = "library_view";
    const CACHEABLE: bool = true;

    fn decode(value: Value) -> Result<Self::Output, SessionError> {
        decode_payload(Self::NAME, value)
    }
}

/// Fetch the sort-index catalog.
#[derive(Debug, Clone, Serialize)]
pub struct GetSortIndexes {
    pub item_type: ItemType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translate: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

impl Operation for GetSortIndexes {
    type Output = Vec<SortIndex>;
    const NAME: &'static str = "get_sort_indexes";
    const CACHEABLE: bool = true;

    fn decode(value: Value) -> Result<Self::Output, SessionError> {
        decode_payload(Self::NAME, value)
    }
}

/// Start a set of server commands.
#[derive(Debug, Clone, Serialize)]
pub struct StartCommand {
    pub command_ids: Vec<CommandId>,
}

impl Operation for StartCommand {
    type Output = BTreeMap<CommandId, CommandState>;
    const NAME: &'static str = "start_command";

    fn decode(value: Value) -> Result<Self::Output, SessionError> {
        decode_payload(Self::NAME, value)
    }
}

/// Stop a set of server commands.
#[derive(Debug, Clone, Serialize)]
pub struct StopCommand {
    pub command_ids: Vec<CommandId>,
}

impl Operation for StopCommand {
    type Output = BTreeMap<CommandId, CommandState>;
    const NAME: &'static str = "stop_command";

    fn decode(value: Value) -> Result<Self::Output, SessionError> {
        decode_payload(Self::NAME, value)
    }
}

/// Query the lifecycle state of a set of commands.
#[derive(Debug, Clone, Serialize)]
pub struct GetCommandState {
    pub command_ids: Vec<CommandId>,
}

impl Operation for GetCommandState {
    type Output = BTreeMap<CommandId, CommandState>;
    const NAME: &'static str = "get_command_state";

    fn decode(value: Value) -> Result<Self::Output, SessionError> {
        decode_payload(Self::NAME, value)
    }
}

/// Fetch the result value of a set of finished commands.
#[derive(Debug, Clone, Serialize)]
pub struct GetCommandValue {
    pub command_ids: Vec<CommandId>,
}

impl Operation for GetCommandValue {
    type Output = BTreeMap<CommandId, Value>;
    const NAME: &'static str = "get_command_value";

    fn decode(value: Value) -> Result<Self::Output, SessionError> {
        decode_payload(Self::NAME, value)
    }
}

/// Query progress of a set of commands.
#[derive(Debug, Clone, Serialize)]
pub struct GetCommandProgress {
    pub command_ids: Vec<CommandId>,
}

impl Operation for GetCommandProgress {
    type Output = BTreeMap<CommandId, CommandProgress>;
    const NAME: &'static str = "get_command_progress";

    fn decode(value: Value) -> Result<Self::Output, SessionError> {
        decode_payload(Self::NAME, value)
    }
}

/// Query the aggregate state of one queue. Deliberately uncacheable:
/// this is the operation the adaptive poller observes.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct GetQueueState {
    pub queue_type: QueueType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_finished: Option<bool>,
}

impl Operation for GetQueueState {
    type Output = QueueState;
    const NAME: &'static str = "get_queue_state";

    fn decode(value: Value) -> Result<Self::Output, SessionError> {
        decode_payload(Self::NAME, value)
    }
}

/// List the entries of one queue.
#[derive(Debug, Clone, Serialize)]
pub struct GetQueueItems {
    pub queue_type: QueueType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_finished: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_queued: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_active: Option<bool>,
}

impl Operation for GetQueueItems {
    type Output = CountedItems;
    const NAME: &'static str = "get_queue_items";

    fn decode(value: Value) -> Result<Self::Output, SessionError> {
        decode_payload(Self::NAME, value)
    }
}
