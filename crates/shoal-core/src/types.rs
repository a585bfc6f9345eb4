use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Declares an enum that crosses the wire as a plain integer.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $value:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(into = "u32", try_from = "u32")]
        #[repr(u32)]
        pub enum $name {
            $($(#[$vmeta])* $variant = $value),+
        }

        impl From<$name> for u32 {
            fn from(value: $name) -> u32 {
                value as u32
            }
        }

        impl TryFrom<u32> for $name {
            type Error = String;

            fn try_from(value: u32) -> Result<Self, String> {
                match value {
                    $($value => Ok($name::$variant),)+
                    other => Err(format!(
                        concat!("unknown ", stringify!($name), " discriminant: {}"),
                        other
                    )),
                }
            }
        }
    };
}

wire_enum! {
    /// Kind of database item an operation targets.
    ItemType {
        /// A gallery of pages.
        Gallery = 1,
        /// A collection of galleries.
        Collection = 2,
        /// A grouping of gallery versions.
        Grouping = 3,
        /// An artist record.
        Artist = 4,
        /// A single page inside a gallery.
        Page = 5,
    }
}

wire_enum! {
    /// Named class of server-side commands whose aggregate state is polled.
    QueueType {
        /// Metadata extraction queue.
        Metadata = 1,
        /// Download queue.
        Download = 2,
    }
}

wire_enum! {
    /// Lifecycle state of an asynchronous server command.
    CommandState {
        /// Queued, not yet picked up.
        InQueue = 1,
        /// Picked up by a worker.
        InService = 2,
        /// Actively running.
        Started = 3,
        /// Completed successfully.
        Finished = 4,
        /// Stopped on request.
        Stopped = 5,
        /// Terminated with an error.
        Failed = 6,
    }
}

wire_enum! {
    /// Sort orders accepted by library queries.
    ItemSort {
        /// Random gallery order.
        GalleryRandom = 1,
        /// Order by gallery title.
        GalleryTitle = 2,
        /// Order by publication date.
        GalleryDate = 3,
        /// Order by last read time.
        GalleryRead = 4,
    }
}

impl QueueType {
    /// Human-readable queue name for logs and CLI output.
    pub fn as_str(self) -> &'static str {
        match self {
            QueueType::Metadata => "metadata",
            QueueType::Download => "download",
        }
    }
}

/// Paginated result slice shared by list-returning operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountedItems {
    /// Total number of matching items on the server.
    pub count: u64,
    /// The requested window of raw item objects.
    #[serde(default)]
    pub items: Vec<Value>,
}

/// One entry of the sort-index catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortIndex {
    /// Sort index discriminant.
    pub index: u32,
    /// Display name, possibly translated.
    pub name: String,
    /// Item type the index applies to.
    #[serde(default)]
    pub item_type: Option<ItemType>,
}

/// Progress snapshot of one asynchronous command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandProgress {
    /// Short progress description.
    #[serde(default)]
    pub text: String,
    /// Work completed so far.
    #[serde(default)]
    pub value: f64,
    /// Total amount of work, when known.
    #[serde(default)]
    pub max: f64,
    /// Completion percentage in `0.0..=100.0`.
    #[serde(default)]
    pub percent: f64,
    /// Lifecycle state at sample time.
    #[serde(default)]
    pub state: Option<CommandState>,
}

/// Aggregate state of one server queue, as reported by the queue-state
/// operation and consumed by the adaptive poller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueueState {
    /// Whether the queue worker is currently running.
    pub running: bool,
    /// Number of pending entries.
    pub size: u64,
    /// Completion percentage of the active entry.
    #[serde(default)]
    pub percent: f64,
}
