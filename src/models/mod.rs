pub mod record;
pub mod summary;
pub mod work_item;

pub use record::{parse_timestamp, Fields, InsertPosition, Record, SortDirection, SortKey};
pub use summary::{RunState, RunSummary};
pub use work_item::WorkItem;
