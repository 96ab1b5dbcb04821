//! Core data types: stages, statuses, entities, records, notifications.

mod entity;
mod notification;
mod progress;
mod record;
mod stage;
mod status;

pub use entity::{EntityId, Product, StageState};
pub use notification::{Notification, NotificationKind};
pub use progress::{ProgressEntry, StageProgress};
pub use record::ResultRecord;
pub use stage::{StageId, STAGE_COUNT};
pub use status::StageStatus;
