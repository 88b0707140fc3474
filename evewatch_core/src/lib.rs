pub mod events;
pub mod ids;
pub mod time;

pub use events::{EntityEventSink, LogNotifications, Notifications};
pub use ids::{AllianceId, CharacterId, CorporationId};
pub use time::Timestamp;
