/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Backend document ids are opaque strings.
pub type DraftId = String;

pub type PropertyId = String;

pub type AgentId = String;

/// Reference to a media asset owned by the property, not by the draft.
pub type MediaId = String;
