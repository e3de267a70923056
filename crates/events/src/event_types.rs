//! Dot-separated event names emitted by the workflow.

pub const PROPERTY_LOADED: &str = "property.loaded";
pub const PROPERTY_LOAD_FAILED: &str = "property.load_failed";

pub const GENERATION_STARTED: &str = "generation.started";
pub const GENERATION_COMPLETED: &str = "generation.completed";
pub const GENERATION_FAILED: &str = "generation.failed";
/// A response arrived after a newer request for the same language.
pub const GENERATION_DISCARDED: &str = "generation.discarded";

pub const DRAFT_UPDATED: &str = "draft.updated";
pub const DRAFT_READY: &str = "draft.ready";
pub const DRAFT_IMPROVED: &str = "draft.improved";
pub const DRAFT_IMPROVE_FAILED: &str = "draft.improve_failed";
pub const AUTOSAVE_FAILED: &str = "draft.autosave_failed";

pub const PUBLISH_SUBMITTED: &str = "publish.submitted";
pub const PUBLISH_REJECTED: &str = "publish.rejected";
pub const PUBLISH_FAILED: &str = "publish.failed";
pub const DRAFT_PUBLISHED: &str = "draft.published";
pub const DRAFT_PUBLISH_FAILED: &str = "draft.publish_failed";
