//! Events emitted by a search controller.
//!
//! Owning views subscribe to these through the controller's event bus instead
//! of handing the controller callbacks.

use serde::Serialize;

use crate::models::entity::Suggestion;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum SearchEvent {
    QueryChanged {
        query: String,
    },
    SearchStarted {
        query: String,
        page: u32,
    },
    ResultsPublished {
        query: String,
        page: u32,
        count: usize,
        has_more: bool,
        from_cache: bool,
    },
    SearchFailed {
        query: String,
        message: String,
    },
    /// A suggestion was picked, or the selection was cleared (`None`).
    Selected(Option<Suggestion>),
    Cleared,
}
