pub mod lookup_service;
pub use lookup_service::{SearchBackend, SearchError};

pub mod search_cache;
pub use search_cache::SearchCache;

pub mod search_controller;
pub use search_controller::{
    NoOptionsReason, SearchController, SearchOutcome, SearchSettings, SearchSnapshot,
    SearchStatus,
};
