use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::entity::{EntityMapper, Suggestion};

/// One page of lookup results.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchPage {
    pub results: Vec<Suggestion>,
    pub has_more: bool,
}

impl SearchPage {
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            results: Vec::new(),
            has_more: false,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Reads `{ success, <list_key>: [...], hasMore? }`.
///
/// `success: false`, a missing list key, or a list key that is not an array
/// all read as an empty page rather than an error.
pub fn parse_search_body(body: &Value, mapper: &dyn EntityMapper) -> SearchPage {
    if !body.get("success").and_then(Value::as_bool).unwrap_or(false) {
        debug!("Search response reported success=false");
        return SearchPage::empty();
    }

    let Some(items) = body.get(mapper.list_key()).and_then(Value::as_array) else {
        debug!("Search response has no '{}' array", mapper.list_key());
        return SearchPage::empty();
    };

    let results: Vec<Suggestion> = items
        .iter()
        .filter_map(|raw| mapper.to_suggestion(raw))
        .collect();

    if results.len() < items.len() {
        debug!(
            "Skipped {} entities without id or label",
            items.len() - results.len()
        );
    }

    SearchPage {
        results,
        has_more: body
            .get("hasMore")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    }
}
