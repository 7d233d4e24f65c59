pub mod entity;
pub mod page;

pub use entity::{EntityMapper, FieldMapper, Suggestion};
pub use page::{SearchPage, parse_search_body};
