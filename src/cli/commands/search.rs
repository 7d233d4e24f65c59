use anyhow::Context;

use crate::clients::HttpSearchBackend;
use crate::config::Config;
use crate::domain::SearchRequest;
use crate::models::{FieldMapper, parse_search_body};
use crate::services::SearchBackend;

pub async fn cmd_search(
    config: &Config,
    endpoint_name: &str,
    query: &str,
    page: u32,
) -> anyhow::Result<()> {
    let endpoint = config
        .find_endpoint(endpoint_name)
        .with_context(|| format!("Unknown endpoint '{endpoint_name}'"))?;

    let backend = HttpSearchBackend::new(&config.backend, endpoint)?;
    let mapper = FieldMapper::from(endpoint);

    println!("Searching {endpoint_name} for: {query}");

    let request = SearchRequest::new(query.trim(), page, config.search.page_size);
    let body = backend
        .fetch(&request)
        .await
        .with_context(|| format!("Search request to '{endpoint_name}' failed"))?;
    let results = parse_search_body(&body, &mapper);

    if results.is_empty() {
        println!("No results found for '{query}'");
        return Ok(());
    }

    println!();
    println!("Results (page {page}):");
    println!("{:-<60}", "");

    for suggestion in &results.results {
        println!("• {}", suggestion.display_line());
        println!("  ID: {}", suggestion.id);
    }

    if results.has_more {
        println!();
        println!(
            "More results available: bizlookup search {endpoint_name} \"{query}\" --page {}",
            page + 1
        );
    }

    Ok(())
}
