use crate::config::Config;

pub fn cmd_list_endpoints(config: &Config) {
    if config.endpoints.is_empty() {
        println!("No endpoints configured.");
        return;
    }

    println!("Lookup endpoints (base URL: {}):", config.backend.base_url);
    println!("{:-<60}", "");

    for endpoint in &config.endpoints {
        println!("• {} -> {}", endpoint.name, endpoint.path);

        let mut fields = vec![endpoint.label_field.as_str()];
        fields.extend(endpoint.secondary_field.as_deref());
        fields.extend(endpoint.contact_field.as_deref());
        println!(
            "  list: {} | id: {} | fields: {}",
            endpoint.list_key,
            endpoint.id_field,
            fields.join(", ")
        );
    }
}
