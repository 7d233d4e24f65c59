use crate::config::Config;

pub fn cmd_init_config() -> anyhow::Result<()> {
    if Config::create_default_if_missing()? {
        println!("Created config.toml with default settings.");
        println!("Edit [backend] base_url to point at your API.");
    } else {
        println!("config.toml already exists, leaving it untouched.");
    }
    Ok(())
}
