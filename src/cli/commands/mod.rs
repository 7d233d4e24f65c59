mod endpoints;
mod init;
mod lookup;
mod search;

pub use endpoints::cmd_list_endpoints;
pub use init::cmd_init_config;
pub use lookup::cmd_lookup;
pub use search::cmd_search;
