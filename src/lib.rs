pub mod dataset_cache;
pub mod http_client;
pub mod state;
pub mod stats_fetch;
pub mod table_parse;
pub mod view;
