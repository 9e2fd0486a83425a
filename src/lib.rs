pub mod config;
pub mod db;
pub mod dedup;
pub mod error;
pub mod parser;
pub mod pipeline;
pub mod retry;
pub mod scraper;
pub mod seo;
pub mod types;
