pub mod aoc;
pub mod api_defaults;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod io;
pub mod logging;
pub mod resource;
pub mod time;
pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;

#[macro_use]
extern crate log;

#[macro_use]
extern crate lazy_static;

#[macro_use]
extern crate derive_builder;

fn json_loads(data: &str) -> Result<serde_json::Value> {
    serde_json::from_str(data).map_err(|e| error::gen(e.to_string()))
}
