#[macro_use]
mod cache;
