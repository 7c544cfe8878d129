pub mod concentration;
pub mod config;
pub mod lendable;
pub mod repo;
