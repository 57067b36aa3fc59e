pub mod action_parser;
pub mod provider;
pub mod providers;
pub mod reply;
pub mod types;
