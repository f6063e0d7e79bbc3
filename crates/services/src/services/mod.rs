pub mod activity;
pub mod auth;
pub mod config;
pub mod demo;
pub mod events;
pub mod notify;
pub mod presence;
