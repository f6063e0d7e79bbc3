pub mod activity;
pub mod attachment;
pub mod board;
pub mod comment;
pub mod label;
pub mod list;
pub mod notification;
pub mod project;
pub mod subtask;
pub mod task;
pub mod user;
