pub mod common;
pub mod item;
pub mod notification;
pub mod user;
