pub mod auth;
pub mod database;
pub mod items;
pub mod memory;
pub mod notifications;
pub mod session;
pub mod store;
pub mod uploads;

#[cfg(test)]
pub(crate) mod testing;
