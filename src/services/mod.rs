//! Application services. Each holds an `Arc<dyn Store>` and is cheap to clone.

pub mod cart;
pub mod catalog;
pub mod notifications;
pub mod orders;
pub mod revenue;
