//! Storefront domain: catalog, cart and order types with their rules.
pub mod aggregates;
pub mod events;
pub mod value_objects;
