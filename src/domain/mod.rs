//! Storefront domain: cart and order rules independent of storage.
pub mod aggregates;
pub mod events;
pub mod value_objects;
