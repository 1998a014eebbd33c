//! Aggregates module
pub mod order;
pub mod cart;

pub use order::{OrderDraft, OrderError, OrderLine, OrderStatus};
pub use cart::{Cart, CartError, CartLine, Decrement};
