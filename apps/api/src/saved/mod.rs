pub mod handlers;
pub mod optimistic;
pub mod store;
pub mod toggle;
pub mod view;
