pub mod draft;
pub mod engine;
pub mod handlers;
pub mod session;
pub mod store;
