pub mod criteria;
pub mod filter;
pub mod handlers;
pub mod listing;
pub mod query_string;
pub mod salary;
pub mod sort;
pub mod source;
pub mod state;
