pub mod compose;
pub mod context;
pub mod errors;
pub mod events;
pub mod outlet;
pub mod research;
pub mod types;
pub mod workflow;
