pub mod pipeline;
pub mod retry;
pub mod scheduler;
pub mod source;
pub mod table;
