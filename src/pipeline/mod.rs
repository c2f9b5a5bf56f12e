pub mod pipeline;
pub mod targets;
