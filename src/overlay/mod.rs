pub mod instruction;
pub mod renderer;
