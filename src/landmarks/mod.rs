pub mod nodes;
pub mod smoother;
