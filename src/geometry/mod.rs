pub mod hull;
pub mod line;
pub mod midline;
