pub mod asymmetry;
pub mod orientation;
