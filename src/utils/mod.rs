pub mod coordinate;
pub mod image;
