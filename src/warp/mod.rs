pub mod blend;
pub mod mesh;
pub mod warp;
