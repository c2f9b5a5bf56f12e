pub mod capture_store;
pub mod landmark_tracker;
