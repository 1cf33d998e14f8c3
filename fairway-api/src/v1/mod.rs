pub mod id;
pub mod tournaments;
