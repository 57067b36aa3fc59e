pub mod screenshot;
pub mod traits;
