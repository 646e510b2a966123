pub mod raid;
pub mod train;

pub use raid::*;
pub use train::*;
