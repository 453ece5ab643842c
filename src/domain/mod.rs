pub mod checkpoint;
pub mod plan;
pub mod state;

pub use checkpoint::*;
pub use plan::*;
pub use state::*;
