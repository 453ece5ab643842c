//! Checkpoint selection
//!
//! Finds the saved policy states to evaluate inside a training output folder
//! and labels them for logging.

mod discovery;
mod epoch;
mod resolver;

pub use discovery::{
    get_all_checkpoints, get_checkpoints_for_epochs, get_last_checkpoint, parse_epoch_list,
    CheckpointLayout,
};
pub use epoch::extract_epoch;
pub use resolver::{CheckpointResolver, CheckpointSelection};
