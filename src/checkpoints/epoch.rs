use crate::domain::Checkpoint;

/// Epoch label used when logging a checkpoint.
///
/// Stems without `=` get the fallback label `"0"`. Stems with `=` split out the
/// epoch value but the label returned is still `"0"`; callers needing the real
/// epoch use [`Checkpoint::epoch_index`].
// TODO: decide with the checkpoint owners whether the label should become the split value.
pub fn extract_epoch(checkpoint: &Checkpoint) -> String {
    let stem = checkpoint.stem();
    if !stem.contains('=') {
        return "0".to_string();
    }
    let _epoch = stem.split('=').nth(1);
    "0".to_string()
}
