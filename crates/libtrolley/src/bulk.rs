// SPDX-License-Identifier: MIT OR Apache-2.0

use rayon::prelude::*;

use crate::Result;

/// splits `items` into consecutive chunks of at most `size` elements.
pub fn split_into_chunks<T>(items: &[T], size: usize) -> Vec<&[T]> {
    items.chunks(size.max(1)).collect()
}

/// applies `update` to every item, chunk by chunk.
///
/// items within a chunk are written in parallel; a chunk only starts once
/// the previous one has fully completed. the first failure aborts the
/// remaining chunks and is returned.
pub fn apply_in_chunks<T, F>(items: &[T], chunk_size: usize, update: F) -> Result<()>
where
    T: Sync,
    F: Fn(&T) -> Result<()> + Sync,
{
    let chunks = split_into_chunks(items, chunk_size);
    let total = chunks.len();

    for (index, chunk) in chunks.into_iter().enumerate() {
        log::debug!(
            "**bulk:** writing chunk {}/{} ({} records)",
            index + 1,
            total,
            chunk.len()
        );
        chunk.par_iter().try_for_each(&update)?;
    }

    Ok(())
}
