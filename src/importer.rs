use crate::ingest::Student;

/// Upsert batches stay well under the store's 500-row batched-write ceiling.
pub const CHUNK_SIZE: usize = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportProgress {
    pub processed: usize,
    pub total: usize,
    pub percent: u8,
}

/// A chunk write failed: earlier chunks stay written, later chunks were
/// never issued.
#[derive(Debug)]
pub struct ImportHalted {
    pub processed: usize,
    pub total: usize,
    pub source: anyhow::Error,
}

pub fn chunk_count(total: usize) -> usize {
    total.div_ceil(CHUNK_SIZE)
}

fn percent_of(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = (processed as f64 / total as f64 * 100.0).round() as u8;
    pct.min(100)
}

/// Slices validated records into fixed-size chunks and hands each chunk to
/// the write closure, strictly sequentially. After every successful chunk
/// the progress observer sees the monotonic processed count; a cooperative
/// yield between chunks keeps a host event loop responsive. A failing chunk
/// halts the run without rolling back what was already written.
pub fn import_in_chunks<W, P>(
    records: &[Student],
    mut write_chunk: W,
    mut progress: P,
) -> Result<usize, ImportHalted>
where
    W: FnMut(&[Student]) -> anyhow::Result<()>,
    P: FnMut(ImportProgress),
{
    let total = records.len();
    let mut processed = 0usize;

    for chunk in records.chunks(CHUNK_SIZE) {
        if processed > 0 {
            std::thread::yield_now();
        }
        if let Err(source) = write_chunk(chunk) {
            return Err(ImportHalted {
                processed,
                total,
                source,
            });
        }
        processed += chunk.len();
        progress(ImportProgress {
            processed,
            total,
            percent: percent_of(processed, total),
        });
    }

    Ok(processed)
}
