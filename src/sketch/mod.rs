//! sequence sketching
//!
//! A sequence is sketched whole, or cut in contiguous subsequences of near equal length each
//! sketched separately. Subsequences let two sequences sharing only a region still share one
//! pair of matching sketches.

pub mod minhash;

pub use minhash::{FrozenSketch, KmerHasher, MinHash};

use crate::errors::GclustError;
use crate::utils::parameters::SketchParams;

/// Sketches sequences according to [SketchParams].
/// The same sketcher (hence same seed) must be used for index construction and queries.
pub struct SeqSketcher {
    params: SketchParams,
    hasher: KmerHasher,
}

impl SeqSketcher {
    /// fails on invalid parameters
    pub fn new(params: &SketchParams) -> Result<Self, GclustError> {
        params.check()?;
        let hasher = KmerHasher::new(params.get_kmer_size(), params.get_seed())?;
        Ok(SeqSketcher {
            params: *params,
            hasher,
        })
    }

    pub fn get_params(&self) -> &SketchParams {
        &self.params
    }

    /// one sketch of the whole sequence
    pub fn sketch_whole(&self, seq: &[u8]) -> FrozenSketch<u64> {
        self.hasher.sketch(seq, self.params.get_sketch_size())
    }

    /// sketches of sequence : one if not partitioned, one per subsequence otherwise
    pub fn sketch(&self, seq: &[u8]) -> Vec<FrozenSketch<u64>> {
        if !self.params.is_partitioned() {
            return vec![self.sketch_whole(seq)];
        }
        subseq_bounds(seq.len(), self.params.get_subseq_len(), self.params.get_half_steps())
            .into_iter()
            .map(|(start, end)| self.sketch_whole(&seq[start..end]))
            .collect()
    } // end of sketch
} // end of impl SeqSketcher

/// Bounds of subsequences of a sequence of length len.
///
/// The sequence is cut in max(len / subseq_len, 1) contiguous non overlapping parts of near equal size.
/// With half_steps the parts are twice as many, each one spanning two half parts, giving overlapping
/// subsequences shifted by half a subsequence.
pub fn subseq_bounds(len: usize, subseq_len: usize, half_steps: bool) -> Vec<(usize, usize)> {
    let mut nb_parts = if subseq_len == 0 { 1 } else { (len / subseq_len).max(1) };
    let mut nb_sketched = nb_parts;
    if half_steps {
        nb_parts *= 2;
        nb_sketched = nb_parts - 1;
    }
    (0..nb_sketched)
        .map(|i| {
            let start = i * len / nb_parts;
            let end = if half_steps { (i + 2) * len / nb_parts } else { (i + 1) * len / nb_parts };
            (start, end)
        })
        .collect()
} // end of subseq_bounds
