//! Candidate generation : sketches every sequence of a collection into a [FriendIndex]
//! and answers which sequences are friends of a query.
//!
//! A sequence owns one sketch, or one per subsequence. Serials of the index are mapped back to
//! the owning sequence rank, a sequence is a friend if any of its sketches matches.

use std::time::SystemTime;

use fxhash::FxHashSet;

use crate::cancel::CancelFlag;
use crate::errors::GclustError;
use crate::index::FriendIndex;
use crate::sketch::{FrozenSketch, SeqSketcher};
use crate::utils::idsketch::SeqDict;
use crate::utils::parameters::{IndexParams, SketchParams};

pub struct FriendFinder {
    sketcher: SeqSketcher,
    index: FriendIndex<u64>,
    /// serial -> rank of owning sequence
    owners: Vec<usize>,
}

impl FriendFinder {
    /// fails on invalid parameters
    pub fn new(
        sketch_params: &SketchParams,
        index_params: &IndexParams,
    ) -> Result<Self, GclustError> {
        index_params.check()?;
        Ok(FriendFinder {
            sketcher: SeqSketcher::new(sketch_params)?,
            index: FriendIndex::from_params(index_params),
            owners: Vec::new(),
        })
    }

    /// sketches sequence, to be used for queries
    pub fn sketch(&self, seq: &[u8]) -> Vec<FrozenSketch<u64>> {
        self.sketcher.sketch(seq)
    }

    /// adds sketches owned by sequence rank
    pub fn add(&mut self, rank: usize, sketches: &[FrozenSketch<u64>]) {
        for sketch in sketches {
            let serial = self.index.add(sketch);
            debug_assert_eq!(serial, self.owners.len());
            self.owners.push(rank);
        }
    }

    /// number of sketches indexed
    pub fn get_nb_sketches(&self) -> usize {
        self.index.len()
    }

    /// ranks of sequences with at least one sketch friend of one of sketches, sorted and without duplicates
    pub fn friends(&self, sketches: &[FrozenSketch<u64>]) -> Vec<usize> {
        if sketches.len() == 1 {
            let serials = self.index.query(&sketches[0]);
            let mut ranks: Vec<usize> = serials.into_iter().map(|s| self.owners[s]).collect();
            ranks.dedup();
            return ranks;
        }
        let mut found = FxHashSet::<usize>::default();
        for sketch in sketches {
            found.extend(self.index.query(sketch).into_iter().map(|s| self.owners[s]));
        }
        let mut ranks: Vec<usize> = found.into_iter().collect();
        ranks.sort_unstable();
        ranks
    } // end of friends

    /// sketches and indexes a whole collection, sequence ranks in order.
    /// Returns the sketches of each sequence.
    pub fn index_all(
        &mut self,
        seqdict: &SeqDict,
        cancel: &CancelFlag,
    ) -> Result<Vec<Vec<FrozenSketch<u64>>>, GclustError> {
        log::info!("indexing {} sequences", seqdict.len());
        let start_t = SystemTime::now();
        let mut all = Vec::with_capacity(seqdict.len());
        for seq in seqdict.iter() {
            if cancel.is_cancelled() {
                return Err(GclustError::Interrupted);
            }
            let sketches = self.sketch(seq.get_sequence());
            self.add(seq.get_rank(), &sketches);
            all.push(sketches);
        }
        let elapsed = start_t.elapsed().map(|d| d.as_secs_f32()).unwrap_or(0.);
        let nb_sketches = self.get_nb_sketches();
        log::info!("indexed nb sketches : {}, system time(s) : {:.2}", nb_sketches, elapsed);
        if let Some(usage) = memory_stats::memory_stats() {
            log::info!("memory after indexing, physical : {} Mb", usage.physical_mem / (1 << 20));
        }
        Ok(all)
    } // end of index_all
} // end of impl FriendFinder

#[cfg(test)]
mod tests {
    use super::*;

    fn random_seq(len: usize, seed: u64) -> Vec<u8> {
        let mut state = seed;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                b"ACGT"[(state >> 62) as usize]
            })
            .collect()
    }

    #[test]
    fn partition_finds_shared_region() {
        let _ = env_logger::builder().is_test(true).try_init();
        // b shares only its second half with a
        let a = random_seq(4_000, 1);
        let mut b = random_seq(2_000, 2);
        b.extend_from_slice(&a[..2_000]);
        let mut seqdict = SeqDict::new(2);
        seqdict.push("a".to_string(), a);
        seqdict.push("b".to_string(), b);
        seqdict.push("c".to_string(), random_seq(4_000, 3));
        //
        let sketch_params = SketchParams::new(21, 2_000, 0, 2_000, false);
        let mut finder = FriendFinder::new(&sketch_params, &IndexParams::new(2_000, 1)).unwrap();
        let sketches = finder.index_all(&seqdict, &CancelFlag::new()).unwrap();
        assert_eq!(finder.get_nb_sketches(), 6);
        assert_eq!(finder.friends(&sketches[0]), vec![0, 1]);
        assert_eq!(finder.friends(&sketches[1]), vec![0, 1]);
        assert_eq!(finder.friends(&sketches[2]), vec![2]);
    }

    #[test]
    fn whole_mode_owner_is_rank() {
        let mut seqdict = SeqDict::new(2);
        let a = random_seq(300, 7);
        seqdict.push("a".to_string(), a.clone());
        seqdict.push("a_copy".to_string(), a);
        let mut finder = FriendFinder::new(&SketchParams::new(21, 50, 3, 0, false), &IndexParams::new(50, 5)).unwrap();
        let sketches = finder.index_all(&seqdict, &CancelFlag::new()).unwrap();
        assert_eq!(sketches[0].len(), 1);
        assert_eq!(finder.friends(&sketches[1]), vec![0, 1]);
    }

    #[test]
    fn indexing_stops_on_cancel() {
        let mut seqdict = SeqDict::new(1);
        seqdict.push("a".to_string(), random_seq(100, 1));
        let cancel = CancelFlag::new();
        cancel.cancel();
        let mut finder = FriendFinder::new(&SketchParams::default(), &IndexParams::new(20, 1)).unwrap();
        assert!(matches!(finder.index_all(&seqdict, &cancel), Err(GclustError::Interrupted)));
    }

    #[test]
    fn bad_kmer_size_is_error() {
        let res = FriendFinder::new(&SketchParams::new(33, 20, 0, 0, false), &IndexParams::new(20, 1));
        assert!(matches!(res, Err(GclustError::Params(_))));
        let res = FriendFinder::new(&SketchParams::new(0, 20, 0, 0, false), &IndexParams::new(20, 1));
        assert!(matches!(res, Err(GclustError::Params(_))));
    }
}
