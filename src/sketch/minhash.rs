//! Bottom sketch : keeps the smallest distinct hash values pushed into it.
//!
//! Kmers come from needletail 2 bits encoded and canonicalized with their reverse complement,
//! they are hashed with an invertible 64 bits hash after mixing in a seed. Kmers containing a non ACGT
//! base are skipped.

use std::collections::BinaryHeap;
use std::hash::Hash;

use fxhash::FxHashSet;
use needletail::Sequence;

use crate::errors::GclustError;

/// A min-hash sketch of at most `size` distinct values.
/// After [MinHash::freeze] values are sorted in increasing order and no more pushes are possible.
#[derive(Clone, Debug)]
pub struct MinHash<H> {
    size: usize,
    heap: BinaryHeap<H>,
    seen: FxHashSet<H>,
}

impl<H> MinHash<H>
where
    H: num::PrimInt + Hash,
{
    pub fn new(size: usize) -> Self {
        MinHash {
            size,
            heap: BinaryHeap::with_capacity(size + 1),
            seen: FxHashSet::default(),
        }
    }

    /// offers a hash value to the sketch
    pub fn push(&mut self, h: H) {
        if self.size == 0 || self.seen.contains(&h) {
            return;
        }
        if self.heap.len() < self.size {
            self.heap.push(h);
            self.seen.insert(h);
            return;
        }
        // heap is full, replace the max if h is smaller
        if let Some(&max) = self.heap.peek() {
            if h < max {
                self.heap.pop();
                self.seen.remove(&max);
                self.heap.push(h);
                self.seen.insert(h);
            }
        }
    } // end of push

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// finalizes the sketch
    pub fn freeze(self) -> FrozenSketch<H> {
        FrozenSketch {
            values: self.heap.into_sorted_vec(),
        }
    }
} // end of impl MinHash

/// Immutable sketch, values sorted increasingly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrozenSketch<H> {
    values: Vec<H>,
}

impl<H: Copy> FrozenSketch<H> {
    /// values, smallest first
    pub fn view(&self) -> &[H] {
        &self.values
    }

    /// the k smallest values (all of them if fewer)
    pub fn tail(&self, k: usize) -> &[H] {
        &self.values[..k.min(self.values.len())]
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
} // end of impl FrozenSketch

impl<H> FromIterator<H> for FrozenSketch<H>
where
    H: num::PrimInt + Hash,
{
    /// builds a sketch keeping all distinct values
    fn from_iter<I: IntoIterator<Item = H>>(iter: I) -> Self {
        let values: Vec<H> = iter.into_iter().collect();
        let mut mh = MinHash::new(values.len());
        for v in values {
            mh.push(v);
        }
        mh.freeze()
    }
}

//======================================================================================

/// largest kmer size, kmers are packed 2 bits per base in a u64
pub const MAX_KMER_SIZE: usize = 31;

/// Hashes canonical kmers of a sequence with a seeded hash.
#[derive(Copy, Clone, Debug)]
pub struct KmerHasher {
    kmer_size: usize,
    seed_mix: u64,
}

impl KmerHasher {
    /// kmer_size must be in 1..=MAX_KMER_SIZE
    pub fn new(kmer_size: usize, seed: u64) -> Result<Self, GclustError> {
        if kmer_size == 0 || kmer_size > MAX_KMER_SIZE {
            let msg = format!("kmer size must be in 1..={}, got {}", MAX_KMER_SIZE, kmer_size);
            return Err(GclustError::Params(msg));
        }
        // a seed equal to 0 must still give a non trivial mix
        let seed_mix = probminhash::invhash::int64_hash(seed.wrapping_add(0x9E37_79B9_7F4A_7C15));
        Ok(KmerHasher { kmer_size, seed_mix })
    }

    pub fn get_kmer_size(&self) -> usize {
        self.kmer_size
    }

    #[inline]
    fn hash_kmer(&self, canonical: u64) -> u64 {
        probminhash::invhash::int64_hash(canonical ^ self.seed_mix)
    }

    /// calls f on hash of each valid kmer of seq, kmers containing a non ACGT base are skipped
    pub fn for_each_hash<F: FnMut(u64)>(&self, seq: &[u8], mut f: F) {
        if seq.len() < self.kmer_size {
            return;
        }
        // needletail gives min(kmer, reverse complement) packed 2 bits per base
        for (_, (canonical, _), _) in seq.bit_kmers(self.kmer_size as u8, true) {
            f(self.hash_kmer(canonical));
        }
    } // end of for_each_hash

    /// bottom sketch of sequence
    pub fn sketch(&self, seq: &[u8], sketch_size: usize) -> FrozenSketch<u64> {
        let mut mh = MinHash::<u64>::new(sketch_size);
        self.for_each_hash(seq, |h| mh.push(h));
        mh.freeze()
    }
} // end of impl KmerHasher
