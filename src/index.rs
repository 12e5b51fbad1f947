//! An inverted index on min-hash sketches.
//!
//! Each added sketch gets a serial number, 0 for the first one. The index only looks at the
//! `look_at` minimal values of each sketch and maps each of these values to the serials
//! containing it. A query returns the serials sharing at least `min_friends` of these values
//! with the query sketch. There is no removal, callers filter query results.

use std::hash::Hash;

use fxhash::{FxHashMap, FxHashSet};

use crate::sketch::FrozenSketch;
use crate::utils::parameters::IndexParams;

/// Friend index over sketches with hash values of type H.
pub struct FriendIndex<H> {
    /// number of minimal values looked at
    look_at: usize,
    /// min common values
    min_friends: usize,
    /// serial of next addition
    next: usize,
    /// hash value -> serials, in insertion order
    buckets: FxHashMap<H, Vec<usize>>,
}

impl<H> FriendIndex<H>
where
    H: num::PrimInt + Hash,
{
    /// an index looking for min_friends matches among the look_at minimal values
    pub fn new(look_at: usize, min_friends: usize) -> Self {
        FriendIndex {
            look_at,
            min_friends,
            next: 0,
            buckets: FxHashMap::default(),
        }
    }

    pub fn from_params(params: &IndexParams) -> Self {
        Self::new(params.get_look_at(), params.get_min_friends())
    }

    /// number of sketches added
    pub fn len(&self) -> usize {
        self.next
    }

    pub fn is_empty(&self) -> bool {
        self.next == 0
    }

    pub fn get_min_friends(&self) -> usize {
        self.min_friends
    }

    /// adds one sketch, returns its serial
    pub fn add(&mut self, sketch: &FrozenSketch<H>) -> usize {
        let serial = self.next;
        for &h in sketch.tail(self.look_at) {
            self.buckets.entry(h).or_default().push(serial);
        }
        self.next += 1;
        serial
    } // end of add

    /// adds sketches in order, returns serial of first one
    pub fn add_all<'a, I>(&mut self, sketches: I) -> usize
    where
        I: IntoIterator<Item = &'a FrozenSketch<H>>,
        H: 'a,
    {
        let first = self.next;
        for sketch in sketches {
            self.add(sketch);
        }
        first
    }

    // expected number of hits, to size hash tables
    fn capacity_hint(&self) -> usize {
        if self.buckets.is_empty() {
            return 0;
        }
        (self.next * self.look_at / self.buckets.len()) * 2
    }

    /// serials sharing at least min_friends values with sketch, sorted
    pub fn query(&self, sketch: &FrozenSketch<H>) -> Vec<usize> {
        if self.min_friends == 1 {
            self.query_union(sketch)
        } else {
            self.query_count(sketch, self.min_friends)
        }
    }

    // min_friends == 1 : any shared value qualifies, no counter needed
    fn query_union(&self, sketch: &FrozenSketch<H>) -> Vec<usize> {
        let capacity = self.capacity_hint();
        let mut found = FxHashSet::<usize>::with_capacity_and_hasher(capacity, Default::default());
        for h in sketch.tail(self.look_at) {
            if let Some(serials) = self.buckets.get(h) {
                found.extend(serials.iter().copied());
            }
        }
        let mut result: Vec<usize> = found.into_iter().collect();
        result.sort_unstable();
        result
    } // end of query_union

    // counts shared values per serial
    fn query_count(&self, sketch: &FrozenSketch<H>, min_friends: usize) -> Vec<usize> {
        let capacity = self.capacity_hint();
        let mut counts =
            FxHashMap::<usize, usize>::with_capacity_and_hasher(capacity, Default::default());
        for h in sketch.tail(self.look_at) {
            if let Some(serials) = self.buckets.get(h) {
                for &s in serials {
                    *counts.entry(s).or_insert(0) += 1;
                }
            }
        }
        let mut result: Vec<usize> = counts
            .into_iter()
            .filter(|&(_, c)| c >= min_friends)
            .map(|(s, _)| s)
            .collect();
        result.sort_unstable();
        result
    } // end of query_count
} // end of impl FriendIndex

#[cfg(test)]
mod tests {
    use super::*;

    fn sketches(input: &[&[u64]]) -> Vec<FrozenSketch<u64>> {
        input.iter().map(|v| v.iter().copied().collect()).collect()
    }

    fn query_all(index: &FriendIndex<u64>, mhs: &[FrozenSketch<u64>]) -> Vec<Vec<usize>> {
        mhs.iter().map(|mh| index.query(mh)).collect()
    }

    #[test]
    fn index_two_friends() {
        let mhs = sketches(&[&[1, 3, 5, 7, 9], &[1, 3, 4, 7, 9], &[3, 5, 7, 9, 11], &[0, 1, 2, 7, 9]]);
        let mut index = FriendIndex::<u64>::new(3, 2);
        for mh in &mhs {
            index.add(mh);
        }
        let want = vec![vec![0, 1, 2], vec![0, 1], vec![0, 2], vec![3]];
        assert_eq!(query_all(&index, &mhs), want);
    }

    #[test]
    fn index_one_friend() {
        let mhs = sketches(&[&[1, 3, 5], &[2, 4, 6], &[1, 2, 3], &[3, 5, 10], &[11, 12, 13]]);
        let mut index = FriendIndex::<u64>::new(3, 1);
        assert_eq!(index.add_all(&mhs), 0);
        assert_eq!(index.len(), 5);
        let want = vec![vec![0, 2, 3], vec![1, 2], vec![0, 1, 2, 3], vec![0, 2, 3], vec![4]];
        assert_eq!(query_all(&index, &mhs), want);
    }

    #[test]
    fn union_matches_counting() {
        // pseudo random small sketches
        let mut state: u64 = 17;
        let mut next = || {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (state >> 33) % 40
        };
        let mhs: Vec<FrozenSketch<u64>> = (0..30).map(|_| (0..6).map(|_| next()).collect()).collect();
        let mut index = FriendIndex::<u64>::new(4, 1);
        index.add_all(&mhs);
        for mh in &mhs {
            assert_eq!(index.query_union(mh), index.query_count(mh, 1));
        }
    }

    #[test]
    fn brute_force_cross_check() {
        let mut state: u64 = 5;
        let mut next = || {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (state >> 33) % 25
        };
        let mhs: Vec<FrozenSketch<u64>> = (0..20).map(|_| (0..8).map(|_| next()).collect()).collect();
        for min_friends in 1..4 {
            let mut index = FriendIndex::<u64>::new(5, min_friends);
            index.add_all(&mhs);
            for q in &mhs {
                let expected: Vec<usize> = mhs
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| s.tail(5).iter().filter(|h| q.tail(5).contains(*h)).count() >= min_friends)
                    .map(|(i, _)| i)
                    .collect();
                assert_eq!(index.query(q), expected);
            }
        }
    }

    #[test]
    fn generic_over_hash_width() {
        let mhs: Vec<FrozenSketch<u32>> = vec![[1u32, 2, 3].into_iter().collect(), [3u32, 4, 5].into_iter().collect()];
        let mut index = FriendIndex::<u32>::new(2, 1);
        index.add_all(&mhs);
        // only 1,2 and 3,4 are looked at
        assert_eq!(index.query(&mhs[0]), vec![0]);
        assert!(FriendIndex::<u32>::new(2, 1).query(&mhs[0]).is_empty());
    }
}
