//! gclust : greedy linear clustering of nucleotide sequences, and search of query sequences
//! in a reference collection.
//!
//! Sequences are sketched with a bottom-k minhash, possibly one sketch per subsequence,
//! and indexed in a [index::FriendIndex] that returns sequences sharing enough small hash values.
//! Candidates found this way are verified with an external ANI tool (fastANI) through
//! the [oracle::AniOracle] trait.
//!
//! - [cluster::linclust] processes sequences by decreasing length, each unassigned sequence
//!   becomes a representative and absorbs its accepted, not yet assigned, friends.
//! - [search::Searcher] indexes references once and streams queries.

pub mod answer;
pub mod cancel;
pub mod candidates;
pub mod cluster;
pub mod errors;
pub mod index;
pub mod oracle;
pub mod search;
pub mod sketch;
pub mod utils;
