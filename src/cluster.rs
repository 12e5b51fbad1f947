//! Greedy linear clustering.
//!
//! Sequences are processed by decreasing length. Each sequence not yet consumed becomes the
//! representative of a new cluster, its friends that come later in processing order (so are not
//! longer) and are not consumed are checked with one oracle call, and accepted ones are consumed.
//! Every sequence ends in exactly one cluster and members are never longer than their representative.

use std::path::Path;
use std::time::SystemTime;

use cpu_time::ProcessTime;
use fxhash::FxHashSet;

use crate::answer::{Cluster, Clusters};
use crate::cancel::CancelFlag;
use crate::candidates::FriendFinder;
use crate::errors::GclustError;
use crate::oracle::AniOracle;
use crate::sketch::FrozenSketch;
use crate::utils::files::{label_rank, scratch_base, ScratchDir};
use crate::utils::idsketch::SeqDict;
use crate::utils::parameters::ClustParams;

/// progress is logged every PROGRESS_STEP sequences
pub const PROGRESS_STEP: usize = 1000;

/// Counters of a run
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    /// sequences for which friends were looked for
    pub nb_examined: usize,
    /// friends kept after filtering, summed over examined sequences
    pub nb_friends: usize,
    pub nb_oracle_calls: usize,
}

impl RunStats {
    /// mean number of friends by examined sequence
    pub fn mean_friends(&self) -> f64 {
        if self.nb_examined == 0 {
            return 0.;
        }
        self.nb_friends as f64 / self.nb_examined as f64
    }
}

/// ranks sorted by decreasing length, ties kept in input order
pub fn processing_order(lengths: &[usize]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..lengths.len()).collect();
    // sort_by is stable
    order.sort_by(|&a, &b| lengths[b].cmp(&lengths[a]));
    order
}

// position of each rank in order
fn flip_order(order: &[usize]) -> Vec<usize> {
    let mut position = vec![0; order.len()];
    for (i, &rank) in order.iter().enumerate() {
        position[rank] = i;
    }
    position
}

/// Linear clustering of one collection.
/// The index is built in [LinClusterer::new] and is read only during [LinClusterer::cluster].
pub struct LinClusterer<'a, O: AniOracle> {
    seqdict: &'a SeqDict,
    params: ClustParams,
    oracle: O,
    cancel: CancelFlag,
    finder: FriendFinder,
    /// sketches by rank
    sketches: Vec<Vec<FrozenSketch<u64>>>,
    order: Vec<usize>,
    position: Vec<usize>,
    /// true once a sequence is in a cluster
    consumed: Vec<bool>,
    clusters: Clusters,
    stats: RunStats,
} // end of LinClusterer

impl<'a, O: AniOracle> LinClusterer<'a, O> {
    /// sorts and indexes sequences
    pub fn new(
        seqdict: &'a SeqDict,
        params: &ClustParams,
        oracle: O,
        cancel: CancelFlag,
    ) -> Result<Self, GclustError> {
        params.check()?;
        log::info!("sorting {} sequences by length", seqdict.len());
        let order = processing_order(&seqdict.get_lengths());
        let position = flip_order(&order);
        let mut finder = FriendFinder::new(params.get_sketch_params(), params.get_index_params())?;
        let sketches = finder.index_all(seqdict, &cancel)?;
        Ok(LinClusterer {
            seqdict,
            params: *params,
            oracle,
            cancel,
            finder,
            sketches,
            order,
            position,
            consumed: vec![false; seqdict.len()],
            clusters: Clusters::new(),
            stats: RunStats::default(),
        })
    } // end of new

    pub fn get_processing_order(&self) -> &[usize] {
        &self.order
    }

    /// clusters finalized so far, all of them after a successful [LinClusterer::cluster]
    pub fn get_clusters(&self) -> &Clusters {
        &self.clusters
    }

    pub fn into_clusters(self) -> Clusters {
        self.clusters
    }

    pub fn get_stats(&self) -> &RunStats {
        &self.stats
    }

    // friends of rep not consumed and after rep in processing order
    fn live_friends(&self, rep: usize) -> Vec<usize> {
        let rep_pos = self.position[rep];
        self.finder
            .friends(&self.sketches[rep])
            .into_iter()
            .filter(|&j| self.position[j] > rep_pos && !self.consumed[j])
            .collect()
    }

    /// builds the cluster of representative rep
    fn cluster_one(&mut self, rep: usize, scratch: &ScratchDir) -> Result<Cluster, GclustError> {
        self.consumed[rep] = true;
        let mut cluster = Cluster::new(rep);
        let friends = self.live_friends(rep);
        self.stats.nb_examined += 1;
        self.stats.nb_friends += friends.len();
        if friends.is_empty() {
            return Ok(cluster);
        }
        let rep_len = self.seqdict.0[rep].len();
        log::debug!("representative {} len {}, nb friends {}", rep, rep_len, friends.len());
        //
        let refs = vec![scratch.seq_path(rep)];
        let queries: Vec<_> = friends.iter().map(|&j| scratch.seq_path(j)).collect();
        let records = self.oracle.compare(&queries, &refs)?;
        self.stats.nb_oracle_calls += 1;
        //
        let candidates: FxHashSet<usize> = friends.into_iter().collect();
        let accept = self.params.get_accept_params();
        for rec in records {
            let member = label_rank(&rec.query)?;
            if !candidates.contains(&member) {
                let msg = format!("{} is not a candidate of {}", rec.query, rep);
                return Err(GclustError::BadLabel(msg));
            }
            let score = accept.score(rec.identity, rec.aligned, rec.total, true);
            log::trace!(
                "rep {} member {} identity {} parts {}/{} score {:.3}",
                rep,
                member,
                rec.identity,
                rec.aligned,
                rec.total,
                score
            );
            if accept.accept(score) && !self.consumed[member] {
                self.consumed[member] = true;
                cluster.push(member);
            }
        }
        Ok(cluster)
    } // end of cluster_one

    /// Stages sequences in scratch and runs clustering.
    /// On interruption returns [GclustError::Interrupted], clusters completed before stay available.
    pub fn cluster(&mut self, scratch: &ScratchDir) -> Result<(), GclustError> {
        let start_t = SystemTime::now();
        let cpu_start = ProcessTime::now();
        scratch.write_all(self.seqdict, &self.cancel)?;
        //
        log::info!("clustering {} sequences", self.seqdict.len());
        for i in 0..self.order.len() {
            if self.cancel.is_cancelled() {
                log::info!("interrupted after {} sequences, {} clusters", i, self.clusters.len());
                return Err(GclustError::Interrupted);
            }
            let rep = self.order[i];
            if !self.consumed[rep] {
                let cluster = self.cluster_one(rep, scratch)?;
                self.clusters.push(cluster);
            }
            if (i + 1) % PROGRESS_STEP == 0 {
                log::info!(
                    "processed {} sequences, nb clusters {}, mean friends {:.1}",
                    i + 1,
                    self.clusters.len(),
                    self.stats.mean_friends()
                );
            }
        }
        //
        log::info!(
            "nb clusters : {}, examined : {}, oracle calls : {}, mean friends {:.2}",
            self.clusters.len(),
            self.stats.nb_examined,
            self.stats.nb_oracle_calls,
            self.stats.mean_friends()
        );
        log::info!("clustering cpu time(s) {}", cpu_start.elapsed().as_secs());
        let elapsed = start_t.elapsed().map(|d| d.as_secs_f32()).unwrap_or(0.);
        log::info!("clustering elapsed time(s) {:.2}", elapsed);
        Ok(())
    } // end of cluster

    /// runs [LinClusterer::cluster] in a fresh scratch directory under base.
    /// The directory is removed whatever the outcome, completed clusters stay available.
    pub fn cluster_in(&mut self, base: &Path) -> Result<(), GclustError> {
        let scratch = ScratchDir::new_in(base)?;
        let res = self.cluster(&scratch);
        scratch.close();
        res
    }
} // end of impl LinClusterer

/// clusters a collection in a scratch directory under base, removed when done
pub fn linclust_in<O: AniOracle>(
    base: &Path,
    seqdict: &SeqDict,
    params: &ClustParams,
    oracle: O,
    cancel: CancelFlag,
) -> Result<Clusters, GclustError> {
    let mut clusterer = LinClusterer::new(seqdict, params, oracle, cancel)?;
    clusterer.cluster_in(base)?;
    Ok(clusterer.into_clusters())
}

/// clusters a collection with scratch files in [scratch_base]
pub fn linclust<O: AniOracle>(
    seqdict: &SeqDict,
    params: &ClustParams,
    oracle: O,
    cancel: CancelFlag,
) -> Result<Clusters, GclustError> {
    linclust_in(&scratch_base(), seqdict, params, oracle, cancel)
}
