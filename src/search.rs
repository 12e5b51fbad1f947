//! Search of query sequences in a reference collection.
//!
//! References are sketched and indexed once. Queries are streamed : each one is sketched with the
//! same parameters, its friends are split in references shorter than the query and references at
//! least as long, and each group is sent to the oracle with the shorter sequences as alignment
//! queries. A query may match many references and a reference many queries.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use cpu_time::ProcessTime;
use fxhash::FxHashSet;

use crate::answer::Matches;
use crate::cancel::CancelFlag;
use crate::candidates::FriendFinder;
use crate::cluster::{RunStats, PROGRESS_STEP};
use crate::errors::GclustError;
use crate::oracle::AniOracle;
use crate::utils::files::{label_rank, process_fasta, ScratchDir};
use crate::utils::idsketch::{IdSeq, SeqDict};
use crate::utils::parameters::ClustParams;

/// Splits friends of a query of length qlen in (shorter, longer).
/// shorter : references strictly shorter than query, longer : the others.
pub fn split_by_length(
    friends: &[usize],
    lengths: &[usize],
    qlen: usize,
) -> (Vec<usize>, Vec<usize>) {
    friends.iter().partition(|&&r| lengths[r] < qlen)
}

/// Searches queries in an indexed reference collection.
pub struct Searcher<'a, O: AniOracle> {
    refdict: &'a SeqDict,
    params: ClustParams,
    oracle: O,
    cancel: CancelFlag,
    finder: FriendFinder,
    ref_lengths: Vec<usize>,
    /// names of queries processed so far, by rank
    qnames: Vec<String>,
    matches: Matches,
    stats: RunStats,
} // end of Searcher

impl<'a, O: AniOracle> Searcher<'a, O> {
    /// indexes references
    pub fn new(
        refdict: &'a SeqDict,
        params: &ClustParams,
        oracle: O,
        cancel: CancelFlag,
    ) -> Result<Self, GclustError> {
        params.check()?;
        let mut finder = FriendFinder::new(params.get_sketch_params(), params.get_index_params())?;
        // reference sketches are not needed after indexing
        let _ = finder.index_all(refdict, &cancel)?;
        Ok(Searcher {
            refdict,
            params: *params,
            oracle,
            cancel,
            finder,
            ref_lengths: refdict.get_lengths(),
            qnames: Vec::new(),
            matches: Matches::new(),
            stats: RunStats::default(),
        })
    } // end of new

    /// matches of queries completed so far
    pub fn get_matches(&self) -> &Matches {
        &self.matches
    }

    pub fn into_matches(self) -> Matches {
        self.matches
    }

    /// names of queries seen so far, indexed by query rank
    pub fn get_query_names(&self) -> &[String] {
        &self.qnames
    }

    pub fn get_stats(&self) -> &RunStats {
        &self.stats
    }

    /// writes reference files in scratch, must be done before searching
    pub fn stage(&self, scratch: &ScratchDir) -> Result<(), GclustError> {
        scratch.write_all(self.refdict, &self.cancel)
    }

    // runs oracle on a group of friends, returns accepted (reference, score)
    fn check_group(
        &self,
        group: &[usize],
        qfile: &Path,
        refs_are_longer: bool,
        scratch: &ScratchDir,
    ) -> Result<Vec<(usize, f64)>, GclustError> {
        let group_files: Vec<PathBuf> = group.iter().map(|&r| scratch.seq_path(r)).collect();
        let qfiles = vec![qfile.to_path_buf()];
        // shorter sequences are alignment queries
        let records = if refs_are_longer {
            self.oracle.compare(&qfiles, &group_files)?
        } else {
            self.oracle.compare(&group_files, &qfiles)?
        };
        let candidates: FxHashSet<usize> = group.iter().copied().collect();
        let accept = self.params.get_accept_params();
        let mut accepted = Vec::new();
        for rec in records {
            let label = if refs_are_longer { &rec.reference } else { &rec.query };
            let r = label_rank(label)?;
            // a record must come from the group it was sent with, tolerance depends on the group
            if !candidates.contains(&r) {
                let msg = format!("{} is not in the compared group", label);
                return Err(GclustError::BadLabel(msg));
            }
            // fragments tolerance only when the query is the alignment query
            let score = accept.score(rec.identity, rec.aligned, rec.total, refs_are_longer);
            log::trace!(
                "query {:?} ref {} identity {} parts {}/{} score {:.3}",
                qfile,
                r,
                rec.identity,
                rec.aligned,
                rec.total,
                score
            );
            if accept.accept(score) {
                accepted.push((r, score));
            }
        }
        Ok(accepted)
    } // end of check_group

    /// searches one query, its rank is the number of queries seen before
    pub fn search_one(&mut self, query: &IdSeq, scratch: &ScratchDir) -> Result<(), GclustError> {
        if self.cancel.is_cancelled() {
            log::info!("interrupted after {} queries", self.qnames.len());
            return Err(GclustError::Interrupted);
        }
        let qrank = self.qnames.len();
        let qlen = query.len();
        let friends = self.finder.friends(&self.finder.sketch(query.get_sequence()));
        self.stats.nb_examined += 1;
        self.stats.nb_friends += friends.len();
        if friends.is_empty() {
            self.qnames.push(query.get_name().to_string());
            return Ok(());
        }
        let (shorter, longer) = split_by_length(&friends, &self.ref_lengths, qlen);
        log::debug!(
            "query {} len {}, shorter refs {}, longer refs {}",
            qrank,
            qlen,
            shorter.len(),
            longer.len()
        );
        //
        let qfile = scratch.write_named(&format!("{}.q.fa", qrank), query)?;
        let mut matched = BTreeMap::<usize, f64>::new();
        for (group, refs_are_longer) in [(&shorter, false), (&longer, true)] {
            if group.is_empty() {
                continue;
            }
            let accepted = self.check_group(group, &qfile, refs_are_longer, scratch)?;
            self.stats.nb_oracle_calls += 1;
            matched.extend(accepted);
        }
        std::fs::remove_file(&qfile)?;
        //
        self.qnames.push(query.get_name().to_string());
        self.matches.insert(qrank, matched);
        Ok(())
    } // end of search_one

    fn log_progress(&self) {
        let nb = self.qnames.len();
        if nb > 0 && nb % PROGRESS_STEP == 0 {
            log::info!(
                "processed {} queries, nb matched {}, mean friends {:.1}",
                nb,
                self.matches.len(),
                self.stats.mean_friends()
            );
        }
    }

    fn log_end(&self, start_t: SystemTime, cpu_start: ProcessTime) {
        log::info!(
            "nb queries : {}, matched : {}, oracle calls : {}, mean friends {:.2}",
            self.qnames.len(),
            self.matches.len(),
            self.stats.nb_oracle_calls,
            self.stats.mean_friends()
        );
        log::info!("search cpu time(s) {}", cpu_start.elapsed().as_secs());
        let elapsed = start_t.elapsed().map(|d| d.as_secs_f32()).unwrap_or(0.);
        log::info!("search elapsed time(s) {:.2}", elapsed);
    }

    /// searches queries in order
    pub fn search<I>(&mut self, queries: I, scratch: &ScratchDir) -> Result<(), GclustError>
    where
        I: IntoIterator<Item = IdSeq>,
    {
        let start_t = SystemTime::now();
        let cpu_start = ProcessTime::now();
        for query in queries {
            self.search_one(&query, scratch)?;
            self.log_progress();
        }
        self.log_end(start_t, cpu_start);
        Ok(())
    }

    /// stages references in a fresh scratch directory under base and searches queries of a fasta file.
    /// The directory is removed whatever the outcome, matches of completed queries stay available.
    pub fn search_file_in(&mut self, base: &Path, path: &Path) -> Result<(), GclustError> {
        let scratch = ScratchDir::new_in(base)?;
        let res = self.stage(&scratch).and_then(|_| self.search_file(path, &scratch));
        scratch.close();
        res
    }

    /// searches queries streamed from a fasta file
    pub fn search_file(&mut self, path: &Path, scratch: &ScratchDir) -> Result<(), GclustError> {
        log::info!("searching queries from {:?}", path);
        let start_t = SystemTime::now();
        let cpu_start = ProcessTime::now();
        process_fasta(path, |query| {
            self.search_one(&query, scratch)?;
            self.log_progress();
            Ok(())
        })?;
        self.log_end(start_t, cpu_start);
        Ok(())
    }
} // end of impl Searcher
