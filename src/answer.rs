//! contains results of clustering and search, and their json dumps.
//!
//! Each result is dumped twice : `{prefix}.bynumber.json` with sequence ranks and
//! `{prefix}.byname.json` with fasta ids.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::errors::GclustError;

/// A cluster : representative first, then accepted members in order of acceptance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Cluster(Vec<usize>);

impl Cluster {
    pub fn new(representative: usize) -> Self {
        Cluster(vec![representative])
    }

    pub fn get_representative(&self) -> usize {
        self.0[0]
    }

    /// all members, representative included
    pub fn get_members(&self) -> &[usize] {
        &self.0
    }

    pub(crate) fn push(&mut self, member: usize) {
        self.0.push(member);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
} // end of impl Cluster

/// Clusters in order of creation, i.e by decreasing representative length.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Clusters(Vec<Cluster>);

impl Clusters {
    pub fn new() -> Self {
        Clusters(Vec::new())
    }

    pub(crate) fn push(&mut self, cluster: Cluster) {
        self.0.push(cluster);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Cluster> {
        self.0.iter()
    }

    /// member ranks
    pub fn by_number(&self) -> Vec<Vec<usize>> {
        self.0.iter().map(|c| c.0.clone()).collect()
    }

    /// member names
    pub fn by_name(&self, names: &[String]) -> Vec<Vec<String>> {
        self.0.iter().map(|c| c.0.iter().map(|&i| names[i].clone()).collect()).collect()
    }

    /// dumps both renderings, returns paths written
    pub fn dump(&self, prefix: &str, names: &[String]) -> Result<(PathBuf, PathBuf), GclustError> {
        log::info!("dumping {} clusters with prefix {}", self.len(), prefix);
        let (numberfile, namefile) = dump_paths(prefix);
        let bynumber = dump_json(&self.by_number(), &numberfile)?;
        let byname = dump_json(&self.by_name(names), &namefile)?;
        Ok((bynumber, byname))
    }
} // end of impl Clusters

//======================================================================================

/// Search result : for each query with a match, accepted references and their scores.
/// Queries without match are absent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Matches(BTreeMap<usize, BTreeMap<usize, f64>>);

impl Matches {
    pub fn new() -> Self {
        Matches(BTreeMap::new())
    }

    /// records the matches of one query, nothing if empty
    pub(crate) fn insert(&mut self, query: usize, matched: BTreeMap<usize, f64>) {
        if !matched.is_empty() {
            self.0.insert(query, matched);
        }
    }

    /// number of queries with at least one match
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, query: usize) -> Option<&BTreeMap<usize, f64>> {
        self.0.get(&query)
    }

    pub fn by_number(&self) -> &BTreeMap<usize, BTreeMap<usize, f64>> {
        &self.0
    }

    /// same map keyed by query and reference names
    pub fn by_name(
        &self,
        qnames: &[String],
        rnames: &[String],
    ) -> BTreeMap<String, BTreeMap<String, f64>> {
        self.0
            .iter()
            .map(|(&q, m)| {
                let refs = m.iter().map(|(&r, &score)| (rnames[r].clone(), score)).collect();
                (qnames[q].clone(), refs)
            })
            .collect()
    }

    pub fn dump(
        &self,
        prefix: &str,
        qnames: &[String],
        rnames: &[String],
    ) -> Result<(PathBuf, PathBuf), GclustError> {
        log::info!("dumping matches of {} queries with prefix {}", self.len(), prefix);
        let (numberfile, namefile) = dump_paths(prefix);
        let bynumber = dump_json(self.by_number(), &numberfile)?;
        let byname = dump_json(&self.by_name(qnames, rnames), &namefile)?;
        Ok((bynumber, byname))
    }
} // end of impl Matches

// {prefix}.bynumber.json and {prefix}.byname.json
fn dump_paths(prefix: &str) -> (PathBuf, PathBuf) {
    (
        PathBuf::from(format!("{}.bynumber.json", prefix)),
        PathBuf::from(format!("{}.byname.json", prefix)),
    )
}

fn dump_json<T: Serialize + ?Sized>(data: &T, filepath: &Path) -> Result<PathBuf, GclustError> {
    log::debug!("dumping json file : {:?}", filepath);
    let file = OpenOptions::new().write(true).create(true).truncate(true).open(filepath)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, data)?;
    writer.flush()?;
    Ok(filepath.to_path_buf())
} // end of dump_json
