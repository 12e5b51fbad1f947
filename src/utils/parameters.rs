//! structures related to processing parameters

use std::fs::OpenOptions;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::to_writer;

use crate::errors::GclustError;
use crate::sketch::minhash::MAX_KMER_SIZE;

/// default length of subsequences sketched separately
pub const DEFAULT_SUBSEQ_LEN: usize = 10_000;

/// Parameters used for sketching sequences.
/// The same values must be used for index construction and for queries.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SketchParams {
    kmer_size: usize,
    sketch_size: usize,
    /// seed of the kmer hash family
    seed: u64,
    /// length of subsequences sketched separately, 0 means one sketch per sequence
    subseq_len: usize,
    /// add overlapping subsequences shifted by half a subsequence
    half_steps: bool,
}

impl Default for SketchParams {
    fn default() -> Self {
        SketchParams {
            kmer_size: 21,
            sketch_size: 20,
            seed: 0,
            subseq_len: DEFAULT_SUBSEQ_LEN,
            half_steps: false,
        }
    }
} // end of default for SketchParams

impl SketchParams {
    ///
    pub fn new(
        kmer_size: usize,
        sketch_size: usize,
        seed: u64,
        subseq_len: usize,
        half_steps: bool,
    ) -> Self {
        SketchParams {
            kmer_size,
            sketch_size,
            seed,
            subseq_len,
            half_steps,
        }
    }

    /// returns kmer size
    pub fn get_kmer_size(&self) -> usize {
        self.kmer_size
    }

    /// return sketch size
    pub fn get_sketch_size(&self) -> usize {
        self.sketch_size
    }

    pub fn get_seed(&self) -> u64 {
        self.seed
    }

    pub fn get_subseq_len(&self) -> usize {
        self.subseq_len
    }

    pub fn get_half_steps(&self) -> bool {
        self.half_steps
    }

    /// true if sequences are cut in subsequences before sketching
    pub fn is_partitioned(&self) -> bool {
        self.subseq_len > 0
    }

    pub fn check(&self) -> Result<(), GclustError> {
        if self.kmer_size == 0 || self.kmer_size > MAX_KMER_SIZE {
            let msg = format!("kmer size must be in 1..={}, got {}", MAX_KMER_SIZE, self.kmer_size);
            return Err(GclustError::Params(msg));
        }
        if self.sketch_size == 0 {
            return Err(GclustError::Params("sketch size must be positive".to_string()));
        }
        Ok(())
    }
} // end of impl SketchParams

//==========================================================================================

/// Parameters of the friend index.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexParams {
    /// number of minimal hash values of each sketch the index looks at
    look_at: usize,
    /// minimum number of shared hash values to be a friend
    min_friends: usize,
}

impl IndexParams {
    pub fn new(look_at: usize, min_friends: usize) -> Self {
        IndexParams { look_at, min_friends }
    }

    pub fn get_look_at(&self) -> usize {
        self.look_at
    }

    pub fn get_min_friends(&self) -> usize {
        self.min_friends
    }

    pub fn check(&self) -> Result<(), GclustError> {
        if self.look_at == 0 {
            let msg = "index must look at one hash value at least".to_string();
            return Err(GclustError::Params(msg));
        }
        if self.min_friends == 0 {
            return Err(GclustError::Params("min friends must be at least 1".to_string()));
        }
        if self.min_friends > self.look_at {
            log::warn!(
                "min friends {} greater than number of hash values looked at {}, nothing can match",
                self.min_friends,
                self.look_at
            );
        }
        Ok(())
    }
} // end of impl IndexParams

//==========================================================================================

/// Acceptance policy applied to oracle records.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AcceptParams {
    /// minimum adjusted percent identity
    min_identity: f64,
    /// tolerate one fragment that did not align
    tolerate: bool,
}

impl Default for AcceptParams {
    fn default() -> Self {
        AcceptParams {
            min_identity: 90.,
            tolerate: false,
        }
    }
}

impl AcceptParams {
    pub fn new(min_identity: f64, tolerate: bool) -> Self {
        AcceptParams { min_identity, tolerate }
    }

    pub fn get_min_identity(&self) -> f64 {
        self.min_identity
    }

    pub fn get_tolerate(&self) -> bool {
        self.tolerate
    }

    /// identity scaled by fraction of aligned fragments, see [adjusted_identity].
    /// The tolerance is applied only if configured and allowed by the caller.
    pub fn score(&self, identity: f64, aligned: usize, total: usize, allow_tolerate: bool) -> f64 {
        adjusted_identity(identity, aligned, total, self.tolerate && allow_tolerate)
    }

    pub fn accept(&self, score: f64) -> bool {
        score >= self.min_identity
    }

    pub fn check(&self) -> Result<(), GclustError> {
        if !(0. ..=100.).contains(&self.min_identity) {
            let msg = format!("min identity must be a percentage, got {}", self.min_identity);
            return Err(GclustError::Params(msg));
        }
        Ok(())
    }
} // end of impl AcceptParams

/// identity * aligned / total fragments.
/// With tolerate, total is replaced by max(total - 1, aligned) so one missing fragment is not penalized.
pub fn adjusted_identity(identity: f64, aligned: usize, total: usize, tolerate: bool) -> f64 {
    let effective = if tolerate {
        total.saturating_sub(1).max(aligned)
    } else {
        total
    };
    if effective == 0 {
        return 0.;
    }
    identity * aligned as f64 / effective as f64
} // end of adjusted_identity

//==========================================================================================

/// Gathers all parameters of a run.
/// To be dumped next to results.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct ClustParams {
    sketch: SketchParams,
    index: IndexParams,
    accept: AcceptParams,
    /// dump results already finalized when interrupted
    keep_partial: bool,
} // end of ClustParams

impl Default for ClustParams {
    fn default() -> Self {
        let sketch = SketchParams::default();
        ClustParams {
            sketch,
            index: IndexParams::new(sketch.get_sketch_size(), 1),
            accept: AcceptParams::default(),
            keep_partial: false,
        }
    }
}

impl ClustParams {
    pub fn new(
        sketch: SketchParams,
        index: IndexParams,
        accept: AcceptParams,
        keep_partial: bool,
    ) -> Self {
        ClustParams {
            sketch,
            index,
            accept,
            keep_partial,
        }
    }

    pub fn get_sketch_params(&self) -> &SketchParams {
        &self.sketch
    }

    pub fn get_index_params(&self) -> &IndexParams {
        &self.index
    }

    pub fn get_accept_params(&self) -> &AcceptParams {
        &self.accept
    }

    pub fn get_keep_partial(&self) -> bool {
        self.keep_partial
    }

    pub fn check(&self) -> Result<(), GclustError> {
        self.sketch.check()?;
        self.index.check()?;
        self.accept.check()?;
        if self.index.get_look_at() > self.sketch.get_sketch_size() {
            return Err(GclustError::Params(format!(
                "index looks at {} values but sketches hold only {}",
                self.index.get_look_at(),
                self.sketch.get_sketch_size()
            )));
        }
        Ok(())
    }

    /// dumps in json file named `{prefix}.parameters.json`
    pub fn dump_json(&self, prefix: &str) -> Result<PathBuf, GclustError> {
        let filepath = PathBuf::from(format!("{}.parameters.json", prefix));
        //
        log::info!("dumping ClustParams in json file : {:?}", filepath);
        //
        let file = OpenOptions::new().write(true).create(true).truncate(true).open(&filepath)?;
        let mut writer = BufWriter::new(file);
        to_writer(&mut writer, &self)?;
        writer.flush()?;
        //
        Ok(filepath)
    } // end of dump_json

    /// reload from a json dump
    pub fn reload_json(filepath: &Path) -> Result<Self, GclustError> {
        log::info!("reloading parameters from {:?}", filepath);
        let file = OpenOptions::new().read(true).open(filepath)?;
        let reader = BufReader::new(file);
        let params: Self = serde_json::from_reader(reader)?;
        params.check()?;
        Ok(params)
    } // end of reload_json
} // end of impl ClustParams

//=====================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerate_raises_score() {
        let strict = adjusted_identity(95., 9, 10, false);
        let tolerant = adjusted_identity(95., 9, 10, true);
        assert!(tolerant > strict);
        assert!((strict - 85.5).abs() < 1.0e-9);
        assert!((tolerant - 95.).abs() < 1.0e-9);
    }

    #[test]
    fn tolerate_never_lowers_score() {
        for total in 0..20usize {
            for aligned in 0..=total {
                let strict = adjusted_identity(97.5, aligned, total, false);
                let tolerant = adjusted_identity(97.5, aligned, total, true);
                assert!(tolerant >= strict, "aligned {} total {}", aligned, total);
            }
        }
    }

    #[test]
    fn tolerate_keeps_full_alignment() {
        assert_eq!(adjusted_identity(99., 10, 10, true), 99.);
        assert_eq!(adjusted_identity(99., 1, 1, true), 99.);
        assert_eq!(adjusted_identity(99., 0, 0, false), 0.);
    }

    #[test]
    fn params_json_reload() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("run");
        let params = ClustParams::new(
            SketchParams::new(15, 30, 7, 5000, true),
            IndexParams::new(10, 2),
            AcceptParams::new(95., true),
            true,
        );
        let path = params.dump_json(prefix.to_str().unwrap()).unwrap();
        let reloaded = ClustParams::reload_json(&path).unwrap();
        assert_eq!(reloaded.get_sketch_params(), params.get_sketch_params());
        assert_eq!(reloaded.get_index_params(), params.get_index_params());
        assert_eq!(reloaded.get_accept_params(), params.get_accept_params());
        assert!(reloaded.get_keep_partial());
    }

    #[test]
    fn bad_params_rejected() {
        assert!(SketchParams::new(33, 20, 0, 0, false).check().is_err());
        assert!(IndexParams::new(5, 0).check().is_err());
        assert!(AcceptParams::new(120., false).check().is_err());
        let params = ClustParams::new(SketchParams::default(), IndexParams::new(50, 1), AcceptParams::default(), false);
        assert!(params.check().is_err());
    }
} // end of mod tests
