//! This file contains fasta parsing and the scratch directory holding one file per sequence.
//! Staged files are named `{rank}.fa`, the oracle labels its results with these paths
//! and [fa_number] recovers the rank from a label.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use super::idsketch::{IdSeq, SeqDict};
use crate::cancel::CancelFlag;
use crate::errors::GclustError;

/// prefix of scratch directories
const SCRATCH_PREFIX: &str = "gclust-";

/// opens and parses a fasta file with needletail, possibly compressed,
/// and executes seq_task on each sequence in order. Stops at first error.
/// Names are the header ids, residues are uppercased, ranks are positions in file.
pub fn process_fasta<F>(path: &Path, mut seq_task: F) -> Result<usize, GclustError>
where
    F: FnMut(IdSeq) -> Result<(), GclustError>,
{
    let mut reader = needletail::parse_fastx_file(path).map_err(|e| GclustError::Input {
        path: path.to_path_buf(),
        msg: e.to_string(),
    })?;
    let mut nb_seq = 0;
    while let Some(record) = reader.next() {
        let seqrec = record.map_err(|e| GclustError::Input {
            path: path.to_path_buf(),
            msg: e.to_string(),
        })?;
        let name = String::from_utf8_lossy(seqrec.id()).into_owned();
        let seq = seqrec.seq().to_ascii_uppercase();
        log::trace!("read sequence {} len {}", name, seq.len());
        seq_task(IdSeq::new(nb_seq, name, seq))?;
        nb_seq += 1;
    }
    Ok(nb_seq)
} // end of process_fasta

/// reads a whole fasta file in memory
pub fn read_fasta(path: &Path) -> Result<SeqDict, GclustError> {
    log::info!("reading sequences from {:?}", path);
    let mut seqdict = SeqDict::new(10_000);
    process_fasta(path, |seq| {
        seqdict.push_idseq(seq);
        if seqdict.len() % 100_000 == 0 {
            log::info!("nb sequences read : {}", seqdict.len());
        }
        Ok(())
    })?;
    let total = seqdict.get_total_length();
    log::info!("read nb sequences : {}, total length : {}", seqdict.len(), total);
    Ok(seqdict)
} // end of read_fasta

/// returns the rank encoded in a label ending with `{rank}.fa`
pub fn fa_number(label: &str) -> Option<usize> {
    let stem = label.strip_suffix(".fa")?;
    let start = stem.rfind(|c: char| !c.is_ascii_digit()).map(|i| i + 1).unwrap_or(0);
    let digits = &stem[start..];
    if digits.is_empty() {
        return None;
    }
    digits.parse::<usize>().ok()
} // end of fa_number

/// same as [fa_number] but a failure is a broken naming contract
pub fn label_rank(label: &str) -> Result<usize, GclustError> {
    fa_number(label).ok_or_else(|| GclustError::BadLabel(label.to_string()))
}

/// Location for scratch files, shared memory when it exists.
pub fn scratch_base() -> PathBuf {
    let shm = Path::new("/dev/shm");
    if cfg!(target_os = "linux") && shm.is_dir() {
        shm.to_path_buf()
    } else {
        std::env::temp_dir()
    }
}

//=====================================================================================

/// A per-run directory with one fasta file per sequence.
/// Removed by [ScratchDir::close] or on drop.
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    /// creates a scratch directory in base, [scratch_base] for a run
    pub fn new_in(base: &Path) -> Result<Self, GclustError> {
        let dir = tempfile::Builder::new().prefix(SCRATCH_PREFIX).tempdir_in(base)?;
        log::info!("scratch directory : {:?}", dir.path());
        Ok(ScratchDir { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// path of staged file for sequence of rank
    pub fn seq_path(&self, rank: usize) -> PathBuf {
        self.dir.path().join(format!("{}.fa", rank))
    }

    /// writes one sequence in its staged file, returns the path
    pub fn write_seq(&self, seq: &IdSeq) -> Result<PathBuf, GclustError> {
        let path = self.seq_path(seq.get_rank());
        fs::write(&path, seq.to_fasta())?;
        Ok(path)
    }

    /// writes a sequence under an explicit file name
    pub fn write_named(&self, filename: &str, seq: &IdSeq) -> Result<PathBuf, GclustError> {
        let path = self.dir.path().join(filename);
        fs::write(&path, seq.to_fasta())?;
        Ok(path)
    }

    /// stages every sequence, checking for interruption between files
    pub fn write_all(&self, seqdict: &SeqDict, cancel: &CancelFlag) -> Result<(), GclustError> {
        log::info!("writing {} sequence files into {:?}", seqdict.len(), self.path());
        for seq in seqdict.iter() {
            if cancel.is_cancelled() {
                return Err(GclustError::Interrupted);
            }
            self.write_seq(seq)?;
        }
        Ok(())
    } // end of write_all

    /// removes the directory. Failure is logged, it does not affect results.
    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => log::info!("removed scratch directory {:?}", path),
            Err(e) => log::warn!("could not remove scratch directory {:?} : {}", path, e),
        }
    }
} // end of impl ScratchDir

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn fa_number_parses_labels() {
        assert_eq!(fa_number("/dev/shm/gclust-x1/12.fa"), Some(12));
        assert_eq!(fa_number("0.fa"), Some(0));
        assert_eq!(fa_number("/tmp/gclust-ab/3.q.fa"), None);
        assert_eq!(fa_number("/tmp/abc.fa"), None);
        assert_eq!(fa_number("/tmp/12.fasta"), None);
        assert!(label_rank("foo").is_err());
    }

    #[test]
    fn read_and_stage() {
        let dir = tempfile::tempdir().unwrap();
        let fasta = dir.path().join("in.fa");
        {
            let mut f = std::fs::File::create(&fasta).unwrap();
            writeln!(f, ">s0 first\nACGTACGT\nacgt\n>s1\nTTTT").unwrap();
        }
        let seqdict = read_fasta(&fasta).unwrap();
        assert_eq!(seqdict.len(), 2);
        assert_eq!(seqdict.get(0).unwrap().get_sequence(), b"ACGTACGTACGT");
        assert_eq!(seqdict.get(1).unwrap().get_name(), "s1");
        //
        let scratch = ScratchDir::new_in(dir.path()).unwrap();
        let scratch_path = scratch.path().to_path_buf();
        scratch.write_all(&seqdict, &CancelFlag::new()).unwrap();
        let staged = std::fs::read_to_string(scratch.seq_path(1)).unwrap();
        assert_eq!(staged, ">s1\nTTTT\n");
        assert_eq!(fa_number(scratch.seq_path(1).to_str().unwrap()), Some(1));
        scratch.close();
        assert!(!scratch_path.exists());
    }

    #[test]
    fn staging_stops_on_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let mut seqdict = SeqDict::new(1);
        seqdict.push("a".to_string(), b"ACGT".to_vec());
        let cancel = CancelFlag::new();
        cancel.cancel();
        let scratch = ScratchDir::new_in(dir.path()).unwrap();
        let res = scratch.write_all(&seqdict, &cancel);
        assert!(matches!(res, Err(GclustError::Interrupted)));
        assert!(!scratch.seq_path(0).exists());
    }

    #[test]
    fn missing_file_is_input_error() {
        let res = read_fasta(Path::new("/nonexistent/none.fa"));
        assert!(matches!(res, Err(GclustError::Input { .. })));
    }
}
