//! Exact identity oracle.
//!
//! The orchestrators only see the [AniOracle] trait : two lists of fasta files in,
//! comparison records out. Pairs the oracle could not align are simply absent.
//! [FastAni] runs the fastANI binary, tests use in memory stubs.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;

use crate::errors::GclustError;
use crate::utils::files::scratch_base;

/// default name of fastANI executable
pub const FASTANI: &str = "fastANI";

/// One comparison, a line of fastANI tabular output.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct AniRecord {
    /// label (file path) of query
    pub query: String,
    /// label (file path) of reference
    pub reference: String,
    /// percent identity
    pub identity: f64,
    /// number of fragments aligned
    pub aligned: usize,
    /// number of fragments of query
    pub total: usize,
}

/// Computes exact pairwise identities between query and reference files.
pub trait AniOracle {
    fn compare(&self, queries: &[PathBuf], refs: &[PathBuf]) -> Result<Vec<AniRecord>, GclustError>;
}

impl<O: AniOracle + ?Sized> AniOracle for &O {
    fn compare(&self, queries: &[PathBuf], refs: &[PathBuf]) -> Result<Vec<AniRecord>, GclustError> {
        (**self).compare(queries, refs)
    }
}

//======================================================================================

/// Oracle running fastANI as a subprocess, one process per call.
#[derive(Clone, Debug)]
pub struct FastAni {
    program: PathBuf,
}

impl Default for FastAni {
    fn default() -> Self {
        FastAni {
            program: PathBuf::from(FASTANI),
        }
    }
}

impl FastAni {
    pub fn new(program: &Path) -> Self {
        FastAni {
            program: program.to_path_buf(),
        }
    }

    pub fn get_program(&self) -> &Path {
        &self.program
    }

    /// checks fastANI can be run
    pub fn check(&self) -> Result<(), GclustError> {
        log::info!("checking {:?}", self.program);
        let output = Command::new(&self.program)
            .arg("-h")
            .output()
            .map_err(|e| GclustError::OracleFailed {
                args: vec![self.program.display().to_string(), "-h".to_string()],
                status: "not started".to_string(),
                output: e.to_string(),
            })?;
        if !output.status.success() {
            return Err(GclustError::OracleFailed {
                args: vec![self.program.display().to_string(), "-h".to_string()],
                status: output.status.to_string(),
                output: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(())
    } // end of check
} // end of impl FastAni

// one path per line
fn write_list(paths: &[PathBuf], file: &Path) -> Result<(), GclustError> {
    let data: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
    fs::write(file, data.join("\n"))?;
    Ok(())
}

/// decodes fastANI tab separated output : query, reference, identity, aligned, total
pub fn read_ani<R: std::io::Read>(reader: R) -> Result<Vec<AniRecord>, GclustError> {
    let mut rdr = csv::ReaderBuilder::new().has_headers(false).delimiter(b'\t').from_reader(reader);
    let mut records = Vec::new();
    for rec in rdr.deserialize() {
        let rec: AniRecord = rec?;
        log::trace!("oracle record {:?}", rec);
        records.push(rec);
    }
    Ok(records)
} // end of read_ani

impl AniOracle for FastAni {
    fn compare(&self, queries: &[PathBuf], refs: &[PathBuf]) -> Result<Vec<AniRecord>, GclustError> {
        let dir = tempfile::Builder::new().prefix("fastani-").tempdir_in(scratch_base())?;
        let qfile = dir.path().join("q");
        let rfile = dir.path().join("r");
        let ofile = dir.path().join("o");
        write_list(queries, &qfile)?;
        write_list(refs, &rfile)?;
        //
        let mut cmd = Command::new(&self.program);
        cmd.arg("--ql").arg(&qfile).arg("--rl").arg(&rfile).arg("-o").arg(&ofile);
        let args: Vec<String> = std::iter::once(self.program.display().to_string())
            .chain(cmd.get_args().map(|a| a.to_string_lossy().into_owned()))
            .collect();
        log::debug!("running {:?}, nb queries {}, nb refs {}", args, queries.len(), refs.len());
        let output = cmd.output().map_err(|e| GclustError::OracleFailed {
            args: args.clone(),
            status: "not started".to_string(),
            output: e.to_string(),
        })?;
        if !output.status.success() {
            let mut out = String::from_utf8_lossy(&output.stdout).into_owned();
            out.push_str(&String::from_utf8_lossy(&output.stderr));
            log::error!("fastANI failed : {:?}", args);
            return Err(GclustError::OracleFailed {
                args,
                status: output.status.to_string(),
                output: out,
            });
        }
        // fastANI does not create output when nothing aligned
        if !ofile.exists() {
            return Ok(Vec::new());
        }
        let records = read_ani(fs::File::open(&ofile)?)?;
        if let Err(e) = dir.close() {
            log::warn!("could not remove fastANI directory : {}", e);
        }
        Ok(records)
    } // end of compare
} // end of impl AniOracle for FastAni
