//! error type shared by indexing, oracle calls and orchestrators.
//!
//! Nothing is retried. Every variant but [GclustError::Interrupted] is a failure,
//! Interrupted is the user asking us to stop.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GclustError {
    /// unreadable input file or malformed sequence record
    #[error("input error in {path:?} : {msg}")]
    Input { path: PathBuf, msg: String },
    ///
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// oracle could not be spawned or exited with failure
    #[error("oracle failed : {args:?} status {status}, output : {output}")]
    OracleFailed {
        args: Vec<String>,
        status: String,
        output: String,
    },
    /// oracle table could not be decoded
    #[error("could not decode oracle output : {0}")]
    OracleOutput(#[from] csv::Error),
    /// a comparison label does not map back to a staged sequence file
    #[error("bad sequence label : {0}")]
    BadLabel(String),
    /// user requested interruption
    #[error("interrupted")]
    Interrupted,
    ///
    #[error("invalid parameters : {0}")]
    Params(String),
    ///
    #[error(transparent)]
    Json(#[from] serde_json::Error),
} // end of GclustError

impl GclustError {
    /// true if this is the cancellation path and not a failure
    pub fn is_interrupted(&self) -> bool {
        matches!(self, GclustError::Interrupted)
    }
}
