use std::result::Result as StdResult;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BinvoteError {
    #[error("failed to load/read/write file: {0:?}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse tab separated file: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to parse {path} at line {line}: {message}")]
    Parse {
        path: String,
        line: u64,
        message: String,
    },
    #[error("no weighting schemes were given, cannot vote with zero voters")]
    EmptySchemeList,
    #[error("cutoff percentage must be between 0 and 100, found {0}")]
    CutoffOutOfRange(f64),
    #[error("scheme '{label}' has no non-zero coverage, tetranucleotide, reference or role weight")]
    AllZeroScheme { label: String },
    #[error("scheme '{label}' has invalid {name} weight: {value}")]
    InvalidWeight {
        label: String,
        name: &'static str,
        value: f64,
    },
    #[error("no contigs were given")]
    NoContigs,
    #[error("contig '{0}' was found multiple times")]
    DuplicateContig(String),
    #[error("contig '{0}' is not among the input contigs")]
    UnknownContig(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("partition invariant violated: {0}")]
    InvariantViolation(String),
}

pub type BinvoteResult<T> = StdResult<T, BinvoteError>;
