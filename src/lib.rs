pub mod bin_exchange_file;
pub mod bin_quality;
pub mod bins;
pub mod cluster_argument_parsing;
pub mod cluster_validation;
pub mod clusterer;
pub mod consensus;
pub mod consensus_tally;
pub mod contig;
pub mod errors;
pub mod pair_scorer;
pub mod weighting_scheme;

#[macro_use]
extern crate log;
extern crate clap;
extern crate rayon;

use crate::contig::Contig;
use crate::weighting_scheme::WeightingScheme;

/// Scores how strongly two contigs (or the merged features of two bins)
/// belong together under one weighting scheme.
pub trait PairScorer {
    /// Returns the pair's score when it reaches the scheme's threshold, and
    /// None when the pair should not be joined.
    fn score(&self, contig1: &Contig, contig2: &Contig, scheme: &WeightingScheme) -> Option<f64>;

    fn method_name(&self) -> &str;
}

pub const DEFAULT_CUTOFF: &str = "70";
pub const DEFAULT_MISSING_FEATURE_POLICY: &str = "omit";

pub const AUTHOR: &str =
    "Ben J. Woodcroft, Centre for Microbiome Research, Queensland University of Technology";
