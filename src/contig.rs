use std::collections::BTreeMap;

use crate::errors::{BinvoteError, BinvoteResult};

/// Closest reference genome reported for a contig by the homology search,
/// along with the similarity score of that hit.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceCall {
    pub genome: String,
    pub score: f64,
}

/// Precomputed features of a single assembled contig. Empty vectors and a
/// `None` reference mean the feature pipeline reported nothing for that
/// signal.
#[derive(Debug, Clone, PartialEq)]
pub struct Contig {
    pub id: String,
    pub length: u64,
    /// Mean coverage, one value per sample
    pub coverage: Vec<f64>,
    /// Tetranucleotide frequencies, summing to 1
    pub tetranucleotide: Vec<f64>,
    pub reference: Option<ReferenceCall>,
    /// Universal roles detected on the contig. Repeats are kept since they
    /// signal contamination.
    pub roles: Vec<String>,
}

impl Contig {
    pub fn new(id: &str, length: u64) -> Contig {
        Contig {
            id: id.to_string(),
            length,
            coverage: vec![],
            tetranucleotide: vec![],
            reference: None,
            roles: vec![],
        }
    }

    pub fn has_features(&self) -> bool {
        !self.coverage.is_empty()
            || !self.tetranucleotide.is_empty()
            || self.reference.is_some()
            || !self.roles.is_empty()
    }
}

/// Validated contigs sorted by ID. The sort order is the processing order
/// of every clustering pass.
#[derive(Debug, Clone)]
pub struct ContigSet {
    contigs: Vec<Contig>,
    index: BTreeMap<String, usize>,
}

impl ContigSet {
    /// Check the contigs, sort them and absorb per-contig data errors by
    /// dropping the offending feature vector.
    pub fn new(mut contigs: Vec<Contig>) -> BinvoteResult<ContigSet> {
        if contigs.is_empty() {
            return Err(BinvoteError::NoContigs);
        }
        contigs.sort_by(|a, b| a.id.cmp(&b.id));
        let mut index = BTreeMap::new();
        for (i, contig) in contigs.iter().enumerate() {
            if contig.length == 0 {
                return Err(BinvoteError::InvalidArgument(format!(
                    "contig '{}' has length 0",
                    contig.id
                )));
            }
            if index.insert(contig.id.clone(), i).is_some() {
                return Err(BinvoteError::DuplicateContig(contig.id.clone()));
            }
        }

        let coverage_samples = majority_length(contigs.iter().map(|c| &c.coverage));
        let tetranucleotide_dimension =
            majority_length(contigs.iter().map(|c| &c.tetranucleotide));
        for contig in contigs.iter_mut() {
            sanitise_coverage(contig, coverage_samples);
            sanitise_tetranucleotide(contig, tetranucleotide_dimension);
            if let Some(reference) = &contig.reference {
                if !reference.score.is_finite() {
                    warn!(
                        "Ignoring reference call of contig {} with score {}",
                        contig.id, reference.score
                    );
                    contig.reference = None;
                }
            }
            if !contig.has_features() {
                debug!("Contig {} has no usable features", contig.id);
            }
        }

        Ok(ContigSet { contigs, index })
    }

    pub fn len(&self) -> usize {
        self.contigs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contigs.is_empty()
    }

    pub fn contigs(&self) -> &[Contig] {
        &self.contigs
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Contig> {
        self.contigs.iter()
    }

    pub fn get(&self, contig_id: &str) -> Option<&Contig> {
        self.index.get(contig_id).map(|i| &self.contigs[*i])
    }

    pub fn index_of(&self, contig_id: &str) -> Option<usize> {
        self.index.get(contig_id).copied()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.contigs.iter().map(|c| c.id.as_str()).collect()
    }
}

/// Most common non-zero length, ties going to the shorter length.
fn majority_length<'a>(vectors: impl Iterator<Item = &'a Vec<f64>>) -> Option<usize> {
    let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
    for v in vectors.filter(|v| !v.is_empty()) {
        *counts.entry(v.len()).or_insert(0) += 1;
    }
    let mut best: Option<(usize, usize)> = None;
    for (length, count) in counts {
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((length, count));
        }
    }
    best.map(|(length, _)| length)
}

fn all_valid(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite() && *v >= 0.0)
}

fn sanitise_coverage(contig: &mut Contig, expected_samples: Option<usize>) {
    if contig.coverage.is_empty() {
        return;
    }
    if !all_valid(&contig.coverage) {
        warn!(
            "Ignoring coverage of contig {} since it contains negative or non-finite values",
            contig.id
        );
        contig.coverage.clear();
    } else if Some(contig.coverage.len()) != expected_samples {
        warn!(
            "Ignoring coverage of contig {}: found {} samples, expected {:?}",
            contig.id,
            contig.coverage.len(),
            expected_samples
        );
        contig.coverage.clear();
    }
}

fn sanitise_tetranucleotide(contig: &mut Contig, expected_dimension: Option<usize>) {
    if contig.tetranucleotide.is_empty() {
        return;
    }
    if !all_valid(&contig.tetranucleotide) {
        warn!(
            "Ignoring tetranucleotide vector of contig {} since it contains negative or non-finite values",
            contig.id
        );
        contig.tetranucleotide.clear();
        return;
    }
    if Some(contig.tetranucleotide.len()) != expected_dimension {
        warn!(
            "Ignoring tetranucleotide vector of contig {}: found {} dimensions, expected {:?}",
            contig.id,
            contig.tetranucleotide.len(),
            expected_dimension
        );
        contig.tetranucleotide.clear();
        return;
    }
    let total: f64 = contig.tetranucleotide.iter().sum();
    if total <= 0.0 {
        warn!(
            "Ignoring all-zero tetranucleotide vector of contig {}",
            contig.id
        );
        contig.tetranucleotide.clear();
    } else if (total - 1.0).abs() > 1e-9 {
        trace!("Renormalising tetranucleotide vector of {}", contig.id);
        for v in contig.tetranucleotide.iter_mut() {
            *v /= total;
        }
    }
}
