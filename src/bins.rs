use std::collections::{BTreeMap, BTreeSet};

use crate::contig::{Contig, ReferenceCall};
use crate::errors::{BinvoteError, BinvoteResult};

/// A group of contigs thought to come from one organism, with aggregate
/// features of its members.
#[derive(Debug, Clone, PartialEq)]
pub struct Bin {
    /// ID of the founding contig, which is the first member in ID order.
    pub id: String,
    pub contig_ids: Vec<String>,
    pub total_length: u64,
    /// Length-weighted mean over members with coverage
    pub coverage: Vec<f64>,
    /// Length-weighted mean over members with a composition vector
    pub tetranucleotide: Vec<f64>,
    pub references: Vec<ReferenceCall>,
    pub roles: Vec<String>,
}

impl Bin {
    /// Aggregate the given members. They are re-sorted by ID so the
    /// aggregates do not depend on the order they were given in.
    pub fn from_members(members: &[&Contig]) -> Bin {
        assert!(!members.is_empty(), "Programming error: empty bin");
        let mut members = members.to_vec();
        members.sort_by(|a, b| a.id.cmp(&b.id));

        let total_length = members.iter().map(|c| c.length).sum();
        let coverage = weighted_mean(members.iter().map(|c| (c.length, &c.coverage)));
        let tetranucleotide =
            weighted_mean(members.iter().map(|c| (c.length, &c.tetranucleotide)));

        Bin {
            id: members[0].id.clone(),
            contig_ids: members.iter().map(|c| c.id.clone()).collect(),
            total_length,
            coverage,
            tetranucleotide,
            references: members.iter().filter_map(|c| c.reference.clone()).collect(),
            roles: members.iter().flat_map(|c| c.roles.iter().cloned()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.contig_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contig_ids.is_empty()
    }

    /// Most frequently called reference genome, ties going to the smallest
    /// genome ID. The score is the mean over calls to that genome.
    pub fn dominant_reference(&self) -> Option<ReferenceCall> {
        let mut tallies: BTreeMap<&str, (usize, f64)> = BTreeMap::new();
        for call in &self.references {
            let entry = tallies.entry(call.genome.as_str()).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += call.score;
        }
        let mut best: Option<(&str, usize, f64)> = None;
        for (genome, (count, score_sum)) in tallies {
            if best.map_or(true, |(_, best_count, _)| count > best_count) {
                best = Some((genome, count, score_sum));
            }
        }
        best.map(|(genome, count, score_sum)| ReferenceCall {
            genome: genome.to_string(),
            score: score_sum / count as f64,
        })
    }

    /// Represent the whole bin as a single contig carrying its aggregate
    /// features, so bins can be scored against each other.
    pub fn to_contig(&self) -> Contig {
        Contig {
            id: self.id.clone(),
            length: self.total_length,
            coverage: self.coverage.clone(),
            tetranucleotide: self.tetranucleotide.clone(),
            reference: self.dominant_reference(),
            roles: self.roles.clone(),
        }
    }
}

fn weighted_mean<'a>(vectors: impl Iterator<Item = (u64, &'a Vec<f64>)>) -> Vec<f64> {
    let present: Vec<(u64, &Vec<f64>)> = vectors.filter(|(_, v)| !v.is_empty()).collect();
    // A lone vector is kept exactly, so a bin's aggregates match those of
    // its single member.
    match present.len() {
        0 => return vec![],
        1 => return present[0].1.clone(),
        _ => {}
    }
    let dimension = present[0].1.len();
    let mut sums: Vec<f64> = vec![0.0; dimension];
    let mut total_weight = 0u64;
    for (weight, vector) in present {
        if vector.len() != dimension {
            continue;
        }
        for (sum, value) in sums.iter_mut().zip(vector.iter()) {
            *sum += weight as f64 * value;
        }
        total_weight += weight;
    }
    if total_weight > 0 {
        for sum in sums.iter_mut() {
            *sum /= total_weight as f64;
        }
    }
    sums
}

/// Bins covering every input contig exactly once, sorted by bin ID.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    bins: Vec<Bin>,
}

impl Partition {
    pub fn new(mut bins: Vec<Bin>) -> Partition {
        bins.sort_by(|a, b| a.id.cmp(&b.id));
        Partition { bins }
    }

    /// Every contig in a bin of its own.
    pub fn singletons(contigs: &[Contig]) -> Partition {
        Partition::new(contigs.iter().map(|c| Bin::from_members(&[c])).collect())
    }

    /// Build bins from sets of indices into `contigs`.
    pub fn from_index_sets(contigs: &[Contig], sets: &[Vec<usize>]) -> Partition {
        Partition::new(
            sets.iter()
                .map(|set| {
                    let members: Vec<&Contig> = set.iter().map(|i| &contigs[*i]).collect();
                    Bin::from_members(&members)
                })
                .collect(),
        )
    }

    pub fn bins(&self) -> &[Bin] {
        &self.bins
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn bin_of(&self, contig_id: &str) -> Option<&Bin> {
        self.bins
            .iter()
            .find(|b| b.contig_ids.iter().any(|c| c == contig_id))
    }

    pub fn same_bin(&self, contig1: &str, contig2: &str) -> bool {
        match (self.bin_of(contig1), self.bin_of(contig2)) {
            (Some(b1), Some(b2)) => b1.id == b2.id,
            _ => false,
        }
    }

    /// Member lists of each bin, for comparing partitions without their
    /// aggregate features.
    pub fn memberships(&self) -> Vec<Vec<String>> {
        self.bins.iter().map(|b| b.contig_ids.clone()).collect()
    }

    /// Each contig of the universe must be in exactly one bin, and no bin
    /// may be empty or hold a contig outside the universe.
    pub fn check_invariants(&self, universe: &[&str]) -> BinvoteResult<()> {
        let expected: BTreeSet<&str> = universe.iter().copied().collect();
        let mut seen: BTreeMap<&str, &str> = BTreeMap::new();
        for bin in &self.bins {
            if bin.is_empty() {
                return Err(BinvoteError::InvariantViolation(format!(
                    "bin {} is empty",
                    bin.id
                )));
            }
            for contig_id in &bin.contig_ids {
                if !expected.contains(contig_id.as_str()) {
                    return Err(BinvoteError::InvariantViolation(format!(
                        "bin {} contains unknown contig {}",
                        bin.id, contig_id
                    )));
                }
                if let Some(previous) = seen.insert(contig_id.as_str(), bin.id.as_str()) {
                    return Err(BinvoteError::InvariantViolation(format!(
                        "contig {} is in both bin {} and bin {}",
                        contig_id, previous, bin.id
                    )));
                }
            }
        }
        if let Some(missing) = expected.iter().find(|id| !seen.contains_key(*id)) {
            return Err(BinvoteError::InvariantViolation(format!(
                "contig {} is not in any bin",
                missing
            )));
        }
        Ok(())
    }
}
