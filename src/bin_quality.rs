use std::collections::BTreeSet;
use std::io::{BufRead, BufReader, Write};

use crate::bins::{Bin, Partition};
use crate::contig::ContigSet;
use crate::errors::{BinvoteError, BinvoteResult};
use crate::pair_scorer::role_counts;

/// The universal roles a complete single genome is expected to carry.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpectedRoles {
    /// Only the number of roles is known, every detected role counts.
    Count(usize),
    /// Only the listed roles count towards completeness and contamination.
    Roles(BTreeSet<String>),
}

impl ExpectedRoles {
    pub fn expected_count(&self) -> usize {
        match self {
            ExpectedRoles::Count(count) => *count,
            ExpectedRoles::Roles(roles) => roles.len(),
        }
    }

    fn counts(&self, role: &str) -> bool {
        match self {
            ExpectedRoles::Count(_) => true,
            ExpectedRoles::Roles(roles) => roles.contains(role),
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct BinQuality {
    pub bin_id: String,
    pub num_contigs: usize,
    pub total_length: u64,
    pub n50: u64,
    pub roles_found: usize,
    pub expected_roles: usize,
    /// Percentage of expected roles found, at most 100
    pub completeness: f64,
    /// Number of roles found more than once
    pub duplicated_roles: usize,
    /// Extra copies of roles as a percentage of the expected roles
    pub contamination: f64,
}

#[derive(Debug, PartialEq)]
pub struct PartitionSummary {
    pub num_bins: usize,
    pub num_singleton_bins: usize,
    pub largest_bin: usize,
    pub total_length: u64,
    /// Number of contigs in each bin, largest first
    pub bin_sizes: Vec<usize>,
}

pub fn calculate_bin_quality(
    bin: &Bin,
    contigs: &ContigSet,
    expected: &ExpectedRoles,
) -> BinQuality {
    let lengths: Vec<u64> = bin
        .contig_ids
        .iter()
        .filter_map(|id| contigs.get(id).map(|c| c.length))
        .collect();

    let counts = role_counts(&bin.roles);
    let mut roles_found = 0;
    let mut duplicated_roles = 0;
    let mut extra_copies = 0;
    for (role, count) in counts.iter() {
        if !expected.counts(role) {
            continue;
        }
        roles_found += 1;
        if *count > 1 {
            duplicated_roles += 1;
            extra_copies += count - 1;
        }
    }
    let expected_roles = expected.expected_count();
    let percentage = |numerator: usize| match expected_roles {
        0 => 0.0,
        _ => 100.0 * numerator as f64 / expected_roles as f64,
    };

    BinQuality {
        bin_id: bin.id.clone(),
        num_contigs: bin.len(),
        total_length: bin.total_length,
        n50: n50(&lengths),
        roles_found,
        expected_roles,
        // Only a role count is known, so more distinct roles than expected
        // can be found.
        completeness: percentage(roles_found).min(100.0),
        duplicated_roles,
        contamination: percentage(extra_copies),
    }
}

pub fn calculate_partition_quality(
    partition: &Partition,
    contigs: &ContigSet,
    expected: &ExpectedRoles,
) -> Vec<BinQuality> {
    partition
        .bins()
        .iter()
        .map(|bin| calculate_bin_quality(bin, contigs, expected))
        .collect()
}

pub fn summarise_partition(partition: &Partition) -> PartitionSummary {
    let mut bin_sizes: Vec<usize> = partition.bins().iter().map(|b| b.len()).collect();
    bin_sizes.sort_unstable_by(|a, b| b.cmp(a));
    PartitionSummary {
        num_bins: bin_sizes.len(),
        num_singleton_bins: bin_sizes.iter().filter(|s| **s == 1).count(),
        largest_bin: bin_sizes.first().copied().unwrap_or(0),
        total_length: partition.bins().iter().map(|b| b.total_length).sum(),
        bin_sizes,
    }
}

/// Length of the contig at which the longest contigs reach half of the
/// total length.
pub fn n50(lengths: &[u64]) -> u64 {
    let mut sorted = lengths.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    let total: u64 = sorted.iter().sum();
    let mut n50_sum = 0u64;
    for length in sorted {
        n50_sum += length;
        if n50_sum * 2 >= total {
            return length;
        }
    }
    0
}

/// Read a list of universal roles, one per line.
pub fn read_universal_roles_file(file_path: &str) -> BinvoteResult<BTreeSet<String>> {
    let reader = BufReader::new(std::fs::File::open(file_path)?);
    let mut roles = BTreeSet::new();
    for line in reader.lines() {
        let line = line?;
        let role = line.trim_end();
        if !role.is_empty() {
            roles.insert(role.to_string());
        }
    }
    if roles.is_empty() {
        return Err(BinvoteError::InvalidArgument(format!(
            "no roles found in universal roles file {}",
            file_path
        )));
    }
    debug!("Read in {} universal roles from {}", roles.len(), file_path);
    Ok(roles)
}

pub fn write_quality_report<W: Write>(qualities: &[BinQuality], writer: W) -> BinvoteResult<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(writer);
    wtr.write_record(&[
        "bin",
        "contigs",
        "total_length",
        "n50",
        "roles_found",
        "expected_roles",
        "completeness",
        "duplicated_roles",
        "contamination",
    ])?;
    for q in qualities {
        wtr.write_record(&[
            q.bin_id.clone(),
            q.num_contigs.to_string(),
            q.total_length.to_string(),
            q.n50.to_string(),
            q.roles_found.to_string(),
            q.expected_roles.to_string(),
            format!("{:.2}", q.completeness),
            q.duplicated_roles.to_string(),
            format!("{:.2}", q.contamination),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
