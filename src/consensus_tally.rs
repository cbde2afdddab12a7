use std::io::Write;
use std::path::Path;

use crate::bins::Partition;
use crate::errors::{BinvoteError, BinvoteResult};

/// Number of schemes that placed each pair of contigs in the same bin.
/// Like a BTreeMap except the contig IDs of each key are sorted before
/// insertion / get etc.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConsensusTally {
    internal: std::collections::BTreeMap<(String, String), u32>,
    num_schemes: usize,
}

fn sorted_key(contig_ids: (&str, &str)) -> (String, String) {
    if contig_ids.0 < contig_ids.1 {
        (contig_ids.0.to_string(), contig_ids.1.to_string())
    } else {
        (contig_ids.1.to_string(), contig_ids.0.to_string())
    }
}

impl ConsensusTally {
    pub fn new() -> ConsensusTally {
        ConsensusTally::default()
    }

    /// Tally of a single scheme's partition: one vote for every pair of
    /// contigs sharing a bin.
    pub fn from_partition(partition: &Partition) -> ConsensusTally {
        let mut tally = ConsensusTally::new();
        tally.add_partition(partition);
        tally
    }

    pub fn add_partition(&mut self, partition: &Partition) {
        for bin in partition.bins() {
            for (i, contig1) in bin.contig_ids.iter().enumerate() {
                for contig2 in &bin.contig_ids[(i + 1)..] {
                    self.increment((contig1.as_str(), contig2.as_str()));
                }
            }
        }
        self.num_schemes += 1;
    }

    pub fn increment(&mut self, contig_ids: (&str, &str)) {
        assert_ne!(
            contig_ids.0, contig_ids.1,
            "Programming error: contig paired with itself"
        );
        *self.internal.entry(sorted_key(contig_ids)).or_insert(0) += 1;
    }

    pub fn insert(&mut self, contig_ids: (&str, &str), count: u32) {
        self.internal.insert(sorted_key(contig_ids), count);
    }

    pub fn get(&self, contig_ids: (&str, &str)) -> Option<u32> {
        self.internal.get(&sorted_key(contig_ids)).copied()
    }

    pub fn contains_key(&self, contig_ids: (&str, &str)) -> bool {
        self.internal.contains_key(&sorted_key(contig_ids))
    }

    /// Add the votes of another tally into this one.
    pub fn merge(&mut self, other: ConsensusTally) {
        for (key, count) in other.internal {
            *self.internal.entry(key).or_insert(0) += count;
        }
        self.num_schemes += other.num_schemes;
    }

    pub fn num_schemes(&self) -> usize {
        self.num_schemes
    }

    pub fn set_num_schemes(&mut self, num_schemes: usize) {
        self.num_schemes = num_schemes;
    }

    pub fn len(&self) -> usize {
        self.internal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.internal.is_empty()
    }

    /// Pairs in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, u32)> {
        self.internal
            .iter()
            .map(|((c1, c2), count)| (c1.as_str(), c2.as_str(), *count))
    }
}

/// Write the tally as three tab separated columns: contig, contig, count.
pub fn write_tally<W: Write>(tally: &ConsensusTally, writer: W) -> BinvoteResult<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(writer);
    for (contig1, contig2, count) in tally.iter() {
        let count = count.to_string();
        wtr.write_record(&[contig1, contig2, count.as_str()])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_tally_file(tally: &ConsensusTally, file_path: &str) -> BinvoteResult<()> {
    let file = std::fs::File::create(Path::new(file_path))?;
    write_tally(tally, file)?;
    info!("Wrote {} tallied contig pairs to {}", tally.len(), file_path);
    Ok(())
}

/// Read a tally written by `write_tally_file`. The number of schemes is not
/// part of the file so must be given.
pub fn read_tally_file(file_path: &str, num_schemes: usize) -> BinvoteResult<ConsensusTally> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_path(Path::new(file_path))?;

    let mut tally = ConsensusTally::new();
    tally.set_num_schemes(num_schemes);
    for result in rdr.records() {
        let record = result?;
        let line = record.position().map_or(0, |p| p.line());
        let parse_error = |message: String| BinvoteError::Parse {
            path: file_path.to_string(),
            line,
            message,
        };
        if record.len() != 3 {
            return Err(parse_error(format!(
                "expected 3 columns in tally file, found {}",
                record.len()
            )));
        }
        if record[0] == record[1] {
            return Err(parse_error(format!(
                "contig {} is paired with itself",
                &record[0]
            )));
        }
        let count = record[2]
            .parse::<u32>()
            .map_err(|e| parse_error(format!("bad count '{}': {}", &record[2], e)))?;
        if tally.contains_key((&record[0], &record[1])) {
            return Err(parse_error(format!(
                "pair {} {} found multiple times",
                &record[0], &record[1]
            )));
        }
        if count as usize > num_schemes {
            return Err(parse_error(format!(
                "count {} is more than the {} schemes voting",
                count, num_schemes
            )));
        }
        tally.insert((&record[0], &record[1]), count);
    }
    debug!("Read in {} tallied pairs from {}", tally.len(), file_path);
    Ok(tally)
}
