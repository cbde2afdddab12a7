use std::io::Write;
use std::path::Path;

use crate::contig::{Contig, ReferenceCall};
use crate::errors::{BinvoteError, BinvoteResult};

const HEADERS: [&str; 7] = [
    "contig",
    "length",
    "coverage",
    "tetranucleotide",
    "reference",
    "reference_score",
    "roles",
];

/// Read a bin-exchange file, one contig per line with tab separated columns
/// contig, length, coverage, tetranucleotide, reference, reference_score and
/// roles. Vector and role columns are comma separated, and empty columns mean
/// the feature is missing.
pub fn read_bin_exchange_file(file_path: &str) -> BinvoteResult<Vec<Contig>> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .from_path(Path::new(file_path))?;

    if rdr.headers()? != HEADERS.to_vec() {
        return Err(BinvoteError::Parse {
            path: file_path.to_string(),
            line: 1,
            message: format!(
                "Incorrect headers found in bin-exchange file, expected {}",
                HEADERS.join(" ")
            ),
        });
    }

    let mut contigs = vec![];
    for result in rdr.records() {
        let record = result?;
        let line = record.position().map_or(0, |p| p.line());
        let parse_error = |message: String| BinvoteError::Parse {
            path: file_path.to_string(),
            line,
            message,
        };
        if record.len() != HEADERS.len() {
            return Err(parse_error(format!(
                "didn't find {} columns in line {:?}",
                HEADERS.len(),
                record
            )));
        }

        let length = record[1]
            .parse::<u64>()
            .map_err(|e| parse_error(format!("bad length '{}': {}", &record[1], e)))?;
        if length == 0 {
            return Err(parse_error(format!("contig {} has length 0", &record[0])));
        }
        let coverage = parse_floats(&record[2]).map_err(&parse_error)?;
        let tetranucleotide = parse_floats(&record[3]).map_err(&parse_error)?;
        let reference = match (&record[4], &record[5]) {
            ("", "") => None,
            (genome, score) if !genome.is_empty() && !score.is_empty() => Some(ReferenceCall {
                genome: genome.to_string(),
                score: score.parse::<f64>().map_err(|e| {
                    parse_error(format!("bad reference score '{}': {}", score, e))
                })?,
            }),
            _ => {
                return Err(parse_error(
                    "reference and reference_score must both be given or both be empty"
                        .to_string(),
                ))
            }
        };
        let roles = split_list(&record[6]).map(|s| s.to_string()).collect();

        let contig = Contig {
            id: record[0].to_string(),
            length,
            coverage,
            tetranucleotide,
            reference,
            roles,
        };
        trace!("Read contig {:?}", contig);
        contigs.push(contig);
    }
    debug!("Read in {} contigs from {}", contigs.len(), file_path);
    Ok(contigs)
}

fn split_list(field: &str) -> impl Iterator<Item = &str> {
    field.split(',').filter(|s| !s.is_empty())
}

fn parse_floats(field: &str) -> Result<Vec<f64>, String> {
    split_list(field)
        .map(|value| {
            value
                .parse::<f64>()
                .map_err(|e| format!("bad number '{}': {}", value, e))
        })
        .collect()
}

fn join_floats(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

pub fn write_bin_exchange<W: Write>(contigs: &[Contig], writer: W) -> BinvoteResult<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(writer);
    wtr.write_record(&HEADERS)?;
    for contig in contigs {
        let (reference, reference_score) = match &contig.reference {
            Some(call) => (call.genome.clone(), call.score.to_string()),
            None => (String::new(), String::new()),
        };
        wtr.write_record(&[
            contig.id.clone(),
            contig.length.to_string(),
            join_floats(&contig.coverage),
            join_floats(&contig.tetranucleotide),
            reference,
            reference_score,
            contig.roles.join(","),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_bin_exchange_file(contigs: &[Contig], file_path: &str) -> BinvoteResult<()> {
    let file = std::fs::File::create(Path::new(file_path))?;
    write_bin_exchange(contigs, file)
}
