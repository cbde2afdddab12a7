use std::io::Write;
use std::path::Path;

use crate::bin_quality::summarise_partition;
use crate::bins::Partition;
use crate::contig::ContigSet;
use crate::errors::{BinvoteError, BinvoteResult};

/// Check that a cluster definition file places every contig in exactly one
/// bin.
pub fn validate_clusters(contigs: &ContigSet, clustering_file: &str) -> BinvoteResult<Partition> {
    // Read cluster file
    let clusters = read_clustering_file(clustering_file)?;
    info!("Read in {} clusters", clusters.len());
    debug!("Clusters were: {:#?}", clusters);

    let mut index_sets = vec![];
    for cluster in &clusters {
        let mut indices = vec![];
        for contig_id in cluster {
            match contigs.index_of(contig_id) {
                Some(i) => indices.push(i),
                None => return Err(BinvoteError::UnknownContig(contig_id.clone())),
            }
        }
        if let Some(smaller) = cluster[1..].iter().find(|c| **c < cluster[0]) {
            warn!(
                "Bin {} contains {}, which sorts before it, so the bin is not named after its founder",
                cluster[0], smaller
            );
        }
        index_sets.push(indices);
    }

    let partition = Partition::from_index_sets(contigs.contigs(), &index_sets);
    partition.check_invariants(&contigs.ids())?;
    let summary = summarise_partition(&partition);
    info!(
        "Clustering is valid: {} bins, {} singletons, largest bin has {} contigs",
        summary.num_bins, summary.num_singleton_bins, summary.largest_bin
    );
    Ok(partition)
}

/// Read a two column cluster definition, where each bin starts with a line
/// giving its ID twice.
pub fn read_clustering_file(clustering_file: &str) -> BinvoteResult<Vec<Vec<String>>> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_path(Path::new(clustering_file))?;

    let mut current_cluster_rep: Option<String> = None;
    let mut all_clusters = vec![];
    let mut current_cluster = vec![];

    for record_res in rdr.records() {
        let record = record_res?;
        let line = record.position().map_or(0, |p| p.line());
        if record.len() != 2 {
            return Err(BinvoteError::Parse {
                path: clustering_file.to_string(),
                line,
                message: format!(
                    "Unexpectedly didn't find exactly 2 fields in clustering file: {:?}",
                    record
                ),
            });
        }

        if record[0] == record[1] {
            if current_cluster_rep.is_some() {
                all_clusters.push(current_cluster)
            }
            current_cluster = vec![];
            current_cluster_rep = Some(record[0].to_string());
        } else if current_cluster_rep.as_deref() != Some(&record[0]) {
            return Err(BinvoteError::Parse {
                path: clustering_file.to_string(),
                line,
                message: format!(
                    "contig {} is assigned to bin {} before that bin's own line",
                    &record[1], &record[0]
                ),
            });
        }
        current_cluster.push(record[1].to_string());
    }
    if current_cluster_rep.is_some() {
        all_clusters.push(current_cluster)
    }
    Ok(all_clusters)
}

/// Write each bin as lines of bin ID and contig ID, founder first.
pub fn write_cluster_definition<W: Write>(partition: &Partition, writer: W) -> BinvoteResult<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(writer);
    for bin in partition.bins() {
        for contig_id in &bin.contig_ids {
            wtr.write_record(&[&bin.id, contig_id])?;
        }
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_cluster_definition_file(partition: &Partition, file_path: &str) -> BinvoteResult<()> {
    let file = std::fs::File::create(Path::new(file_path))?;
    write_cluster_definition(partition, file)?;
    info!("Wrote {} bins to {}", partition.len(), file_path);
    Ok(())
}
