use crate::bins::Partition;
use crate::clusterer::cluster;
use crate::consensus_tally::ConsensusTally;
use crate::contig::ContigSet;
use crate::errors::{BinvoteError, BinvoteResult};
use crate::weighting_scheme::{validate_schemes, WeightingScheme};
use crate::PairScorer;

use disjoint::DisjointSetVec;
use rayon::prelude::*;

pub fn validate_cutoff(cutoff_percent: f64) -> BinvoteResult<()> {
    if !cutoff_percent.is_finite() || !(0.0..=100.0).contains(&cutoff_percent) {
        return Err(BinvoteError::CutoffOutOfRange(cutoff_percent));
    }
    Ok(())
}

/// Number of schemes that must agree for a pair to be joined, i.e.
/// ceil(cutoff * schemes / 100), but at least one.
pub fn vote_threshold(cutoff_percent: f64, num_schemes: usize) -> u32 {
    let votes = cutoff_percent * num_schemes as f64 / 100.0;
    // Rounded to 9 decimal places so products like 70*10/100 landing a hair
    // above 7 give 7.
    let threshold = ((votes * 1e9).round() / 1e9).ceil();
    if threshold < 1.0 {
        1
    } else {
        threshold as u32
    }
}

/// Cluster the contigs once per scheme, tally how often each pair shares a
/// bin and join the pairs that at least `cutoff_percent` of the schemes
/// agree on.
pub fn consensus<S: PairScorer + Sync>(
    contigs: &ContigSet,
    schemes: &[WeightingScheme],
    cutoff_percent: f64,
    scorer: &S,
) -> BinvoteResult<(Partition, ConsensusTally)> {
    validate_schemes(schemes)?;
    validate_cutoff(cutoff_percent)?;

    info!(
        "Clustering {} contigs with each of {} weighting schemes ..",
        contigs.len(),
        schemes.len()
    );
    // Each scheme gets its own tally, and these are only combined once the
    // schemes are finished.
    let tally = schemes
        .par_iter()
        .map(|scheme| {
            let partition = cluster(contigs, scheme, scorer);
            ConsensusTally::from_partition(&partition)
        })
        .reduce(ConsensusTally::new, |mut tally1, tally2| {
            tally1.merge(tally2);
            tally1
        });
    info!(
        "Finished clustering, {} contig pairs were binned together at least once",
        tally.len()
    );

    let partition = consensus_from_tally(contigs, &tally, cutoff_percent)?;
    Ok((partition, tally))
}

/// Derive the consensus partition from an existing tally, e.g. one read
/// back from a tally file.
pub fn consensus_from_tally(
    contigs: &ContigSet,
    tally: &ConsensusTally,
    cutoff_percent: f64,
) -> BinvoteResult<Partition> {
    validate_cutoff(cutoff_percent)?;
    if tally.num_schemes() == 0 {
        return Err(BinvoteError::EmptySchemeList);
    }
    let threshold = vote_threshold(cutoff_percent, tally.num_schemes());
    info!(
        "Joining contig pairs binned together by at least {} of {} schemes ({}%)",
        threshold,
        tally.num_schemes(),
        cutoff_percent
    );

    let mut joined: DisjointSetVec<usize> = DisjointSetVec::with_capacity(contigs.len());
    for i in 0..contigs.len() {
        joined.push(i);
    }
    let mut num_edges = 0usize;
    for (contig1, contig2, count) in tally.iter() {
        let i = contigs
            .index_of(contig1)
            .ok_or_else(|| BinvoteError::UnknownContig(contig1.to_string()))?;
        let j = contigs
            .index_of(contig2)
            .ok_or_else(|| BinvoteError::UnknownContig(contig2.to_string()))?;
        if count >= threshold {
            trace!("Joining {} and {} with {} votes", contig1, contig2, count);
            joined.join(i, j);
            num_edges += 1;
        }
    }
    debug!("Found {} contig pairs passing the vote threshold", num_edges);

    let sets = joined.indices().sets();
    let partition = Partition::from_index_sets(contigs.contigs(), &sets);
    debug_assert!(partition.check_invariants(&contigs.ids()).is_ok());
    info!("Consensus binning produced {} bins", partition.len());
    Ok(partition)
}
