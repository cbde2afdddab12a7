use crate::bins::{Bin, Partition};
use crate::contig::{Contig, ContigSet};
use crate::weighting_scheme::WeightingScheme;
use crate::PairScorer;

use disjoint::DisjointSetVec;
use rayon::prelude::*;

/// Partition the contigs into bins under a single weighting scheme.
///
/// Each round scores every pair of current bins (each represented by its
/// aggregate features) and joins the pairs passing the scheme's minscore,
/// re-checking each join against the features of the groups formed so far.
/// Rounds repeat until nothing more is joined, so the returned partition is
/// stable: clustering its bins again joins nothing. Contigs are processed in
/// ID order, so the input order does not affect the result.
pub fn cluster<S: PairScorer + Sync>(
    contigs: &ContigSet,
    scheme: &WeightingScheme,
    scorer: &S,
) -> Partition {
    let contig_slice = contigs.contigs();
    debug!(
        "Clustering {} contigs with scheme {} (rank {}) using {}",
        contig_slice.len(),
        scheme.label,
        scheme.rank,
        scorer.method_name()
    );

    // Indices of the member contigs of each current bin, each sorted so the
    // founder comes first.
    let mut memberships: Vec<Vec<usize>> = (0..contig_slice.len()).map(|i| vec![i]).collect();
    let mut round = 0;
    let bins = loop {
        round += 1;
        let bins: Vec<Bin> = memberships
            .iter()
            .map(|members| {
                let member_contigs: Vec<&Contig> =
                    members.iter().map(|i| &contig_slice[*i]).collect();
                Bin::from_members(&member_contigs)
            })
            .collect();
        let bin_contigs: Vec<Contig> = bins.iter().map(|b| b.to_contig()).collect();

        let joined = partition_bins(contig_slice, &memberships, &bin_contigs, scheme, scorer);
        let sets = joined.indices().sets();
        debug!(
            "Scheme {} round {}: {} bins became {}",
            scheme.label,
            round,
            bins.len(),
            sets.len()
        );
        if sets.len() == memberships.len() {
            break bins;
        }

        let mut merged: Vec<Vec<usize>> = sets
            .iter()
            .map(|set| {
                let mut indices: Vec<usize> = set
                    .iter()
                    .flat_map(|bin_index| memberships[*bin_index].iter().copied())
                    .collect();
                indices.sort_unstable();
                indices
            })
            .collect();
        merged.sort_unstable();
        memberships = merged;
    };

    let partition = Partition::new(bins);
    debug_assert!(partition.check_invariants(&contigs.ids()).is_ok());
    info!(
        "Scheme {} placed {} contigs into {} bins",
        scheme.label,
        contig_slice.len(),
        partition.len()
    );
    partition
}

/// Join all pairs passing the scheme's threshold, in sorted order. A pair
/// is only joined if the two groups it would merge, with the aggregate
/// features they have by then, still pass.
fn partition_bins<S: PairScorer + Sync>(
    contig_slice: &[Contig],
    memberships: &[Vec<usize>],
    bin_contigs: &[Contig],
    scheme: &WeightingScheme,
    scorer: &S,
) -> DisjointSetVec<usize> {
    let mut to_return: DisjointSetVec<usize> = DisjointSetVec::with_capacity(bin_contigs.len());
    for (i, _) in bin_contigs.iter().enumerate() {
        to_return.push(i);
    }

    // Collect all pairs that need to be joined in parallel
    let mut pairs_to_join: Vec<(usize, usize)> = bin_contigs
        .par_iter()
        .enumerate()
        .flat_map(|(i, contig1)| {
            (0..i).into_par_iter().filter_map(move |j| {
                let contig2 = &bin_contigs[j];
                trace!("Testing bins {} and {}", contig2.id, contig1.id);
                scorer.score(contig2, contig1, scheme).map(|score| {
                    trace!(
                        "Candidate join of bins {} and {} with score {}",
                        contig2.id,
                        contig1.id,
                        score
                    );
                    (j, i)
                })
            })
        })
        .collect();
    pairs_to_join.sort_unstable();

    // Group of each bin and the bins in each group, kept current as pairs
    // are joined.
    let mut group_of: Vec<usize> = (0..bin_contigs.len()).collect();
    let mut groups: Vec<Vec<usize>> = (0..bin_contigs.len()).map(|i| vec![i]).collect();
    let group_contig = |group: &[usize]| -> Contig {
        let member_contigs: Vec<&Contig> = group
            .iter()
            .flat_map(move |bin_index| {
                memberships[*bin_index]
                    .iter()
                    .map(move |i| &contig_slice[*i])
            })
            .collect();
        Bin::from_members(&member_contigs).to_contig()
    };

    // Join all pairs sequentially
    for (i, j) in pairs_to_join {
        let (group1, group2) = (group_of[i], group_of[j]);
        if group1 == group2 {
            continue;
        }
        if groups[group1].len() > 1 || groups[group2].len() > 1 {
            let merged1 = group_contig(&groups[group1]);
            let merged2 = group_contig(&groups[group2]);
            if scorer.score(&merged1, &merged2, scheme).is_none() {
                trace!(
                    "Not joining bins {} and {} since their groups no longer pass",
                    bin_contigs[i].id,
                    bin_contigs[j].id
                );
                continue;
            }
        }
        to_return.join(i, j);
        let moved = std::mem::take(&mut groups[group2]);
        for bin_index in &moved {
            group_of[*bin_index] = group1;
        }
        groups[group1].extend(moved);
    }

    to_return
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contig::ReferenceCall;
    use crate::pair_scorer::{MissingFeaturePolicy, WeightedFeatureScorer};
    use proptest::prelude::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn contig(id: &str, genome: Option<&str>, roles: &[&str]) -> Contig {
        Contig {
            reference: genome.map(|g| ReferenceCall {
                genome: g.to_string(),
                score: 95.0,
            }),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            ..Contig::new(id, 1000)
        }
    }

    fn memberships(partition: &Partition) -> Vec<Vec<&str>> {
        partition
            .bins()
            .iter()
            .map(|b| b.contig_ids.iter().map(|c| c.as_str()).collect())
            .collect()
    }

    #[test]
    fn test_reference_only_scheme() {
        init();
        let contigs = ContigSet::new(vec![
            contig("A", Some("G1"), &["R1"]),
            contig("B", Some("G1"), &["R2"]),
            contig("C", Some("G2"), &["R1"]),
            contig("D", None, &[]),
        ])
        .unwrap();
        let scheme =
            WeightingScheme::from_weights("ref", &[0.0, 0.0, 1.0, 0.0, 0.0, 1.0]).unwrap();
        for policy in &[MissingFeaturePolicy::Omit, MissingFeaturePolicy::Zero] {
            let partition = cluster(
                &contigs,
                &scheme,
                &WeightedFeatureScorer {
                    missing_feature_policy: *policy,
                },
            );
            partition.check_invariants(&contigs.ids()).unwrap();
            assert_eq!(
                vec![vec!["A", "B"], vec!["C"], vec!["D"]],
                memberships(&partition)
            );
            assert_eq!("A", partition.bins()[0].id);
        }
    }

    #[test]
    fn test_duplicated_roles_block_merging() {
        init();
        // A and B share a reference, but merging them would duplicate R1
        let contigs = ContigSet::new(vec![
            contig("A", Some("G1"), &["R1"]),
            contig("B", Some("G1"), &["R1"]),
            contig("C", Some("G1"), &["R2"]),
        ])
        .unwrap();
        let scheme =
            WeightingScheme::from_weights("roles", &[0.0, 0.0, 1.0, 2.0, 0.5, 0.5]).unwrap();
        let scorer = WeightedFeatureScorer::default();
        let partition = cluster(&contigs, &scheme, &scorer);
        // A+C and B+C both pass against singletons (score 1 >= 0.75), but once
        // A and C are joined, adding B would duplicate R1.
        assert_eq!(vec![vec!["A", "C"], vec!["B"]], memberships(&partition));
        let bin_ac = partition.bins()[0].to_contig();
        assert_eq!(
            None,
            scorer.score(&bin_ac, &contigs.contigs()[1], &scheme)
        );

        let contigs = ContigSet::new(vec![
            contig("A", Some("G1"), &["R1"]),
            contig("B", Some("G1"), &["R1"]),
        ])
        .unwrap();
        let partition = cluster(&contigs, &scheme, &scorer);
        assert_eq!(vec![vec!["A"], vec!["B"]], memberships(&partition));
    }

    #[test]
    fn test_contig_without_features_stays_alone() {
        init();
        let contigs = ContigSet::new(vec![
            Contig {
                coverage: vec![5.0, 1.0],
                tetranucleotide: vec![0.25, 0.25, 0.5],
                ..Contig::new("a", 2000)
            },
            Contig {
                coverage: vec![5.5, 1.0],
                tetranucleotide: vec![0.25, 0.25, 0.5],
                ..Contig::new("b", 3000)
            },
            Contig::new("empty", 500),
        ])
        .unwrap();
        let scheme =
            WeightingScheme::from_weights("composition", &[1.0, 1.0, 0.0, 0.0, 0.0, 0.8])
                .unwrap();
        let partition = cluster(&contigs, &scheme, &WeightedFeatureScorer::default());
        assert_eq!(vec![vec!["a", "b"], vec!["empty"]], memberships(&partition));
    }

    #[test]
    fn test_stable_partition_is_not_merged_further() {
        init();
        let contigs = ContigSet::new(vec![
            contig("A", Some("G1"), &["R1"]),
            contig("B", Some("G1"), &["R2"]),
            contig("C", Some("G2"), &["R1"]),
            contig("D", Some("G2"), &["R3"]),
            contig("E", None, &["R4"]),
        ])
        .unwrap();
        let scheme =
            WeightingScheme::from_weights("mixed", &[0.0, 0.0, 1.0, 1.0, 0.5, 0.6]).unwrap();
        let scorer = WeightedFeatureScorer::default();
        let partition = cluster(&contigs, &scheme, &scorer);

        let super_contigs =
            ContigSet::new(partition.bins().iter().map(|b| b.to_contig()).collect()).unwrap();
        let again = cluster(&super_contigs, &scheme, &scorer);
        assert_eq!(partition.len(), again.len());
        assert!(again.bins().iter().all(|b| b.len() == 1));
    }

    fn arbitrary_contig() -> impl Strategy<Value = (Vec<f64>, Option<u8>, Vec<u8>, u64)> {
        (
            prop::collection::vec(0.0f64..20.0, 2),
            prop::option::of(0u8..3),
            prop::collection::vec(0u8..6, 0..3),
            1u64..5000,
        )
    }

    fn build_contigs(specs: &[(Vec<f64>, Option<u8>, Vec<u8>, u64)]) -> Vec<Contig> {
        specs
            .iter()
            .enumerate()
            .map(|(i, (coverage, genome, roles, length))| Contig {
                coverage: coverage.clone(),
                reference: genome.map(|g| ReferenceCall {
                    genome: format!("G{}", g),
                    score: 90.0,
                }),
                roles: roles.iter().map(|r| format!("R{}", r)).collect(),
                ..Contig::new(&format!("contig_{:03}", i), *length)
            })
            .collect()
    }

    proptest! {
        #[test]
        fn test_partition_complete_and_order_invariant(
            specs in prop::collection::vec(arbitrary_contig(), 1..12),
            rotation in 0usize..12,
        ) {
            let contigs = build_contigs(&specs);
            let mut rotated = contigs.clone();
            let len = rotated.len();
            rotated.rotate_left(rotation % len);
            rotated.reverse();

            let scheme = WeightingScheme::from_weights(
                "prop", &[1.0, 0.0, 1.0, 0.5, 0.5, 0.6]).unwrap();
            let scorer = WeightedFeatureScorer::default();
            let set = ContigSet::new(contigs).unwrap();
            let partition = cluster(&set, &scheme, &scorer);
            prop_assert!(partition.check_invariants(&set.ids()).is_ok());

            let rotated_set = ContigSet::new(rotated).unwrap();
            prop_assert_eq!(partition, cluster(&rotated_set, &scheme, &scorer));
        }

        #[test]
        fn test_clustering_is_idempotent(
            specs in prop::collection::vec(arbitrary_contig(), 1..12),
        ) {
            let scheme = WeightingScheme::from_weights(
                "prop", &[1.0, 0.0, 1.0, 0.5, 0.5, 0.6]).unwrap();
            let scorer = WeightedFeatureScorer::default();
            let set = ContigSet::new(build_contigs(&specs)).unwrap();
            let partition = cluster(&set, &scheme, &scorer);
            let super_contigs = ContigSet::new(
                partition.bins().iter().map(|b| b.to_contig()).collect()).unwrap();
            let again = cluster(&super_contigs, &scheme, &scorer);
            prop_assert_eq!(partition.len(), again.len());
        }
    }
}
