use std::collections::BTreeMap;

use crate::contig::Contig;
use crate::weighting_scheme::WeightingScheme;
use crate::PairScorer;

/// What to do with a signal that cannot be computed for a pair, e.g.
/// because one contig has no coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingFeaturePolicy {
    /// Leave the term out, and out of the weights the pair is judged
    /// against.
    Omit,
    /// Count the term as zero similarity.
    Zero,
}

impl MissingFeaturePolicy {
    pub fn from_name(name: &str) -> Option<MissingFeaturePolicy> {
        match name {
            "omit" => Some(MissingFeaturePolicy::Omit),
            "zero" => Some(MissingFeaturePolicy::Zero),
            _ => None,
        }
    }
}

/// Scores pairs as the weighted sum of coverage, tetranucleotide, reference
/// genome and universal role terms.
pub struct WeightedFeatureScorer {
    pub missing_feature_policy: MissingFeaturePolicy,
}

impl Default for WeightedFeatureScorer {
    fn default() -> Self {
        WeightedFeatureScorer {
            missing_feature_policy: MissingFeaturePolicy::Omit,
        }
    }
}

impl PairScorer for WeightedFeatureScorer {
    fn score(&self, contig1: &Contig, contig2: &Contig, scheme: &WeightingScheme) -> Option<f64> {
        let mut total = 0.0;
        let mut judged_weight = 0.0;

        let mut add_term = |weight: f64, term: Option<f64>| match term {
            Some(contribution) => {
                total += contribution;
                judged_weight += weight;
            }
            None => {
                if self.missing_feature_policy == MissingFeaturePolicy::Zero {
                    judged_weight += weight;
                }
            }
        };

        // Zero-weighted terms are not computed at all.
        if scheme.coverage_weight > 0.0 {
            add_term(
                scheme.coverage_weight,
                coverage_similarity(&contig1.coverage, &contig2.coverage)
                    .map(|s| s * scheme.coverage_weight),
            );
        }
        if scheme.tetranucleotide_weight > 0.0 {
            add_term(
                scheme.tetranucleotide_weight,
                tetranucleotide_similarity(&contig1.tetranucleotide, &contig2.tetranucleotide)
                    .map(|s| s * scheme.tetranucleotide_weight),
            );
        }
        if scheme.reference_weight > 0.0 {
            add_term(
                scheme.reference_weight,
                reference_agreement(contig1, contig2).map(|s| s * scheme.reference_weight),
            );
        }
        if scheme.role_weight > 0.0 || scheme.role_duplication_penalty > 0.0 {
            add_term(
                scheme.role_weight,
                role_score(
                    &contig1.roles,
                    &contig2.roles,
                    scheme.role_weight,
                    scheme.role_duplication_penalty,
                ),
            );
        }

        if judged_weight <= 0.0 {
            trace!(
                "No signal between {} and {} under scheme {}",
                contig1.id,
                contig2.id,
                scheme.label
            );
            return None;
        }
        // With MissingFeaturePolicy::Zero the judged weight is the scheme's
        // full active weight, so this is scheme.effective_minscore().
        let threshold = scheme.minscore * judged_weight;
        let score = total.max(0.0);
        trace!(
            "Score between {} and {} under scheme {} is {} (threshold {})",
            contig1.id,
            contig2.id,
            scheme.label,
            score,
            threshold
        );
        if score >= threshold {
            Some(score)
        } else {
            None
        }
    }

    fn method_name(&self) -> &str {
        match self.missing_feature_policy {
            MissingFeaturePolicy::Omit => "weighted-features (omit missing)",
            MissingFeaturePolicy::Zero => "weighted-features (zero missing)",
        }
    }
}

/// Mean over the shared samples of 1 - |x-y|/max(x,y), in [0,1].
pub fn coverage_similarity(coverage1: &[f64], coverage2: &[f64]) -> Option<f64> {
    let samples = coverage1.len().min(coverage2.len());
    if samples == 0 {
        return None;
    }
    let total: f64 = coverage1
        .iter()
        .zip(coverage2.iter())
        .map(|(x, y)| {
            let max = x.max(*y);
            if max <= 0.0 {
                1.0
            } else {
                1.0 - (x - y).abs() / max
            }
        })
        .sum();
    Some(total / samples as f64)
}

/// Cosine similarity of two composition vectors, in [0,1].
pub fn tetranucleotide_similarity(tetra1: &[f64], tetra2: &[f64]) -> Option<f64> {
    if tetra1.is_empty() || tetra1.len() != tetra2.len() {
        return None;
    }
    let mut dot = 0.0;
    let mut norm1 = 0.0;
    let mut norm2 = 0.0;
    for (x, y) in tetra1.iter().zip(tetra2.iter()) {
        dot += x * y;
        norm1 += x * x;
        norm2 += y * y;
    }
    if norm1 <= 0.0 || norm2 <= 0.0 {
        return None;
    }
    Some((dot / (norm1.sqrt() * norm2.sqrt())).min(1.0).max(0.0))
}

/// 1 when both contigs hit the same closest reference, 0 when they differ
/// or only one has a hit, None when neither has.
pub fn reference_agreement(contig1: &Contig, contig2: &Contig) -> Option<f64> {
    match (&contig1.reference, &contig2.reference) {
        (None, None) => None,
        (Some(r1), Some(r2)) if r1.genome == r2.genome => Some(1.0),
        _ => Some(0.0),
    }
}

/// Role weight for each role both sides carry, less the duplication penalty
/// for each role that would be present more than once if the two were
/// merged.
pub fn role_score(
    roles1: &[String],
    roles2: &[String],
    role_weight: f64,
    duplication_penalty: f64,
) -> Option<f64> {
    if roles1.is_empty() && roles2.is_empty() {
        return None;
    }
    let counts1 = role_counts(roles1);
    let counts2 = role_counts(roles2);
    let shared = counts1.keys().filter(|r| counts2.contains_key(*r)).count();

    let mut combined = counts1;
    for (role, count) in counts2 {
        *combined.entry(role).or_insert(0) += count;
    }
    let duplicated = combined.values().filter(|c| **c > 1).count();

    Some(role_weight * shared as f64 - duplication_penalty * duplicated as f64)
}

pub fn role_counts(roles: &[String]) -> BTreeMap<&str, usize> {
    let mut counts = BTreeMap::new();
    for role in roles {
        *counts.entry(role.as_str()).or_insert(0) += 1;
    }
    counts
}
