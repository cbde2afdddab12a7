use std::io::Write;

use clap::*;

use crate::bin_exchange_file::read_bin_exchange_file;
use crate::bin_quality::{
    calculate_partition_quality, read_universal_roles_file, summarise_partition,
    write_quality_report, ExpectedRoles,
};
use crate::bins::Partition;
use crate::cluster_validation::{write_cluster_definition, write_cluster_definition_file};
use crate::clusterer::cluster;
use crate::consensus::{consensus, consensus_from_tally};
use crate::consensus_tally::{read_tally_file, write_tally_file};
use crate::contig::ContigSet;
use crate::errors::{BinvoteError, BinvoteResult};
use crate::pair_scorer::{MissingFeaturePolicy, WeightedFeatureScorer};
use crate::weighting_scheme::{read_scheme_file, WeightingScheme};

use bird_tool_utils::clap_utils::*;

/// Outputs and quality settings shared by the cluster and ensemble
/// subcommands, all checked before any clustering happens.
struct OutputSettings {
    cluster_definition: Option<String>,
    quality_report: Option<String>,
    expected_roles: Option<ExpectedRoles>,
}

/// Parse a percentage between 0 and 100. Values below 1 are percentages
/// too, e.g. 0.5 is half a percent.
pub fn parse_percentage(m: &ArgMatches, parameter: &str) -> BinvoteResult<Option<f64>> {
    match m.get_one::<f64>(parameter) {
        Some(value) => {
            let percentage = *value;
            if !percentage.is_finite() || !(0.0..=100.0).contains(&percentage) {
                error!("Invalid percentage: '{}'", percentage);
                return Err(BinvoteError::CutoffOutOfRange(percentage));
            }
            debug!("Using {} {}%", parameter, percentage);
            Ok(Some(percentage))
        }
        None => Ok(None),
    }
}

fn setup_threads(m: &ArgMatches) -> BinvoteResult<()> {
    let num_threads: usize = *m
        .get_one::<usize>("threads")
        .expect("Programming error: threads has a default");
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
        .map_err(|e| BinvoteError::InvalidArgument(format!("Failed to set up threads: {}", e)))
}

fn parse_missing_feature_policy(m: &ArgMatches) -> BinvoteResult<MissingFeaturePolicy> {
    let name = m
        .get_one::<String>("missing-feature-policy")
        .expect("Programming error: missing-feature-policy has a default");
    MissingFeaturePolicy::from_name(name).ok_or_else(|| {
        BinvoteError::InvalidArgument(format!("Unknown missing feature policy '{}'", name))
    })
}

fn parse_output_settings(m: &ArgMatches) -> BinvoteResult<OutputSettings> {
    let expected_roles = if let Some(count) = m.get_one::<usize>("expected-role-count") {
        if *count == 0 {
            return Err(BinvoteError::InvalidArgument(
                "--expected-role-count must be greater than 0".to_string(),
            ));
        }
        Some(ExpectedRoles::Count(*count))
    } else if let Some(path) = m.get_one::<String>("universal-roles") {
        info!("Reading universal roles from {} ..", path);
        Some(ExpectedRoles::Roles(read_universal_roles_file(path)?))
    } else {
        None
    };

    let quality_report = m.get_one::<String>("output-quality-report").cloned();
    if quality_report.is_some() && expected_roles.is_none() {
        return Err(BinvoteError::InvalidArgument(
            "--output-quality-report requires --expected-role-count or --universal-roles"
                .to_string(),
        ));
    }

    Ok(OutputSettings {
        cluster_definition: m.get_one::<String>("output-cluster-definition").cloned(),
        quality_report,
        expected_roles,
    })
}

fn read_contigs(m: &ArgMatches) -> BinvoteResult<ContigSet> {
    let path = m
        .get_one::<String>("contigs")
        .expect("Programming error: contigs is required");
    info!("Reading contig features from {} ..", path);
    let contigs = ContigSet::new(read_bin_exchange_file(path)?)?;
    info!("Read in {} contigs", contigs.len());
    Ok(contigs)
}

/// Pick the scheme for single-scheme mode, either from --weights or from a
/// scheme file, where --scheme-label chooses among several.
fn parse_single_scheme(m: &ArgMatches) -> BinvoteResult<WeightingScheme> {
    if let Some(weights) = m.get_one::<String>("weights") {
        let parsed = weights
            .split(',')
            .map(|w| {
                w.trim().parse::<f64>().map_err(|e| {
                    BinvoteError::InvalidArgument(format!("Bad weight '{}' in --weights: {}", w, e))
                })
            })
            .collect::<BinvoteResult<Vec<f64>>>()?;
        return WeightingScheme::from_weights("command-line", &parsed);
    }

    let path = m
        .get_one::<String>("scheme-file")
        .expect("Programming error: one of weights or scheme-file is required");
    let mut schemes = read_scheme_file(path)?;
    match m.get_one::<String>("scheme-label") {
        Some(label) => schemes.into_iter().find(|s| &s.label == label).ok_or_else(|| {
            BinvoteError::InvalidArgument(format!("No scheme labelled '{}' in {}", label, path))
        }),
        None => {
            if schemes.is_empty() {
                return Err(BinvoteError::EmptySchemeList);
            }
            schemes.sort_by_key(|s| s.rank);
            if schemes.len() > 1 {
                info!(
                    "Found {} schemes in {}, using the top ranked scheme '{}'",
                    schemes.len(),
                    path,
                    schemes[0].label
                );
            }
            Ok(schemes.swap_remove(0))
        }
    }
}

fn write_outputs(
    partition: &Partition,
    contigs: &ContigSet,
    settings: &OutputSettings,
) -> BinvoteResult<()> {
    let summary = summarise_partition(partition);
    info!(
        "Binned {} contigs ({} bp) into {} bins, {} of which are singletons. The largest bin contains {} contigs",
        contigs.len(),
        summary.total_length,
        summary.num_bins,
        summary.num_singleton_bins,
        summary.largest_bin
    );
    debug!("Bin sizes: {:?}", summary.bin_sizes);

    match &settings.cluster_definition {
        Some(path) => write_cluster_definition_file(partition, path)?,
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            write_cluster_definition(partition, &mut handle)?;
            handle.flush()?;
        }
    }

    if let (Some(path), Some(expected)) = (&settings.quality_report, &settings.expected_roles) {
        let qualities = calculate_partition_quality(partition, contigs, expected);
        write_quality_report(&qualities, std::fs::File::create(path)?)?;
        info!("Wrote quality of {} bins to {}", qualities.len(), path);
    }
    Ok(())
}

pub fn run_cluster_subcommand(
    matches: &ArgMatches,
    program_name: &str,
    version: &str,
) -> BinvoteResult<()> {
    set_log_level(matches, true, program_name, version);
    setup_threads(matches)?;

    let scheme = parse_single_scheme(matches)?;
    let scorer = WeightedFeatureScorer {
        missing_feature_policy: parse_missing_feature_policy(matches)?,
    };
    let settings = parse_output_settings(matches)?;
    let contigs = read_contigs(matches)?;

    info!("Clustering contigs with scheme '{}' ..", scheme.label);
    let partition = cluster(&contigs, &scheme, &scorer);
    partition.check_invariants(&contigs.ids())?;
    write_outputs(&partition, &contigs, &settings)
}

pub fn run_ensemble_subcommand(
    matches: &ArgMatches,
    program_name: &str,
    version: &str,
) -> BinvoteResult<()> {
    set_log_level(matches, true, program_name, version);
    setup_threads(matches)?;

    let cutoff = parse_percentage(matches, "cutoff")?
        .expect("Programming error: cutoff has a default");
    let scorer = WeightedFeatureScorer {
        missing_feature_policy: parse_missing_feature_policy(matches)?,
    };
    let settings = parse_output_settings(matches)?;

    let (contigs, partition) = match matches.get_one::<String>("tally") {
        Some(tally_path) => {
            let num_schemes = *matches
                .get_one::<usize>("num-schemes")
                .expect("Programming error: num-schemes is required with tally");
            let tally = read_tally_file(tally_path, num_schemes)?;
            let contigs = read_contigs(matches)?;
            info!(
                "Deriving consensus bins from {} tallied pairs in {} ..",
                tally.len(),
                tally_path
            );
            let partition = consensus_from_tally(&contigs, &tally, cutoff)?;
            (contigs, partition)
        }
        None => {
            let scheme_path = matches
                .get_one::<String>("scheme-file")
                .expect("Programming error: one of tally or scheme-file is required");
            let schemes = read_scheme_file(scheme_path)?;
            let contigs = read_contigs(matches)?;
            let (partition, tally) = consensus(&contigs, &schemes, cutoff, &scorer)?;
            if let Some(path) = matches.get_one::<String>("output-tally") {
                write_tally_file(&tally, path)?;
            }
            (contigs, partition)
        }
    };
    partition.check_invariants(&contigs.ids())?;
    write_outputs(&partition, &contigs, &settings)
}

fn add_common_arguments(subcommand: Command) -> Command {
    subcommand
        .arg(
            Arg::new("contigs")
                .long("contigs")
                .required(true)
                .help("Bin-exchange file of contig features"),
        )
        .arg(
            Arg::new("missing-feature-policy")
                .long("missing-feature-policy")
                .value_parser(["omit", "zero"])
                .default_value(crate::DEFAULT_MISSING_FEATURE_POLICY)
                .help("How to score a signal one of the contigs has no data for: 'omit' leaves it out of the score and the weights the pair is judged against, 'zero' counts it as no similarity"),
        )
        .arg(
            Arg::new("output-cluster-definition")
                .long("output-cluster-definition")
                .help("Output a file of bin<TAB>contig lines, with the bin's founding contig listed first [default: stdout]"),
        )
        .arg(
            Arg::new("output-quality-report")
                .long("output-quality-report")
                .help("Output completeness and contamination of each bin, estimated from universal roles"),
        )
        .arg(
            Arg::new("expected-role-count")
                .long("expected-role-count")
                .value_parser(value_parser!(usize))
                .conflicts_with("universal-roles")
                .help("Number of universal roles expected in a complete genome"),
        )
        .arg(
            Arg::new("universal-roles")
                .long("universal-roles")
                .help("File listing the universal roles expected in a complete genome, one per line"),
        )
        .arg(
            Arg::new("threads")
                .short('t')
                .long("threads")
                .value_parser(value_parser!(usize))
                .help("Number of CPU threads to use")
                .default_value("1"),
        )
}

pub fn add_cluster_subcommand(app: Command) -> Command {
    let cluster_subcommand = add_common_arguments(add_clap_verbosity_flags(
        Command::new("cluster")
            .about("Bin contigs under a single weighting scheme")
            .arg(
                Arg::new("weights")
                    .long("weights")
                    .conflicts_with("scheme-file")
                    .required_unless_present("scheme-file")
                    .help("Comma separated coverage, tetranucleotide, reference, role duplication penalty, role weights and minscore e.g. 1,1,1,0.5,0.2,0.6"),
            )
            .arg(
                Arg::new("scheme-file")
                    .long("scheme-file")
                    .help("Tab separated weighting schemes: rank, label, then the six numbers as in --weights"),
            )
            .arg(
                Arg::new("scheme-label")
                    .long("scheme-label")
                    .requires("scheme-file")
                    .help("Label of the scheme to use from --scheme-file [default: top ranked scheme]"),
            ),
    ));
    app.subcommand(cluster_subcommand)
}

pub fn add_ensemble_subcommand(app: Command) -> Command {
    let ensemble_subcommand = add_common_arguments(add_clap_verbosity_flags(
        Command::new("ensemble")
            .about("Bin contigs by consensus across many weighting schemes")
            .arg(
                Arg::new("scheme-file")
                    .long("scheme-file")
                    .conflicts_with("tally")
                    .required_unless_present("tally")
                    .help("Tab separated weighting schemes: rank, label, coverage, tetranucleotide, reference, role duplication penalty, role weights and minscore"),
            )
            .arg(
                Arg::new("tally")
                    .long("tally")
                    .requires("num-schemes")
                    .help("Previously written --output-tally file, used instead of clustering with each scheme"),
            )
            .arg(
                Arg::new("num-schemes")
                    .long("num-schemes")
                    .value_parser(value_parser!(usize))
                    .help("Number of schemes that voted in --tally"),
            )
            .arg(
                Arg::new("cutoff")
                    .long("cutoff")
                    .value_parser(value_parser!(f64))
                    .allow_negative_numbers(true)
                    .default_value(crate::DEFAULT_CUTOFF)
                    .help("Percentage (0 to 100) of schemes that must bin two contigs together for them to be joined"),
            )
            .arg(
                Arg::new("output-tally")
                    .long("output-tally")
                    .help("Output the number of schemes binning each pair of contigs together"),
            ),
    ));
    app.subcommand(ensemble_subcommand)
}
