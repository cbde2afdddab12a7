extern crate binvote;
use binvote::errors::BinvoteResult;

extern crate clap;
use clap::*;

#[macro_use]
extern crate log;

extern crate bird_tool_utils;
use bird_tool_utils::clap_utils::*;

static PROGRAM_NAME: &str = "binvote";

fn main() {
    let app = build_cli();
    let matches = app.clone().get_matches();
    set_log_level(&matches, false, PROGRAM_NAME, crate_version!());

    let result = match matches.subcommand() {
        Some(("cluster", m)) => binvote::cluster_argument_parsing::run_cluster_subcommand(
            m,
            PROGRAM_NAME,
            crate_version!(),
        ),
        Some(("ensemble", m)) => binvote::cluster_argument_parsing::run_ensemble_subcommand(
            m,
            PROGRAM_NAME,
            crate_version!(),
        ),
        Some(("cluster-validate", m)) => run_cluster_validate(m),
        _ => panic!("Programming error"),
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run_cluster_validate(m: &ArgMatches) -> BinvoteResult<()> {
    set_log_level(m, true, PROGRAM_NAME, crate_version!());

    let contigs = binvote::contig::ContigSet::new(
        binvote::bin_exchange_file::read_bin_exchange_file(
            m.get_one::<String>("contigs").unwrap(),
        )?,
    )?;
    binvote::cluster_validation::validate_clusters(
        &contigs,
        m.get_one::<String>("cluster-file").unwrap(),
    )?;
    Ok(())
}

fn build_cli() -> Command {
    let mut app = add_clap_verbosity_flags(Command::new(PROGRAM_NAME))
        .version(crate_version!())
        .author(binvote::AUTHOR)
        .about("Consensus binning of metagenome contigs across weighting schemes")
        .arg_required_else_help(true)
        .subcommand(add_clap_verbosity_flags(
            Command::new("cluster-validate")
                .about("Verify that a cluster definition places every contig in exactly one bin")
                .arg(
                    Arg::new("contigs")
                        .long("contigs")
                        .required(true)
                        .help("Bin-exchange file the clustering was made from"),
                )
                .arg(
                    Arg::new("cluster-file")
                        .long("cluster-file")
                        .required(true)
                        .help("Output of the 'cluster' or 'ensemble' subcommand"),
                ),
        ));

    app = binvote::cluster_argument_parsing::add_cluster_subcommand(app);
    app = binvote::cluster_argument_parsing::add_ensemble_subcommand(app);
    app
}
