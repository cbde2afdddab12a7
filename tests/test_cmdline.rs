extern crate assert_cli;
extern crate tempfile;

#[cfg(test)]
mod tests {
    use assert_cli::Assert;

    #[test]
    fn test_cluster_by_reference() {
        Assert::main_binary()
            .with_args(&[
                "cluster",
                "--contigs",
                "tests/data/set1/contigs.tsv",
                "--weights",
                "0,0,1,0,0,0.5",
                "--output-cluster-definition",
                "/dev/stdout",
            ])
            .succeeds()
            .stdout()
            .is("\
                contig_1	contig_1\n\
                contig_1	contig_2\n\
                contig_3	contig_3\n\
                contig_3	contig_4\n\
                contig_3	contig_5\n\
                contig_6	contig_6\n")
            .unwrap();
    }

    #[test]
    fn test_cluster_by_scheme_label() {
        // Contig 5 has the coverage of contig 1 but the reference of contig 3
        Assert::main_binary()
            .with_args(&[
                "cluster",
                "--contigs",
                "tests/data/set1/contigs.tsv",
                "--scheme-file",
                "tests/data/set1/schemes.tsv",
                "--scheme-label",
                "coverage",
            ])
            .succeeds()
            .stdout()
            .is("\
                contig_1	contig_1\n\
                contig_1	contig_2\n\
                contig_1	contig_5\n\
                contig_3	contig_3\n\
                contig_3	contig_4\n\
                contig_6	contig_6\n")
            .unwrap();
    }

    #[test]
    fn test_cluster_quality_report() {
        let td = tempfile::TempDir::new().unwrap();
        let report = td.path().join("quality.tsv");
        Assert::main_binary()
            .with_args(&[
                "cluster",
                "--contigs",
                "tests/data/set1/contigs.tsv",
                "--scheme-file",
                "tests/data/set1/schemes.tsv",
                "--universal-roles",
                "tests/data/set1/universal_roles.txt",
                "--output-quality-report",
                report.to_str().unwrap(),
            ])
            .succeeds()
            .unwrap();
        assert_eq!(
            "bin\tcontigs\ttotal_length\tn50\troles_found\texpected_roles\tcompleteness\tduplicated_roles\tcontamination\n\
            contig_1\t2\t20000\t12000\t3\t4\t75.00\t0\t0.00\n\
            contig_3\t3\t9500\t5000\t3\t4\t75.00\t1\t25.00\n\
            contig_6\t1\t900\t900\t0\t4\t0.00\t0\t0.00\n",
            std::fs::read_to_string(report).unwrap()
        );
    }

    #[test]
    fn test_cluster_all_zero_weights_fails() {
        Assert::main_binary()
            .with_args(&[
                "cluster",
                "--contigs",
                "tests/data/set1/contigs.tsv",
                "--weights",
                "0,0,0,0,0,0",
            ])
            .fails()
            .unwrap();
    }

    #[test]
    fn test_quality_report_without_roles_writes_nothing() {
        let td = tempfile::TempDir::new().unwrap();
        let clusters = td.path().join("clusters.tsv");
        Assert::main_binary()
            .with_args(&[
                "cluster",
                "--contigs",
                "tests/data/set1/contigs.tsv",
                "--weights",
                "0,0,1,0,0,0.5",
                "--output-cluster-definition",
                clusters.to_str().unwrap(),
                "--output-quality-report",
                td.path().join("quality.tsv").to_str().unwrap(),
            ])
            .fails()
            .unwrap();
        assert!(!clusters.exists());
    }

    #[test]
    fn test_ensemble_default_cutoff() {
        // Only contig pairs binned together by both schemes are joined
        let td = tempfile::TempDir::new().unwrap();
        let tally = td.path().join("tally.tsv");
        Assert::main_binary()
            .with_args(&[
                "ensemble",
                "--contigs",
                "tests/data/set1/contigs.tsv",
                "--scheme-file",
                "tests/data/set1/schemes.tsv",
                "--output-tally",
                tally.to_str().unwrap(),
                "--threads",
                "2",
            ])
            .succeeds()
            .stdout()
            .is("\
                contig_1	contig_1\n\
                contig_1	contig_2\n\
                contig_3	contig_3\n\
                contig_3	contig_4\n\
                contig_5	contig_5\n\
                contig_6	contig_6\n")
            .unwrap();
        assert_eq!(
            std::fs::read_to_string("tests/data/set1/tally.tsv").unwrap(),
            std::fs::read_to_string(tally).unwrap()
        );
    }

    #[test]
    fn test_ensemble_low_cutoff() {
        Assert::main_binary()
            .with_args(&[
                "ensemble",
                "--contigs",
                "tests/data/set1/contigs.tsv",
                "--scheme-file",
                "tests/data/set1/schemes.tsv",
                "--cutoff",
                "50",
            ])
            .succeeds()
            .stdout()
            .is("\
                contig_1	contig_1\n\
                contig_1	contig_2\n\
                contig_1	contig_3\n\
                contig_1	contig_4\n\
                contig_1	contig_5\n\
                contig_6	contig_6\n")
            .unwrap();
    }

    #[test]
    fn test_ensemble_cutoff_below_one_percent() {
        // 0.5% of 2 schemes, so a single vote is enough
        Assert::main_binary()
            .with_args(&[
                "ensemble",
                "--contigs",
                "tests/data/set1/contigs.tsv",
                "--scheme-file",
                "tests/data/set1/schemes.tsv",
                "--cutoff",
                "0.5",
            ])
            .succeeds()
            .stdout()
            .is("\
                contig_1	contig_1\n\
                contig_1	contig_2\n\
                contig_1	contig_3\n\
                contig_1	contig_4\n\
                contig_1	contig_5\n\
                contig_6	contig_6\n")
            .unwrap();
    }

    #[test]
    fn test_ensemble_from_tally() {
        Assert::main_binary()
            .with_args(&[
                "ensemble",
                "--contigs",
                "tests/data/set1/contigs.tsv",
                "--tally",
                "tests/data/set1/tally.tsv",
                "--num-schemes",
                "2",
            ])
            .succeeds()
            .stdout()
            .is("\
                contig_1	contig_1\n\
                contig_1	contig_2\n\
                contig_3	contig_3\n\
                contig_3	contig_4\n\
                contig_5	contig_5\n\
                contig_6	contig_6\n")
            .unwrap();
    }

    #[test]
    fn test_ensemble_tally_with_too_few_schemes_fails() {
        Assert::main_binary()
            .with_args(&[
                "ensemble",
                "--contigs",
                "tests/data/set1/contigs.tsv",
                "--tally",
                "tests/data/set1/tally.tsv",
                "--num-schemes",
                "1",
            ])
            .fails()
            .unwrap();
    }

    #[test]
    fn test_ensemble_cutoff_out_of_range_fails() {
        Assert::main_binary()
            .with_args(&[
                "ensemble",
                "--contigs",
                "tests/data/set1/contigs.tsv",
                "--scheme-file",
                "tests/data/set1/schemes.tsv",
                "--cutoff",
                "150",
            ])
            .fails()
            .unwrap();
    }

    #[test]
    fn test_cluster_validate() {
        Assert::main_binary()
            .with_args(&[
                "cluster-validate",
                "--contigs",
                "tests/data/set1/contigs.tsv",
                "--cluster-file",
                "tests/data/set1/clusters.tsv",
            ])
            .succeeds()
            .stdout()
            .is("")
            .unwrap();
    }

    #[test]
    fn test_cluster_validate_overlapping_bins_fails() {
        Assert::main_binary()
            .with_args(&[
                "cluster-validate",
                "--contigs",
                "tests/data/set1/contigs.tsv",
                "--cluster-file",
                "tests/data/set1/clusters_overlapping.tsv",
            ])
            .fails()
            .unwrap();
    }
}
