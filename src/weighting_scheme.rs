use std::path::Path;

use crate::errors::{BinvoteError, BinvoteResult};

/// One way of combining the similarity signals into a single pair score.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightingScheme {
    pub rank: u32,
    pub label: String,
    pub coverage_weight: f64,
    pub tetranucleotide_weight: f64,
    pub reference_weight: f64,
    pub role_duplication_penalty: f64,
    pub role_weight: f64,
    /// Fraction of the active signal weights a pair must reach to be joined
    pub minscore: f64,
}

impl WeightingScheme {
    /// Parse the weights from the six-number form
    /// `coverage,tetranucleotide,reference,penalty,role,minscore`.
    pub fn from_weights(label: &str, weights: &[f64]) -> BinvoteResult<WeightingScheme> {
        if weights.len() != 6 {
            return Err(BinvoteError::InvalidArgument(format!(
                "expected 6 weights for scheme '{}', found {}",
                label,
                weights.len()
            )));
        }
        let scheme = WeightingScheme {
            rank: 1,
            label: label.to_string(),
            coverage_weight: weights[0],
            tetranucleotide_weight: weights[1],
            reference_weight: weights[2],
            role_duplication_penalty: weights[3],
            role_weight: weights[4],
            minscore: weights[5],
        };
        scheme.validate()?;
        Ok(scheme)
    }

    fn named_weights(&self) -> [(&'static str, f64); 6] {
        [
            ("coverage", self.coverage_weight),
            ("tetranucleotide", self.tetranucleotide_weight),
            ("reference", self.reference_weight),
            ("role duplication penalty", self.role_duplication_penalty),
            ("role", self.role_weight),
            ("minscore", self.minscore),
        ]
    }

    pub fn validate(&self) -> BinvoteResult<()> {
        for (name, value) in self.named_weights().iter() {
            if !value.is_finite() || *value < 0.0 {
                return Err(BinvoteError::InvalidWeight {
                    label: self.label.clone(),
                    name: *name,
                    value: *value,
                });
            }
        }
        // The penalty and minscore alone give nothing to threshold against.
        if self.active_weight_sum() == 0.0 {
            return Err(BinvoteError::AllZeroScheme {
                label: self.label.clone(),
            });
        }
        Ok(())
    }

    /// Sum of the non-zero signal weights. The duplication penalty is not a
    /// signal.
    pub fn active_weight_sum(&self) -> f64 {
        [
            self.coverage_weight,
            self.tetranucleotide_weight,
            self.reference_weight,
            self.role_weight,
        ]
        .iter()
        .filter(|w| **w > 0.0)
        .sum()
    }

    /// Score a pair must reach to be joined when every signal was computed.
    pub fn effective_minscore(&self) -> f64 {
        self.minscore * self.active_weight_sum()
    }
}

/// Validate a list of schemes that are about to vote.
pub fn validate_schemes(schemes: &[WeightingScheme]) -> BinvoteResult<()> {
    if schemes.is_empty() {
        return Err(BinvoteError::EmptySchemeList);
    }
    for scheme in schemes {
        scheme.validate()?;
    }
    Ok(())
}

/// Read a scheme file: tab separated, no header, lines starting with '#'
/// ignored, with columns rank, label and the six weights in
/// `WeightingScheme` field order.
pub fn read_scheme_file(file_path: &str) -> BinvoteResult<Vec<WeightingScheme>> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .comment(Some(b'#'))
        .flexible(true)
        .from_path(Path::new(file_path))?;

    let mut schemes = vec![];
    for result in rdr.records() {
        let record = result?;
        let line = record.position().map_or(0, |p| p.line());
        let parse_error = |message: String| BinvoteError::Parse {
            path: file_path.to_string(),
            line,
            message,
        };
        if record.len() != 8 {
            return Err(parse_error(format!(
                "expected 8 columns (rank, label and 6 weights), found {}",
                record.len()
            )));
        }
        let rank = record[0]
            .trim()
            .parse::<u32>()
            .map_err(|e| parse_error(format!("bad rank '{}': {}", &record[0], e)))?;
        let mut weights = [0f64; 6];
        for (i, weight) in weights.iter_mut().enumerate() {
            let field = &record[i + 2];
            *weight = field
                .trim()
                .parse::<f64>()
                .map_err(|e| parse_error(format!("bad weight '{}': {}", field, e)))?;
        }
        let mut scheme = WeightingScheme::from_weights(&record[1], &weights)?;
        scheme.rank = rank;
        trace!("Read scheme {:?}", scheme);
        schemes.push(scheme);
    }
    debug!("Read in {} weighting schemes from {}", schemes.len(), file_path);
    Ok(schemes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_effective_minscore_scales_with_active_weights() {
        init();
        let scheme =
            WeightingScheme::from_weights("s", &[2.0, 0.0, 1.0, 5.0, 0.0, 0.5]).unwrap();
        assert_eq!(3.0, scheme.active_weight_sum());
        assert_eq!(1.5, scheme.effective_minscore());
    }

    #[test]
    fn test_all_zero_rejected() {
        init();
        match WeightingScheme::from_weights("zeros", &[0.0; 6]) {
            Err(BinvoteError::AllZeroScheme { label }) => assert_eq!("zeros", label),
            other => panic!("Unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_no_signal_weight_rejected() {
        init();
        for weights in &[[0.0, 0.0, 0.0, 0.0, 0.0, 1.0], [0.0, 0.0, 0.0, 2.0, 0.0, 0.5]] {
            assert!(matches!(
                WeightingScheme::from_weights("no_signal", weights),
                Err(BinvoteError::AllZeroScheme { .. })
            ));
        }
        assert!(WeightingScheme::from_weights("roles", &[0.0, 0.0, 0.0, 1.0, 0.5, 0.5]).is_ok());
    }

    #[test]
    fn test_negative_weight_rejected() {
        init();
        match WeightingScheme::from_weights("neg", &[1.0, -1.0, 0.0, 0.0, 0.0, 1.0]) {
            Err(BinvoteError::InvalidWeight { name, .. }) => assert_eq!("tetranucleotide", name),
            other => panic!("Unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_wrong_number_of_weights() {
        init();
        assert!(WeightingScheme::from_weights("s", &[1.0, 1.0]).is_err());
    }

    #[test]
    fn test_empty_scheme_list() {
        init();
        assert!(matches!(
            validate_schemes(&[]),
            Err(BinvoteError::EmptySchemeList)
        ));
    }

    #[test]
    fn test_read_scheme_file() {
        init();
        let mut tf = tempfile::NamedTempFile::new().unwrap();
        writeln!(tf, "# rank\tlabel\tweights").unwrap();
        writeln!(tf, "1\tbalanced\t1\t1\t1\t0.5\t0.1\t0.6").unwrap();
        writeln!(tf, "2\treference_only\t0\t0\t1\t0\t0\t1").unwrap();
        let schemes = read_scheme_file(tf.path().to_str().unwrap()).unwrap();
        assert_eq!(2, schemes.len());
        assert_eq!(
            WeightingScheme {
                rank: 2,
                label: "reference_only".to_string(),
                coverage_weight: 0.0,
                tetranucleotide_weight: 0.0,
                reference_weight: 1.0,
                role_duplication_penalty: 0.0,
                role_weight: 0.0,
                minscore: 1.0,
            },
            schemes[1]
        );
        assert_eq!(0.5, schemes[0].role_duplication_penalty);
    }

    #[test]
    fn test_read_scheme_file_bad_column_count() {
        init();
        let mut tf = tempfile::NamedTempFile::new().unwrap();
        writeln!(tf, "1\tshort\t1\t1").unwrap();
        assert!(matches!(
            read_scheme_file(tf.path().to_str().unwrap()),
            Err(BinvoteError::Parse { .. })
        ));
    }
}
