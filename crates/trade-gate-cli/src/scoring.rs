// trade-gate-cli/src/scoring.rs
// ============================================================================
// Module: Prediction Scoring
// Description: Exact-match scoring of predicted requests against references.
// Purpose: Back the `predict` command and the automated evaluation contract.
// Dependencies: trade-gate-llm
// ============================================================================

//! ## Overview
//! Scoring compares the pipeline's terminal observable, the `(method, path)`
//! pair, against reference answers by exact string equality. Parameter
//! correctness inside the path is deliberately not judged separately; the
//! reference pair is the whole contract. Reference files share the
//! `question;METHOD;path` format of the few-shot training set.

// ============================================================================
// SECTION: Imports
// ============================================================================

use trade_gate_llm::FewShotExample;

// ============================================================================
// SECTION: Report
// ============================================================================

/// One reference case the prediction failed to match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    /// Natural-language question.
    pub question: String,
    /// Reference `METHOD /path` pair.
    pub expected: String,
    /// Predicted pair, or the unresolved marker.
    pub predicted: String,
}

/// Exact-match scoring report over one reference set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreReport {
    /// Number of reference cases scored.
    pub total: usize,
    /// Number of exact matches.
    pub matched: usize,
    /// Failed cases in reference order.
    pub mismatches: Vec<Mismatch>,
}

impl ScoreReport {
    /// Returns the exact-match accuracy in `[0.0, 1.0]`.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss, reason = "case counts fit in f64")]
        {
            self.matched as f64 / self.total as f64
        }
    }
}

// ============================================================================
// SECTION: Scoring
// ============================================================================

/// Marker recorded when a query did not resolve.
pub const UNRESOLVED_MARKER: &str = "(unresolved)";

/// Scores a predictor against reference cases by exact-match equality.
pub fn score_cases<F>(cases: &[FewShotExample], mut predict: F) -> ScoreReport
where
    F: FnMut(&str) -> Option<(String, String)>,
{
    let mut matched = 0;
    let mut mismatches = Vec::new();
    for case in cases {
        let expected = format!("{} {}", case.method, case.path);
        let predicted = predict(&case.question)
            .map_or_else(|| UNRESOLVED_MARKER.to_string(), |(method, path)| {
                format!("{method} {path}")
            });
        if predicted == expected {
            matched += 1;
        } else {
            mismatches.push(Mismatch {
                question: case.question.clone(),
                expected,
                predicted,
            });
        }
    }
    ScoreReport {
        total: cases.len(),
        matched,
        mismatches,
    }
}
