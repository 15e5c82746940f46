/// Evaluation metrics computed on the held-out partition and stored in the
/// model bundle, so reports never need to re-run or hard-code them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: i64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub accuracy: f64,
    pub classes: Vec<ClassMetrics>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub rmse: f64,
    pub r2: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EvaluationMetrics {
    Classification(ClassificationReport),
    Regression(RegressionMetrics),
}

impl EvaluationMetrics {
    /// `(name, formatted value)` pairs for report tables.
    pub fn headline(&self) -> Vec<(&'static str, String)> {
        match self {
            EvaluationMetrics::Classification(report) => {
                vec![("Accuracy", format!("{:.4}", report.accuracy))]
            }
            EvaluationMetrics::Regression(m) => vec![
                ("RMSE", format!("{:.4}", m.rmse)),
                ("R²", format!("{:.4}", m.r2)),
            ],
        }
    }
}

/// Safe ratio: 0.0 when the denominator is zero.
fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 { 0.0 } else { num / den }
}

/// Accuracy plus per-class precision/recall/F1/support, classes sorted by
/// label. Every label seen in either `actual` or `predicted` gets a row.
pub fn classification_report(actual: &[i64], predicted: &[i64]) -> ClassificationReport {
    let n = actual.len().min(predicted.len());
    let pairs = || actual.iter().zip(predicted.iter()).take(n);

    let correct = pairs().filter(|(a, p)| a == p).count();
    let accuracy = ratio(correct as f64, n as f64);

    // label -> (true positives, predicted count, actual count)
    let mut tally: BTreeMap<i64, (usize, usize, usize)> = BTreeMap::new();
    for (a, p) in pairs() {
        tally.entry(*a).or_default().2 += 1;
        let entry = tally.entry(*p).or_default();
        entry.1 += 1;
        if a == p {
            entry.0 += 1;
        }
    }

    let classes = tally
        .into_iter()
        .map(|(label, (tp, predicted, support))| {
            let precision = ratio(tp as f64, predicted as f64);
            let recall = ratio(tp as f64, support as f64);
            let f1 = ratio(2.0 * precision * recall, precision + recall);
            ClassMetrics { label, precision, recall, f1, support }
        })
        .collect();

    ClassificationReport { accuracy, classes }
}

/// Root mean squared error and coefficient of determination.
pub fn regression_metrics(actual: &[f64], predicted: &[f64]) -> RegressionMetrics {
    let n = actual.len().min(predicted.len());
    if n == 0 {
        return RegressionMetrics { rmse: 0.0, r2: 0.0 };
    }
    let actual = &actual[..n];
    let predicted = &predicted[..n];

    let ss_res: f64 = actual.iter().zip(predicted).map(|(a, p)| (a - p).powi(2)).sum();
    let mean = actual.iter().sum::<f64>() / n as f64;
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();

    let rmse = (ss_res / n as f64).sqrt();
    let r2 = if ss_tot == 0.0 { 0.0 } else { 1.0 - ss_res / ss_tot };
    RegressionMetrics { rmse, r2 }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>8} {:>10} {:>10} {:>10} {:>10}", "class", "precision", "recall", "f1-score", "support")?;
        for c in &self.classes {
            writeln!(
                f,
                "{:>8} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                c.label, c.precision, c.recall, c.f1, c.support
            )?;
        }
        let total: usize = self.classes.iter().map(|c| c.support).sum();
        write!(f, "{:>8} {:>32.2} {:>10}", "accuracy", self.accuracy, total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_report_per_class() {
        let actual = [0, 0, 0, 1, 1];
        let predicted = [0, 0, 1, 1, 0];

        let report = classification_report(&actual, &predicted);

        assert!((report.accuracy - 0.6).abs() < 1e-12);
        assert_eq!(report.classes.len(), 2);

        let zero = &report.classes[0];
        assert_eq!(zero.label, 0);
        assert_eq!(zero.support, 3);
        assert!((zero.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((zero.recall - 2.0 / 3.0).abs() < 1e-12);

        let one = &report.classes[1];
        assert_eq!(one.support, 2);
        assert!((one.precision - 0.5).abs() < 1e-12);
        assert!((one.f1 - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_never_predicted_class_has_zero_precision() {
        let report = classification_report(&[0, 1, 1], &[0, 0, 0]);
        let one = report.classes.iter().find(|c| c.label == 1).unwrap();
        assert_eq!(one.precision, 0.0);
        assert_eq!(one.recall, 0.0);
        assert_eq!(one.f1, 0.0);
    }

    #[test]
    fn test_regression_metrics_perfect_and_mean() {
        let actual = [0.1, 0.2, 0.3, 0.4];
        let perfect = regression_metrics(&actual, &actual);
        assert_eq!(perfect.rmse, 0.0);
        assert!((perfect.r2 - 1.0).abs() < 1e-12);

        let mean = regression_metrics(&actual, &[0.25; 4]);
        assert!(mean.r2.abs() < 1e-12, "predicting the mean gives r2 = 0");
        assert!(mean.rmse > 0.0);
    }

    #[test]
    fn test_headline_formats_values() {
        let m = EvaluationMetrics::Regression(RegressionMetrics { rmse: 0.02571, r2: 0.73529 });
        assert_eq!(
            m.headline(),
            vec![("RMSE", "0.0257".to_string()), ("R²", "0.7353".to_string())]
        );
    }
}
