/// Tabular dataset loading and cleaning for the training binaries.
///
/// A `Frame` is a set of named, typed columns read from CSV. A column is
/// numeric when every non-empty cell parses as a float; anything else is
/// categorical. Empty cells, the usual NA markers (`NA`, `N/A`, `nan`,
/// `null` ...) and values parsing to NaN become `None` and are filled by the
/// cleaning helpers below (median, most frequent, IQR clipping) before fitting.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read dataset {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("dataset has no header row")]
    NoHeader,

    #[error("row {row} has {actual} fields, expected {expected}")]
    RaggedRow { row: usize, expected: usize, actual: usize },
}

/// Cell texts read as missing, matching the markers common CSV exporters write.
const NA_MARKERS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN", "<NA>", "N/A",
    "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub fn is_na_marker(field: &str) -> bool {
    field.is_empty() || NA_MARKERS.contains(&field)
}

// ---------------------------------------------------------------------------
// Columns and frames
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Numeric(Vec<Option<f64>>),
    Categorical(Vec<Option<String>>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(v) => v.len(),
            Column::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Column::Numeric(_))
    }

    pub fn null_count(&self) -> usize {
        match self {
            Column::Numeric(v) => v.iter().filter(|x| x.is_none()).count(),
            Column::Categorical(v) => v.iter().filter(|x| x.is_none()).count(),
        }
    }

    fn select(&self, rows: &[usize]) -> Column {
        match self {
            Column::Numeric(v) => Column::Numeric(rows.iter().map(|&i| v[i]).collect()),
            Column::Categorical(v) => {
                Column::Categorical(rows.iter().map(|&i| v[i].clone()).collect())
            }
        }
    }
}

/// Named columns of equal length.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    names: Vec<String>,
    columns: Vec<Column>,
}

impl Frame {
    /// Builds a frame from `(name, column)` pairs. All columns must have the
    /// same length.
    pub fn new(columns: Vec<(String, Column)>) -> Self {
        let (names, columns): (Vec<_>, Vec<_>) = columns.into_iter().unzip();
        debug_assert!(
            columns.windows(2).all(|w| w[0].len() == w[1].len()),
            "frame columns must have equal length"
        );
        Self { names, columns }
    }

    /// Reads a CSV file from disk.
    pub fn from_csv_path(path: &Path) -> Result<Self, DatasetError> {
        let file = std::fs::File::open(path).map_err(|e| DatasetError::Csv {
            path: path.to_path_buf(),
            source: csv::Error::from(e),
        })?;
        Self::from_csv_reader(file).map_err(|e| match e {
            DatasetError::Csv { source, .. } => DatasetError::Csv {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Reads CSV from any reader. Column names are normalized with
    /// `normalize_column_name`.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, DatasetError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()
            .map_err(|source| DatasetError::Csv { path: PathBuf::new(), source })?
            .iter()
            .map(normalize_column_name)
            .collect();
        if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
            return Err(DatasetError::NoHeader);
        }

        let mut raw: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
        for (i, record) in rdr.records().enumerate() {
            let record = record.map_err(|source| DatasetError::Csv { path: PathBuf::new(), source })?;
            if record.len() != headers.len() {
                return Err(DatasetError::RaggedRow {
                    row: i + 1,
                    expected: headers.len(),
                    actual: record.len(),
                });
            }
            for (col, field) in raw.iter_mut().zip(record.iter()) {
                let field = field.trim();
                col.push(if is_na_marker(field) { None } else { Some(field.to_string()) });
            }
        }

        let columns = headers
            .into_iter()
            .zip(raw)
            .map(|(name, cells)| (name, infer_column(cells)))
            .collect();

        Ok(Self::new(columns))
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.position(name).map(|i| &self.columns[i])
    }

    fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        let i = self.position(name)?;
        self.columns.get_mut(i)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn numeric_names(&self) -> Vec<String> {
        self.names_where(true)
    }

    pub fn categorical_names(&self) -> Vec<String> {
        self.names_where(false)
    }

    fn names_where(&self, numeric: bool) -> Vec<String> {
        self.names
            .iter()
            .zip(&self.columns)
            .filter(|(_, c)| c.is_numeric() == numeric)
            .map(|(n, _)| n.clone())
            .collect()
    }

    /// Removes a column and returns it, e.g. to split off the target.
    pub fn drop_column(&mut self, name: &str) -> Option<Column> {
        let i = self.position(name)?;
        self.names.remove(i);
        Some(self.columns.remove(i))
    }

    /// New frame containing only `rows`, in the given order.
    pub fn select_rows(&self, rows: &[usize]) -> Frame {
        Frame {
            names: self.names.clone(),
            columns: self.columns.iter().map(|c| c.select(rows)).collect(),
        }
    }

    /// Fills empty cells of a numeric column with its median. Returns the
    /// fill value, or `None` if the column is absent, categorical, or empty.
    pub fn fill_median(&mut self, name: &str) -> Option<f64> {
        let Some(Column::Numeric(values)) = self.column_mut(name) else {
            return None;
        };
        let present: Vec<f64> = values.iter().flatten().copied().collect();
        let fill = median(&present)?;
        for v in values.iter_mut().filter(|v| v.is_none()) {
            *v = Some(fill);
        }
        Some(fill)
    }

    /// Fills empty cells of a categorical column with its most frequent
    /// value, or `fallback` when the column has no values at all.
    pub fn fill_most_frequent(&mut self, name: &str, fallback: Option<&str>) -> Option<String> {
        let Some(Column::Categorical(values)) = self.column_mut(name) else {
            return None;
        };
        let fill = most_frequent(values.iter().flatten().map(String::as_str))
            .or_else(|| fallback.map(str::to_string))?;
        for v in values.iter_mut().filter(|v| v.is_none()) {
            *v = Some(fill.clone());
        }
        Some(fill)
    }

    /// Clips a numeric column to `[Q1 - 1.5 IQR, Q3 + 1.5 IQR]`. Returns the
    /// fence applied.
    pub fn clip_iqr(&mut self, name: &str) -> Option<(f64, f64)> {
        let Some(Column::Numeric(values)) = self.column_mut(name) else {
            return None;
        };
        let mut sorted: Vec<f64> = values.iter().flatten().copied().collect();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let q1 = quantile(&sorted, 0.25)?;
        let q3 = quantile(&sorted, 0.75)?;
        let iqr = q3 - q1;
        let (lower, upper) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);
        for v in values.iter_mut().flatten() {
            *v = v.clamp(lower, upper);
        }
        Some((lower, upper))
    }
}

fn infer_column(cells: Vec<Option<String>>) -> Column {
    let parsed: Option<Vec<Option<f64>>> = cells
        .iter()
        .map(|c| match c {
            None => Some(None),
            Some(s) => s.parse::<f64>().ok().map(|v| if v.is_nan() { None } else { Some(v) }),
        })
        .collect();

    match parsed {
        Some(values) => Column::Numeric(values),
        None => Column::Categorical(cells),
    }
}

/// Trims a header and replaces inner spaces with underscores.
pub fn normalize_column_name(name: &str) -> String {
    name.trim().replace(' ', "_")
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (as used for standardization).
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let var = values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / values.len() as f64;
    Some(var.sqrt())
}

pub fn median(values: &[f64]) -> Option<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    quantile(&sorted, 0.5)
}

/// Quantile of pre-sorted values with linear interpolation between ranks.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Most frequent value; ties go to the lexicographically smallest.
pub fn most_frequent<'a>(values: impl Iterator<Item = &'a str>) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for v in values {
        *counts.entry(v).or_default() += 1;
    }
    // BTreeMap iterates in key order, so the first maximum is the smallest key.
    let best = counts.values().copied().max()?;
    counts
        .into_iter()
        .find(|(_, c)| *c == best)
        .map(|(v, _)| v.to_string())
}

// ---------------------------------------------------------------------------
// Splitting
// ---------------------------------------------------------------------------

/// Train/test row indices.
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffled split with `ceil(n * test_fraction)` rows held out.
pub fn train_test_split(n_rows: usize, test_fraction: f64, seed: u64) -> Split {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut idx: Vec<usize> = (0..n_rows).collect();
    idx.shuffle(&mut rng);

    let n_test = ((n_rows as f64) * test_fraction).ceil() as usize;
    let n_test = n_test.min(n_rows);
    let test = idx.split_off(n_rows - n_test);
    Split { train: idx, test }
}

/// Split that preserves class proportions: each class contributes
/// `round(count * test_fraction)` rows to the test partition.
pub fn stratified_split(labels: &[i64], test_fraction: f64, seed: u64) -> Split {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut by_class: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (i, label) in labels.iter().enumerate() {
        by_class.entry(*label).or_default().push(i);
    }

    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::new();
    for (_, mut rows) in by_class {
        rows.shuffle(&mut rng);
        let n_test = ((rows.len() as f64) * test_fraction).round() as usize;
        let held = rows.split_off(rows.len() - n_test.min(rows.len()));
        train.extend(rows);
        test.extend(held);
    }
    train.shuffle(&mut rng);
    test.shuffle(&mut rng);
    Split { train, test }
}

/// Counts per distinct label, for logging class balance.
pub fn class_counts(labels: &[i64]) -> HashMap<i64, usize> {
    let mut counts = HashMap::new();
    for l in labels {
        *counts.entry(*l).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
 magnitude ,depth,alert,country name
7.0,14,green,Japan
6.5,,,Chile
7.4,25,yellow,Japan
6.9,10,green,
";

    fn sample() -> Frame {
        Frame::from_csv_reader(SAMPLE.as_bytes()).expect("sample should parse")
    }

    #[test]
    fn test_header_names_are_normalized() {
        let frame = sample();
        assert_eq!(frame.names(), &["magnitude", "depth", "alert", "country_name"]);
        assert_eq!(frame.n_rows(), 4);
    }

    #[test]
    fn test_column_types_inferred() {
        let frame = sample();
        assert!(frame.column("magnitude").unwrap().is_numeric());
        assert!(frame.column("depth").unwrap().is_numeric());
        assert!(!frame.column("alert").unwrap().is_numeric());
        assert_eq!(frame.numeric_names(), vec!["magnitude", "depth"]);
        assert_eq!(frame.categorical_names(), vec!["alert", "country_name"]);
    }

    #[test]
    fn test_na_markers_read_as_missing() {
        let csv = "depth,alert\n10,green\nNA,N/A\nnan,null\n30,red\n";
        let mut frame = Frame::from_csv_reader(csv.as_bytes()).unwrap();

        assert!(frame.column("depth").unwrap().is_numeric());
        assert_eq!(frame.column("depth").unwrap().null_count(), 2);
        assert_eq!(frame.column("alert").unwrap().null_count(), 2);
        assert_eq!(frame.fill_median("depth"), Some(20.0));
    }

    #[test]
    fn test_nan_text_is_missing_not_a_value() {
        // "NAN" is not a marker but still parses to NaN.
        let cells = vec![Some("1".to_string()), Some("NAN".to_string()), Some("3".to_string())];
        assert_eq!(infer_column(cells), Column::Numeric(vec![Some(1.0), None, Some(3.0)]));
        assert!(is_na_marker("-NaN"));
        assert!(!is_na_marker("0"));
    }

    #[test]
    fn test_fill_median_and_mode() {
        let mut frame = sample();
        assert_eq!(frame.fill_median("depth"), Some(14.0));
        assert_eq!(frame.column("depth").unwrap().null_count(), 0);

        assert_eq!(frame.fill_most_frequent("alert", None), Some("green".to_string()));
        assert_eq!(frame.fill_most_frequent("country_name", None), Some("Japan".to_string()));
        assert_eq!(frame.column("alert").unwrap().null_count(), 0);
    }

    #[test]
    fn test_fill_on_wrong_type_is_noop() {
        let mut frame = sample();
        assert_eq!(frame.fill_median("alert"), None);
        assert_eq!(frame.fill_most_frequent("depth", None), None);
        assert_eq!(frame.fill_median("nope"), None);
    }

    #[test]
    fn test_fill_most_frequent_fallback_for_empty_column() {
        let mut frame = Frame::new(vec![(
            "region".to_string(),
            Column::Categorical(vec![None, None]),
        )]);
        assert_eq!(
            frame.fill_most_frequent("region", Some("missing")),
            Some("missing".to_string())
        );
    }

    #[test]
    fn test_quantile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&sorted, 0.0), Some(1.0));
        assert_eq!(quantile(&sorted, 1.0), Some(4.0));
        assert!((quantile(&sorted, 0.25).unwrap() - 1.75).abs() < 1e-12);
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_clip_iqr_caps_outliers() {
        let mut frame = Frame::new(vec![(
            "rain".to_string(),
            Column::Numeric(vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(100.0)]),
        )]);
        let (lower, upper) = frame.clip_iqr("rain").unwrap();
        assert_eq!((lower, upper), (-1.0, 7.0));
        match frame.column("rain").unwrap() {
            Column::Numeric(v) => assert_eq!(v[4], Some(7.0)),
            _ => panic!("rain should stay numeric"),
        }
    }

    #[test]
    fn test_most_frequent_breaks_ties_lexicographically() {
        let values = ["b", "a", "b", "a", "c"];
        assert_eq!(most_frequent(values.iter().copied()), Some("a".to_string()));
        assert_eq!(most_frequent(std::iter::empty::<&str>()), None);
    }

    #[test]
    fn test_train_test_split_partitions_all_rows() {
        let split = train_test_split(10, 0.2, 42);
        assert_eq!(split.test.len(), 2);
        assert_eq!(split.train.len(), 8);

        let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
        all.sort();
        assert_eq!(all, (0..10).collect::<Vec<_>>());

        assert_eq!(split, train_test_split(10, 0.2, 42), "same seed, same split");
    }

    #[test]
    fn test_stratified_split_keeps_class_balance() {
        let labels: Vec<i64> = (0..100).map(|i| if i < 80 { 0 } else { 1 }).collect();
        let split = stratified_split(&labels, 0.2, 42);

        let test_labels: Vec<i64> = split.test.iter().map(|&i| labels[i]).collect();
        let counts = class_counts(&test_labels);
        assert_eq!(counts.get(&0), Some(&16));
        assert_eq!(counts.get(&1), Some(&4));
        assert_eq!(split.train.len() + split.test.len(), 100);
    }

    #[test]
    fn test_drop_and_select() {
        let mut frame = sample();
        let target = frame.drop_column("alert").expect("alert exists");
        assert_eq!(target.len(), 4);
        assert_eq!(frame.n_columns(), 3);

        let subset = frame.select_rows(&[2, 0]);
        assert_eq!(subset.n_rows(), 2);
        match subset.column("magnitude").unwrap() {
            Column::Numeric(v) => assert_eq!(v, &vec![Some(7.4), Some(7.0)]),
            _ => panic!("magnitude should be numeric"),
        }
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = Frame::from_csv_reader("a,b\n1,2\n3\n".as_bytes()).unwrap_err();
        assert!(matches!(err, DatasetError::RaggedRow { row: 2, .. }));
    }
}
