/// Column preprocessing fitted at training time and replayed at inference.
///
/// Numeric columns: impute with the training median, then standardize with
/// the training mean and (population) standard deviation.
/// Categorical columns: impute with the most frequent training value, then
/// one-hot encode over the sorted training categories. A category never
/// seen in training encodes as all zeros rather than failing.
///
/// Output layout is every numeric column followed by every categorical
/// block, in the order the column lists were given to `fit`.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;

use crate::align::AlignedRow;
use crate::dataset::{self, Column, Frame};
use crate::error::PipelineError;

/// Imputation value used when a categorical column had no values at all.
const EMPTY_CATEGORY: &str = "missing";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnTransform {
    Numeric { median: f64, mean: f64, scale: f64 },
    Categorical { most_frequent: String, categories: Vec<String> },
}

impl ColumnTransform {
    fn width(&self) -> usize {
        match self {
            ColumnTransform::Numeric { .. } => 1,
            ColumnTransform::Categorical { categories, .. } => categories.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub transform: ColumnTransform,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    columns: Vec<ColumnSpec>,
}

/// One input cell, independent of where it came from.
enum Cell<'a> {
    Missing,
    Number(f64),
    Text(Cow<'a, str>),
}

impl Preprocessor {
    /// Fits imputation, scaling and category statistics on `frame`.
    /// Columns listed in neither `numeric` nor `categorical` are dropped.
    pub fn fit(frame: &Frame, numeric: &[String], categorical: &[String]) -> Result<Self, PipelineError> {
        if frame.n_rows() == 0 {
            return Err(PipelineError::EmptyDataset);
        }

        let mut columns = Vec::with_capacity(numeric.len() + categorical.len());

        for name in numeric {
            let values = match frame.column(name) {
                Some(Column::Numeric(v)) => v,
                Some(Column::Categorical(v)) => {
                    return Err(PipelineError::NotNumeric {
                        feature: name.clone(),
                        value: v.iter().flatten().next().cloned().unwrap_or_default(),
                    });
                }
                None => return Err(PipelineError::UnknownColumn(name.clone())),
            };

            let present: Vec<f64> = values.iter().flatten().copied().collect();
            let median = dataset::median(&present).unwrap_or(0.0);
            let imputed: Vec<f64> = values.iter().map(|v| v.unwrap_or(median)).collect();
            let mean = dataset::mean(&imputed).unwrap_or(0.0);
            let std = dataset::std_dev(&imputed).unwrap_or(0.0);
            let scale = if std > f64::EPSILON { std } else { 1.0 };

            columns.push(ColumnSpec {
                name: name.clone(),
                transform: ColumnTransform::Numeric { median, mean, scale },
            });
        }

        for name in categorical {
            let values: Vec<Option<String>> = match frame.column(name) {
                Some(Column::Categorical(v)) => v.clone(),
                Some(Column::Numeric(v)) => v.iter().map(|x| x.map(category_key)).collect(),
                None => return Err(PipelineError::UnknownColumn(name.clone())),
            };

            let most_frequent = dataset::most_frequent(values.iter().flatten().map(String::as_str))
                .unwrap_or_else(|| EMPTY_CATEGORY.to_string());
            let mut categories: Vec<String> = values
                .into_iter()
                .map(|v| v.unwrap_or_else(|| most_frequent.clone()))
                .collect();
            categories.sort();
            categories.dedup();

            columns.push(ColumnSpec {
                name: name.clone(),
                transform: ColumnTransform::Categorical { most_frequent, categories },
            });
        }

        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Number of encoded features produced per row.
    pub fn output_width(&self) -> usize {
        self.columns.iter().map(|c| c.transform.width()).sum()
    }

    /// Encodes a single aligned inference row.
    pub fn transform_row(&self, row: &AlignedRow<'_>) -> Result<Vec<f64>, PipelineError> {
        let mut out = Vec::with_capacity(self.output_width());
        for spec in &self.columns {
            let cell = match row.get(&spec.name) {
                Some(value) => cell_from_json(&spec.name, value)?,
                None => Cell::Missing,
            };
            encode(spec, cell, &mut out)?;
        }
        Ok(out)
    }

    /// Encodes every row of a training/evaluation frame.
    pub fn transform_frame(&self, frame: &Frame) -> Result<Array2<f64>, PipelineError> {
        let sources: Vec<&Column> = self
            .columns
            .iter()
            .map(|spec| frame.column(&spec.name).ok_or_else(|| PipelineError::UnknownColumn(spec.name.clone())))
            .collect::<Result<_, _>>()?;

        let n_rows = frame.n_rows();
        let width = self.output_width();
        let mut data = Vec::with_capacity(n_rows * width);

        for r in 0..n_rows {
            for (spec, column) in self.columns.iter().zip(&sources) {
                let cell = match column {
                    Column::Numeric(v) => v[r].map(Cell::Number).unwrap_or(Cell::Missing),
                    Column::Categorical(v) => v[r]
                        .as_deref()
                        .map(|s| Cell::Text(Cow::Borrowed(s)))
                        .unwrap_or(Cell::Missing),
                };
                encode(spec, cell, &mut data)?;
            }
        }

        Array2::from_shape_vec((n_rows, width), data).map_err(|e| PipelineError::Shape(e.to_string()))
    }
}

fn cell_from_json<'a>(feature: &str, value: &'a Value) -> Result<Cell<'a>, PipelineError> {
    match value {
        Value::Null => Ok(Cell::Missing),
        Value::Number(n) => n.as_f64().map(Cell::Number).ok_or_else(|| PipelineError::UnsupportedValue {
            feature: feature.to_string(),
            value: n.to_string(),
        }),
        Value::String(s) => Ok(Cell::Text(Cow::Borrowed(s))),
        Value::Bool(b) => Ok(Cell::Number(if *b { 1.0 } else { 0.0 })),
        other => Err(PipelineError::UnsupportedValue {
            feature: feature.to_string(),
            value: other.to_string(),
        }),
    }
}

fn encode(spec: &ColumnSpec, cell: Cell<'_>, out: &mut Vec<f64>) -> Result<(), PipelineError> {
    match &spec.transform {
        ColumnTransform::Numeric { median, mean, scale } => {
            let raw = match cell {
                Cell::Missing => *median,
                Cell::Number(x) if x.is_nan() => *median,
                Cell::Number(x) => x,
                Cell::Text(s) => match s.trim().parse::<f64>() {
                    Ok(x) if x.is_nan() => *median,
                    Ok(x) => x,
                    Err(_) => {
                        return Err(PipelineError::NotNumeric {
                            feature: spec.name.clone(),
                            value: format!("{:?}", s),
                        });
                    }
                },
            };
            out.push((raw - mean) / scale);
        }
        ColumnTransform::Categorical { most_frequent, categories } => {
            let key: Cow<'_, str> = match cell {
                Cell::Missing => Cow::Borrowed(most_frequent.as_str()),
                Cell::Number(x) => Cow::Owned(category_key(x)),
                Cell::Text(s) => s,
            };
            let hit = categories.binary_search_by(|c| c.as_str().cmp(key.as_ref())).ok();
            out.extend((0..categories.len()).map(|i| if Some(i) == hit { 1.0 } else { 0.0 }));
        }
    }
    Ok(())
}

/// Category label for a numeric value (`3.0` becomes `"3"`).
fn category_key(x: f64) -> String {
    format!("{}", x)
}
