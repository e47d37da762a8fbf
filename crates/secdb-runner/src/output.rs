//! JSON and CSV result files

use secdb_core::{ClassificationResult, CommentRecord, Error, LabelSet, Result};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Column written in place of the comment when comments are hidden
pub const COMMENT_LENGTH_FIELD: &str = "_comment_length";

/// Paths of one run's result files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub json: PathBuf,
    pub csv: PathBuf,
}

impl OutputPaths {
    /// `{basename}_{model_safe}.json` and `.csv`
    pub fn new(basename: &str, model: &str) -> Self {
        let base = format!("{}_{}", basename, model_safe(model));
        Self {
            json: PathBuf::from(format!("{}.json", base)),
            csv: PathBuf::from(format!("{}.csv", base)),
        }
    }
}

/// Model name with path separators replaced, usable in a file name
pub fn model_safe(model: &str) -> String {
    model.replace(['/', '\\'], "_")
}

/// Writes enriched records next to each other as JSON and CSV
#[derive(Debug, Clone)]
pub struct ResultWriter {
    text_field: String,
    show_comments: bool,
}

impl ResultWriter {
    pub fn new(text_field: impl Into<String>, show_comments: bool) -> Self {
        Self {
            text_field: text_field.into(),
            show_comments,
        }
    }

    /// Original fields plus the classification outcome, in input order
    pub fn enrich(&self, records: &[CommentRecord], results: &[ClassificationResult]) -> Result<Vec<Value>> {
        if records.len() != results.len() {
            return Err(Error::internal(format!(
                "{} results for {} records",
                results.len(),
                records.len()
            )));
        }

        records
            .iter()
            .zip(results)
            .map(|(record, result)| self.enrich_one(record, result))
            .collect()
    }

    fn enrich_one(&self, record: &CommentRecord, result: &ClassificationResult) -> Result<Value> {
        let mut row: Map<String, Value> = record.fields.clone();

        row.insert("xml".to_string(), Value::String(result.raw_answer.clone()));
        row.insert("pred_labels".to_string(), serde_json::to_value(&result.predicted_labels)?);
        row.insert("gt_labels".to_string(), serde_json::to_value(&record.ground_truth)?);
        row.insert("error".to_string(), optional_string(&result.error));
        row.insert("note".to_string(), optional_string(&result.note));

        if !self.show_comments {
            row.remove(&self.text_field);
            row.insert(COMMENT_LENGTH_FIELD.to_string(), Value::from(result.comment_length));
        }

        Ok(Value::Object(row))
    }

    /// Write both files, creating the parent directory if needed
    pub fn write(&self, paths: &OutputPaths, records: &[CommentRecord], results: &[ClassificationResult]) -> Result<()> {
        let rows = self.enrich(records, results)?;

        if let Some(parent) = paths.json.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        self.write_json(&paths.json, &rows)?;
        self.write_csv(&paths.csv, records, results, &rows)?;
        Ok(())
    }

    fn write_json(&self, path: &Path, rows: &[Value]) -> Result<()> {
        let mut file = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut file, rows)?;
        writeln!(file)?;
        file.flush()?;
        Ok(())
    }

    fn write_csv(
        &self,
        path: &Path,
        records: &[CommentRecord],
        results: &[ClassificationResult],
        rows: &[Value],
    ) -> Result<()> {
        let mut file = BufWriter::new(File::create(path)?);

        let comment_column = if self.show_comments {
            self.text_field.as_str()
        } else {
            COMMENT_LENGTH_FIELD
        };
        writeln!(
            file,
            "index,{},xml,pred_labels,gt_labels,error,exact_match",
            csv_cell(comment_column)
        )?;

        for (index, ((record, result), row)) in records.iter().zip(results).zip(rows).enumerate() {
            let comment = cell_text(row.get(comment_column));
            writeln!(
                file,
                "{},{},{},{},{},{},{}",
                index,
                csv_cell(&comment),
                csv_cell(&result.raw_answer),
                csv_cell(&labels_cell(&result.predicted_labels)),
                csv_cell(&labels_cell(&record.ground_truth)),
                csv_cell(result.error.as_deref().unwrap_or("")),
                u8::from(result.predicted_labels.same_labels(&record.ground_truth))
            )?;
        }

        file.flush()?;
        Ok(())
    }
}

fn optional_string(value: &Option<String>) -> Value {
    value.clone().map(Value::String).unwrap_or(Value::Null)
}

fn labels_cell(labels: &LabelSet) -> String {
    labels.iter().map(|label| label.as_str()).collect::<Vec<_>>().join(",")
}

/// Plain text of a JSON value for a CSV cell
fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Quote a cell when it contains a delimiter, quote, or line break
fn csv_cell(value: &str) -> Cow<'_, str> {
    if value.contains(&[',', '"', '\r', '\n'][..]) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}
