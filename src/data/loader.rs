use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{Array, AsArray};
use arrow::datatypes::{DataType, Float32Type, Float64Type, Int32Type, Int64Type};
use arrow::util::pretty::pretty_format_batches;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{CellValue, Dataset, Sample};

/// Markers that spreadsheet and pandas exports use for missing values.
const NA_MARKERS: &[&str] = &["NA", "N/A", "NaN", "nan", "null", "NULL", "-"];

/// How delimited text is split and parsed.
#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    pub delimiter: u8,
    pub decimal: char,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: b';',
            decimal: '.',
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a tabular dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv` / `.txt` – delimited text with a header row (`;` by default)
/// * `.json`         – `[{ "PONTOS": "P1", "PH_AGUA": 5.2, ... }, ...]`
/// * `.parquet`      – flat scalar columns
pub fn load_file(path: &Path, options: &LoadOptions) -> Result<Dataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let dataset = match ext.as_str() {
        "csv" | "txt" => load_csv(path, options),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    log::info!(
        "Loaded {} samples × {} columns from {}",
        dataset.len(),
        dataset.column_names.len(),
        path.display()
    );
    Ok(dataset)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Delimited layout: one header row, one sample per line.
/// Cells are trimmed and typed with [`guess_cell_type`].
fn load_csv(path: &Path, options: &LoadOptions) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .flexible(false)
        .from_path(path)
        .context("opening CSV")?;

    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let mut samples = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;

        let cells = record
            .iter()
            .zip(&headers)
            .map(|(value, col)| (col.clone(), guess_cell_type(value, options.decimal)))
            .collect();

        samples.push(Sample { cells });
    }

    Ok(Dataset::from_samples(headers, samples))
}

/// Type a raw text cell. Integers win over floats so that numeric group
/// labels (depths, plot numbers) sort numerically.
pub fn guess_cell_type(raw: &str, decimal: char) -> CellValue {
    let s = raw.trim();
    if s.is_empty() || NA_MARKERS.contains(&s) {
        return CellValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    let parsed = if decimal == ',' {
        s.replace(',', ".").parse::<f64>()
    } else {
        s.parse::<f64>()
    };
    if let Ok(f) = parsed {
        return CellValue::Float(f);
    }
    if s == "true" || s == "false" {
        return CellValue::Bool(s == "true");
    }
    CellValue::String(s.to_string())
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "PONTOS": "P1", "PROFUNDIDADE": "0-20", "PH_AGUA": 5.4 },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<Dataset> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut column_names: Vec<String> = Vec::new();
    let mut samples = Vec::with_capacity(records.len());

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        let mut cells = BTreeMap::new();
        for (key, val) in obj {
            if !column_names.contains(key) {
                column_names.push(key.clone());
            }
            cells.insert(key.clone(), json_to_cell(val));
        }

        samples.push(Sample { cells });
    }

    Ok(Dataset::from_samples(column_names, samples))
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => guess_cell_type(s, '.'),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with one scalar column per variable or factor.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<Dataset> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let column_names: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut samples: Vec<Sample> = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();
        if samples.is_empty() && log::log_enabled!(log::Level::Trace) {
            let head = batch.slice(0, batch.num_rows().min(5));
            if let Ok(table) = pretty_format_batches(&[head]) {
                log::trace!("First rows of {}:\n{table}", path.display());
            }
        }

        for row in 0..batch.num_rows() {
            let mut cells = BTreeMap::new();
            for (col_idx, field) in schema.fields().iter().enumerate() {
                let value = extract_cell(batch.column(col_idx), row)
                    .with_context(|| format!("Row {row}, column '{}'", field.name()))?;
                cells.insert(field.name().clone(), value);
            }
            samples.push(Sample { cells });
        }
    }

    Ok(Dataset::from_samples(column_names, samples))
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell(col: &Arc<dyn Array>, row: usize) -> Result<CellValue> {
    if col.is_null(row) {
        return Ok(CellValue::Null);
    }
    let value = match col.data_type() {
        DataType::Utf8 => guess_cell_type(col.as_string::<i32>().value(row), '.'),
        DataType::LargeUtf8 => guess_cell_type(col.as_string::<i64>().value(row), '.'),
        DataType::Int32 => CellValue::Integer(col.as_primitive::<Int32Type>().value(row) as i64),
        DataType::Int64 => CellValue::Integer(col.as_primitive::<Int64Type>().value(row)),
        DataType::Float32 => CellValue::Float(col.as_primitive::<Float32Type>().value(row) as f64),
        DataType::Float64 => {
            let v = col.as_primitive::<Float64Type>().value(row);
            if v.is_nan() {
                CellValue::Null
            } else {
                CellValue::Float(v)
            }
        }
        DataType::Boolean => CellValue::Bool(col.as_boolean().value(row)),
        other => bail!("unsupported column type {other:?}"),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn guesses_cell_types() {
        assert_eq!(guess_cell_type("", '.'), CellValue::Null);
        assert_eq!(guess_cell_type(" NA ", '.'), CellValue::Null);
        assert_eq!(guess_cell_type("20", '.'), CellValue::Integer(20));
        assert_eq!(guess_cell_type("5.25", '.'), CellValue::Float(5.25));
        assert_eq!(guess_cell_type("5,25", ','), CellValue::Float(5.25));
        assert_eq!(
            guess_cell_type("5,25", '.'),
            CellValue::String("5,25".into())
        );
        assert_eq!(
            guess_cell_type("0-20", '.'),
            CellValue::String("0-20".into())
        );
    }

    #[test]
    fn loads_semicolon_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dados.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "PONTOS;PROFUNDIDADE;PH_AGUA").unwrap();
        writeln!(file, "P1;0-20;5.4").unwrap();
        writeln!(file, "P2;20-40;").unwrap();
        drop(file);

        let ds = load_file(&path, &LoadOptions::default()).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.column_names, vec!["PONTOS", "PROFUNDIDADE", "PH_AGUA"]);
        assert_eq!(ds.samples[0].get("PH_AGUA"), &CellValue::Float(5.4));
        assert!(ds.samples[1].get("PH_AGUA").is_null());
    }

    #[test]
    fn loads_json_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dados.json");
        std::fs::write(
            &path,
            r#"[{"PONTOS": "P1", "SODIO": 3}, {"PONTOS": "P2", "SODIO": null}]"#,
        )
        .unwrap();

        let ds = load_file(&path, &LoadOptions::default()).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.samples[0].get("SODIO"), &CellValue::Integer(3));
        assert!(ds.samples[1].get("SODIO").is_null());
    }

    #[test]
    fn loads_parquet_with_nulls() {
        use arrow::array::{ArrayRef, Float64Array, StringArray};
        use arrow::datatypes::{Field, Schema};
        use arrow::record_batch::RecordBatch;
        use parquet::arrow::ArrowWriter;

        let schema = Arc::new(Schema::new(vec![
            Field::new("PONTOS", DataType::Utf8, false),
            Field::new("POTASSIO", DataType::Float64, true),
        ]));
        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(vec!["P1", "P2", "P3"])),
            Arc::new(Float64Array::from(vec![Some(41.5), None, Some(f64::NAN)])),
        ];
        let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dados.parquet");
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let ds = load_file(&path, &LoadOptions::default()).unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.samples[0].get("PONTOS"), &CellValue::String("P1".into()));
        assert_eq!(ds.samples[0].get("POTASSIO"), &CellValue::Float(41.5));
        assert!(ds.samples[1].get("POTASSIO").is_null());
        assert!(ds.samples[2].get("POTASSIO").is_null());
    }

    #[test]
    fn rejects_unknown_extension() {
        let err = load_file(Path::new("dados.xls"), &LoadOptions::default()).unwrap_err();
        assert!(err.to_string().contains("Unsupported"));
    }
}
