use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use ndarray::Array2;
use serde::Deserialize;
use serde_json::json;


/// File format for the transition matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One whitespace-separated row per source airspace.
    #[default]
    Matrix,
    /// `{"graph": [[...], ...]}`
    Json,
    /// `from to count` for every nonzero entry.
    Edges,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Matrix => "txt",
            OutputFormat::Json => "json",
            OutputFormat::Edges => "edges",
        }
    }
}

/// Writes the matrix next to `prefix` with the format's extension and
/// returns the path written.
pub fn write_result(prefix: &Path, format: OutputFormat, matrix: &Array2<u64>) -> Result<PathBuf> {
    let path = prefix.with_extension(format.extension());
    let file =
        File::create(&path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    match format {
        OutputFormat::Matrix => write_matrix(&mut writer, matrix)?,
        OutputFormat::Json => write_json(&mut writer, matrix)?,
        OutputFormat::Edges => write_edges(&mut writer, matrix)?,
    }
    writer.flush()?;

    Ok(path)
}

fn write_matrix(writer: &mut impl Write, matrix: &Array2<u64>) -> Result<()> {
    for row in matrix.outer_iter() {
        let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        writeln!(writer, "{}", line.join(" "))?;
    }
    Ok(())
}

fn write_json(writer: &mut impl Write, matrix: &Array2<u64>) -> Result<()> {
    let rows: Vec<Vec<u64>> = matrix.outer_iter().map(|row| row.to_vec()).collect();
    serde_json::to_writer(&mut *writer, &json!({ "graph": rows }))?;
    writeln!(writer)?;
    Ok(())
}

fn write_edges(writer: &mut impl Write, matrix: &Array2<u64>) -> Result<()> {
    for ((from, to), &count) in matrix.indexed_iter() {
        if count > 0 {
            writeln!(writer, "{} {} {}", from, to, count)?;
        }
    }
    Ok(())
}
