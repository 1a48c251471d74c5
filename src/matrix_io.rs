use crate::lattice::{Lattice, LatticeState, SpinTypes};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Parses space-delimited numeric text into rows of non-negative integers.
///
/// Accepts integer or float notation (`3`, `3.0`, `3.000000000000000000e+00`) as long as the
/// value is integral. Repeated spaces, tabs, blank lines and `#` comments are skipped.
pub fn parse_matrix<R: Read>(input: R) -> Result<Vec<Vec<u32>>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b' ')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(input);

    let mut rows: Vec<Vec<u32>> = Vec::new();
    for record in reader.records() {
        let record = record.context("Failed to read matrix row")?;
        let line = record.position().map_or(0, |p| p.line());
        // Consecutive spaces yield empty fields; tabs stay inside one
        let row = record
            .iter()
            .flat_map(str::split_whitespace)
            .take_while(|token| !token.starts_with('#'))
            .map(|token| parse_value(token).with_context(|| format!("line {}", line)))
            .collect::<Result<Vec<u32>>>()?;
        if row.is_empty() {
            continue;
        }
        if let Some(first) = rows.first().map(Vec::len) {
            if row.len() != first {
                anyhow::bail!("line {}: expected {} values, found {}", line, first, row.len());
            }
        }
        rows.push(row);
    }
    if rows.is_empty() {
        anyhow::bail!("matrix is empty");
    }
    Ok(rows)
}

fn parse_value(token: &str) -> Result<u32> {
    if let Ok(v) = token.parse::<u32>() {
        return Ok(v);
    }
    let v: f64 = token
        .parse()
        .map_err(|_| anyhow::anyhow!("'{}' is not a number", token))?;
    if !v.is_finite() || v < 0.0 || v.fract() != 0.0 || v > u32::MAX as f64 {
        anyhow::bail!("'{}' is not a non-negative integer", token);
    }
    Ok(v as u32)
}

/// Reads a matrix file.
pub fn read_matrix<P: AsRef<Path>>(path: P) -> Result<Vec<Vec<u32>>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to read matrix file: {}", path.display()))?;
    parse_matrix(BufReader::new(file)).with_context(|| format!("Malformed matrix file: {}", path.display()))
}

/// Loads a spin-id lattice and its spin -> type mapping.
///
/// The type file is flattened row-major, so a single row or a single column both work.
pub fn load_state<P: AsRef<Path>, Q: AsRef<Path>>(spins_path: P, types_path: Q) -> Result<LatticeState> {
    let lattice = Lattice::from_rows(&read_matrix(&spins_path)?)?;
    let type_ids: Vec<u32> = read_matrix(&types_path)?.concat();
    let spin_types = SpinTypes::from_ids(&type_ids)?;
    LatticeState::new(lattice, spin_types)
}
