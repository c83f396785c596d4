//! ARFF reader and writer
//!
//! The last `n_targets` attributes of a file form the target block. Rows may be
//! dense (`v1,v2,...`) or sparse (`{index value, ...}`, omitted cells are 0).
//! `?` marks a missing value and is only accepted in target columns; a target
//! block that is missing everywhere yields an unlabeled dataset.

use super::{Attribute, AttributeType, Dataset, LabelKind, Labels, Schema};
use crate::error::{RaksorError, Result};
use ndarray::Array2;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Read a dataset whose last `n_targets` attributes carry labels of `kind`
pub fn read_dataset(path: impl AsRef<Path>, n_targets: usize, kind: LabelKind) -> Result<Dataset> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        RaksorError::DataError(format!("Failed to read dataset {}: {}", path.display(), e))
    })?;
    parse_dataset(&path.display().to_string(), &content, n_targets, kind)
}

/// Parse ARFF text; `name` identifies the source in error messages
pub fn parse_dataset(name: &str, content: &str, n_targets: usize, kind: LabelKind) -> Result<Dataset> {
    let mut relation = String::new();
    let mut attributes: Vec<Attribute> = Vec::new();
    let mut in_data = false;
    let mut rows: Vec<Vec<Option<f64>>> = Vec::new();

    for (line_idx, raw) in content.lines().enumerate() {
        let line_no = line_idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('%') {
            continue;
        }

        if in_data {
            rows.push(parse_row(name, line_no, line, &attributes)?);
            continue;
        }

        let (keyword, rest) = split_keyword(line);
        match keyword.to_ascii_lowercase().as_str() {
            "@relation" => {
                relation = parse_token(rest).0;
            }
            "@attribute" => {
                let (attr_name, type_spec) = parse_token(rest);
                let kind = parse_attribute_type(name, line_no, &attr_name, type_spec.trim())?;
                attributes.push(Attribute {
                    name: attr_name,
                    kind,
                });
            }
            "@data" => {
                in_data = true;
            }
            other => {
                return Err(RaksorError::DataError(format!(
                    "{}:{}: unexpected header line starting with '{}'",
                    name, line_no, other
                )));
            }
        }
    }

    if !in_data {
        return Err(RaksorError::DataError(format!("{}: missing @data section", name)));
    }

    if n_targets >= attributes.len() {
        return Err(RaksorError::schema_mismatch(
            name,
            format!("more than {} attributes for N={} targets", n_targets, n_targets),
            format!("{} attributes", attributes.len()),
        ));
    }

    let n_features = attributes.len() - n_targets;

    if kind == LabelKind::Relevance {
        let trailing_binary = attributes
            .iter()
            .rev()
            .take_while(|a| a.kind == AttributeType::Binary)
            .count();
        if trailing_binary < n_targets {
            return Err(RaksorError::schema_mismatch(
                name,
                format!("{} trailing {{0,1}} target columns", n_targets),
                format!("{}", trailing_binary),
            ));
        }
    }

    let targets = attributes.split_off(n_features);
    let schema = Schema::new(relation, attributes, targets)?;
    let n_rows = rows.len();

    let mut features = Array2::zeros((n_rows, n_features));
    let mut labels = Array2::zeros((n_rows, n_targets));
    let mut missing_targets = 0usize;

    for (i, row) in rows.iter().enumerate() {
        for (j, cell) in row.iter().enumerate() {
            match (cell, j < n_features) {
                (Some(v), true) => features[[i, j]] = *v,
                (None, true) => {
                    return Err(RaksorError::DataError(format!(
                        "{}: missing value for feature '{}' in instance {}",
                        name,
                        schema.features()[j].name,
                        i
                    )));
                }
                (Some(v), false) => labels[[i, j - n_features]] = *v,
                (None, false) => missing_targets += 1,
            }
        }
    }

    let labels = if missing_targets == n_rows * n_targets {
        None
    } else if missing_targets > 0 {
        return Err(RaksorError::DataError(format!(
            "{}: {} target cells are missing; a target block must be fully labeled or fully missing",
            name, missing_targets
        )));
    } else {
        Some(match kind {
            LabelKind::Rank => Labels::rank(labels),
            LabelKind::Relevance => Labels::relevance(labels),
        })
    };

    Dataset::new(name, schema, features, labels)
}

/// Write a dataset; unlabeled datasets get `?` in every target cell
pub fn write_dataset(dataset: &Dataset, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, to_arff_string(dataset))?;
    tracing::debug!(path = %path.display(), instances = dataset.n_instances(), "Wrote dataset");
    Ok(())
}

/// Render a dataset as ARFF text
pub fn to_arff_string(dataset: &Dataset) -> String {
    let schema = dataset.schema();
    let mut out = String::new();

    let relation = if schema.relation().is_empty() {
        dataset.name()
    } else {
        schema.relation()
    };
    let _ = writeln!(out, "@relation {}", quote(relation));
    let _ = writeln!(out);

    for attr in schema.features().iter().chain(schema.targets().iter()) {
        let type_spec = match attr.kind {
            AttributeType::Numeric => "numeric",
            AttributeType::Binary => "{0,1}",
        };
        let _ = writeln!(out, "@attribute {} {}", quote(&attr.name), type_spec);
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "@data");

    for instance in dataset.instances() {
        let mut cells: Vec<String> = instance.features.iter().map(|v| format!("{}", v)).collect();
        match instance.labels {
            Some(labels) => cells.extend(labels.iter().map(|v| format!("{}", v))),
            None => cells.extend(std::iter::repeat("?".to_string()).take(schema.n_targets())),
        }
        let _ = writeln!(out, "{}", cells.join(","));
    }

    out
}

fn split_keyword(line: &str) -> (&str, &str) {
    match line.find(char::is_whitespace) {
        Some(pos) => (&line[..pos], line[pos..].trim_start()),
        None => (line, ""),
    }
}

/// Read one possibly-quoted token; returns the token and the remainder
fn parse_token(input: &str) -> (String, &str) {
    let input = input.trim_start();
    let mut chars = input.char_indices();
    match chars.next() {
        Some((_, quote @ ('\'' | '"'))) => {
            let mut token = String::new();
            let mut escaped = false;
            for (idx, c) in chars {
                if escaped {
                    token.push(c);
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == quote {
                    return (token, &input[idx + c.len_utf8()..]);
                } else {
                    token.push(c);
                }
            }
            (token, "")
        }
        Some(_) => match input.find(char::is_whitespace) {
            Some(pos) => (input[..pos].to_string(), &input[pos..]),
            None => (input.to_string(), ""),
        },
        None => (String::new(), ""),
    }
}

fn quote(name: &str) -> String {
    let needs_quotes = name.is_empty()
        || name
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, ',' | '\'' | '"' | '%' | '{' | '}' | '\\'));
    if needs_quotes {
        format!("'{}'", name.replace('\\', "\\\\").replace('\'', "\\'"))
    } else {
        name.to_string()
    }
}

fn parse_attribute_type(source: &str, line_no: usize, attr: &str, spec: &str) -> Result<AttributeType> {
    let lowered = spec.to_ascii_lowercase();
    if matches!(lowered.as_str(), "numeric" | "real" | "integer") {
        return Ok(AttributeType::Numeric);
    }
    if lowered.starts_with('{') && lowered.ends_with('}') {
        let mut values: Vec<String> = lowered[1..lowered.len() - 1]
            .split(',')
            .map(|v| v.trim().trim_matches(|c| c == '\'' || c == '"').to_string())
            .collect();
        values.sort();
        if values == ["0", "1"] {
            return Ok(AttributeType::Binary);
        }
    }
    Err(RaksorError::schema_mismatch(
        format!("{}:{}", source, line_no),
        format!("numeric or {{0,1}} type for attribute '{}'", attr),
        spec.to_string(),
    ))
}

fn parse_value(source: &str, line_no: usize, raw: &str, attr: &Attribute) -> Result<Option<f64>> {
    let raw = raw.trim().trim_matches(|c| c == '\'' || c == '"');
    if raw == "?" {
        return Ok(None);
    }
    let value: f64 = raw.parse().map_err(|_| {
        RaksorError::DataError(format!(
            "{}:{}: invalid numeric value '{}' for attribute '{}'",
            source, line_no, raw, attr.name
        ))
    })?;
    if attr.kind == AttributeType::Binary && value != 0.0 && value != 1.0 {
        return Err(RaksorError::DataError(format!(
            "{}:{}: value {} for binary attribute '{}' is not 0 or 1",
            source, line_no, value, attr.name
        )));
    }
    Ok(Some(value))
}

fn parse_row(source: &str, line_no: usize, line: &str, attributes: &[Attribute]) -> Result<Vec<Option<f64>>> {
    let n_attrs = attributes.len();

    if let Some(body) = line.strip_prefix('{') {
        let body = body.strip_suffix('}').ok_or_else(|| {
            RaksorError::DataError(format!("{}:{}: unterminated sparse row", source, line_no))
        })?;
        let mut row = vec![Some(0.0); n_attrs];
        for entry in body.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (idx, value) = split_keyword(entry);
            let idx: usize = idx.parse().map_err(|_| {
                RaksorError::DataError(format!(
                    "{}:{}: invalid sparse index '{}'",
                    source, line_no, idx
                ))
            })?;
            if idx >= n_attrs {
                return Err(RaksorError::schema_mismatch(
                    format!("{}:{}", source, line_no),
                    format!("sparse index below {}", n_attrs),
                    format!("{}", idx),
                ));
            }
            row[idx] = parse_value(source, line_no, value, &attributes[idx])?;
        }
        return Ok(row);
    }

    let cells: Vec<&str> = line.split(',').collect();
    if cells.len() != n_attrs {
        return Err(RaksorError::schema_mismatch(
            format!("{}:{}", source, line_no),
            format!("{} values per row", n_attrs),
            format!("{}", cells.len()),
        ));
    }
    cells
        .iter()
        .zip(attributes.iter())
        .map(|(cell, attr)| parse_value(source, line_no, cell, attr))
        .collect()
}
