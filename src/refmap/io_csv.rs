// Primitives for reading the CSV files.

use std::fs::File;
use std::io::Read;

use serde::de::DeserializeOwned;

use referendum::schema::{self, Table};
use referendum::{BallotCounts, BallotRecord, DepartmentRecord, RegionRecord};

use crate::refmap::*;

// Empty cells read as `None`. Text that is not a count is still a parse error.
#[derive(Debug, Deserialize)]
struct BallotRow {
    #[serde(rename = "Department code")]
    department_code: Option<String>,
    #[serde(rename = "Registered")]
    registered: Option<u64>,
    #[serde(rename = "Abstentions")]
    abstentions: Option<u64>,
    #[serde(rename = "Null")]
    null_votes: Option<u64>,
    #[serde(rename = "Choice A")]
    choice_a: Option<u64>,
    #[serde(rename = "Choice B")]
    choice_b: Option<u64>,
}

impl BallotRow {
    /// `None` when one of the cells is empty.
    fn into_record(self) -> Option<BallotRecord> {
        Some(BallotRecord {
            department_code: self.department_code?,
            counts: BallotCounts {
                registered: self.registered?,
                abstentions: self.abstentions?,
                null_votes: self.null_votes?,
                choice_a: self.choice_a?,
                choice_b: self.choice_b?,
            },
        })
    }
}

#[derive(Debug, Deserialize)]
struct RegionRow {
    code: String,
    name: String,
}

impl From<RegionRow> for RegionRecord {
    fn from(row: RegionRow) -> RegionRecord {
        RegionRecord {
            code_reg: row.code,
            name_reg: row.name,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DepartmentRow {
    code: String,
    name: String,
    region_code: String,
}

impl From<DepartmentRow> for DepartmentRecord {
    fn from(row: DepartmentRow) -> DepartmentRecord {
        DepartmentRecord {
            code_dep: row.code,
            name_dep: row.name,
            region_code: row.region_code,
        }
    }
}

pub fn read_ballots<R: Read>(
    reader: R,
    delimiter: u8,
    path: &str,
) -> RefmapResult<Vec<BallotRecord>> {
    let rows: Vec<BallotRow> = read_table(reader, delimiter, Table::Ballots, path)?;
    let mut res: Vec<BallotRecord> = Vec::new();
    let mut incomplete: Vec<u64> = Vec::new();
    for (idx, row) in rows.into_iter().enumerate() {
        match row.into_record() {
            Some(record) => res.push(record),
            // Same numbering as the parse errors.
            None => incomplete.push((idx + 2) as u64),
        }
    }
    if !incomplete.is_empty() {
        warn!(
            "read_ballots: {}: dropping {} lines with an empty cell, at lines {:?}",
            path,
            incomplete.len(),
            incomplete
        );
    }
    Ok(res)
}

pub fn read_regions<R: Read>(reader: R, path: &str) -> RefmapResult<Vec<RegionRecord>> {
    let rows: Vec<RegionRow> = read_table(reader, b',', Table::Regions, path)?;
    Ok(rows.into_iter().map(RegionRecord::from).collect())
}

pub fn read_departments<R: Read>(reader: R, path: &str) -> RefmapResult<Vec<DepartmentRecord>> {
    let rows: Vec<DepartmentRow> = read_table(reader, b',', Table::Departments, path)?;
    Ok(rows.into_iter().map(DepartmentRecord::from).collect())
}

pub fn open_file(path: &str) -> RefmapResult<File> {
    File::open(path).context(OpeningFileSnafu { path })
}

fn read_table<R: Read, T: DeserializeOwned>(
    reader: R,
    delimiter: u8,
    table: Table,
    path: &str,
) -> RefmapResult<Vec<T>> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_reader(reader);

    // The header is checked before reading any row, to report a missing column
    // rather than a parse error on the first line.
    let header: Vec<String> = rdr
        .headers()
        .context(CsvHeaderSnafu { path })?
        .iter()
        .map(|s| s.to_string())
        .collect();
    debug!("read_table: {} header: {:?}", table, header);
    schema::check_columns(table, &header).context(SchemaSnafu { path })?;

    let mut res: Vec<T> = Vec::new();
    for (idx, row_r) in rdr.deserialize::<T>().enumerate() {
        // The header is the first line.
        let lineno = (idx + 2) as u64;
        let row = row_r.context(CsvLineParseSnafu { path, lineno })?;
        res.push(row);
    }
    info!("read_table: {} rows in {} ({})", res.len(), table, path);
    Ok(res)
}
