//! Column contracts of the four input tables.
//!
//! The readers check the header of a table against these contracts before
//! reading any row, so that a file with a missing column is rejected before
//! the pipeline runs.

use std::error::Error;
use std::fmt::Display;

pub const BALLOT_DEPARTMENT_CODE: &str = "Department code";
pub const BALLOT_REGISTERED: &str = "Registered";
pub const BALLOT_ABSTENTIONS: &str = "Abstentions";
pub const BALLOT_NULL: &str = "Null";
pub const BALLOT_CHOICE_A: &str = "Choice A";
pub const BALLOT_CHOICE_B: &str = "Choice B";

pub const BALLOT_COLUMNS: &[&str] = &[
    BALLOT_DEPARTMENT_CODE,
    BALLOT_REGISTERED,
    BALLOT_ABSTENTIONS,
    BALLOT_NULL,
    BALLOT_CHOICE_A,
    BALLOT_CHOICE_B,
];

pub const REGION_COLUMNS: &[&str] = &["code", "name"];

pub const DEPARTMENT_COLUMNS: &[&str] = &["code", "name", "region_code"];

/// The property holding the region name in the boundary file.
pub const DEFAULT_GEOMETRY_NAME_PROPERTY: &str = "nom";

pub const GEOMETRY_COLUMNS: &[&str] = &[DEFAULT_GEOMETRY_NAME_PROPERTY];

/// The input tables of the pipeline.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Table {
    Ballots,
    Regions,
    Departments,
    Geometry,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Ballots => "ballots",
            Table::Regions => "regions",
            Table::Departments => "departments",
            Table::Geometry => "geometry",
        }
    }

    /// The columns this table must provide, with their default names.
    pub fn required_columns(&self) -> &'static [&'static str] {
        match self {
            Table::Ballots => BALLOT_COLUMNS,
            Table::Regions => REGION_COLUMNS,
            Table::Departments => DEPARTMENT_COLUMNS,
            Table::Geometry => GEOMETRY_COLUMNS,
        }
    }
}

impl Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Errors raised when an input table does not have the expected shape.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum SchemaError {
    MissingColumn { table: Table, column: String },
}

impl Error for SchemaError {}

impl Display for SchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaError::MissingColumn { table, column } => {
                write!(f, "table {} is missing the column {:?}", table, column)
            }
        }
    }
}

/// Checks that `header` contains all the default columns of `table`.
pub fn check_columns<S: AsRef<str>>(table: Table, header: &[S]) -> Result<(), SchemaError> {
    check_named_columns(table, table.required_columns(), header)
}

/// Checks that `header` contains all the `required` columns. The comparison is
/// exact: no trimming and no case folding.
pub fn check_named_columns<R: AsRef<str>, S: AsRef<str>>(
    table: Table,
    required: &[R],
    header: &[S],
) -> Result<(), SchemaError> {
    for column in required.iter().map(|c| c.as_ref()) {
        if !header.iter().any(|h| h.as_ref() == column) {
            return Err(SchemaError::MissingColumn {
                table,
                column: column.to_string(),
            });
        }
    }
    Ok(())
}
