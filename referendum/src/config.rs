// ********* Input data structures ***********

use geo::MultiPolygon;

/// The region codes of the departments that are not part of the mainland map:
/// overseas departments (`DOM`), overseas territories (`TOM`) and overseas
/// collectivities (`COM`).
pub const EXCLUDED_REGION_CODES: &[&str] = &["DOM", "TOM", "COM"];

/// A department, as listed in the department reference table.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct DepartmentRecord {
    pub code_dep: String,
    pub name_dep: String,
    /// Code of the owning region. Not guaranteed to exist in the region table.
    pub region_code: String,
}

/// A region, as listed in the region reference table.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RegionRecord {
    pub code_reg: String,
    pub name_reg: String,
}

/// The counts reported for one line of the ballot file.
///
/// All the columns are independent additive quantities.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default, Hash)]
pub struct BallotCounts {
    pub registered: u64,
    pub abstentions: u64,
    pub null_votes: u64,
    pub choice_a: u64,
    pub choice_b: u64,
}

impl BallotCounts {
    pub const EMPTY: BallotCounts = BallotCounts {
        registered: 0,
        abstentions: 0,
        null_votes: 0,
        choice_a: 0,
        choice_b: 0,
    };

    /// The ballots counted toward one of the two choices.
    pub fn expressed(&self) -> u64 {
        self.choice_a.saturating_add(self.choice_b)
    }

    /// The share of the expressed ballots that went to choice A.
    ///
    /// Returns `None` when nothing was expressed: the ratio is undefined in
    /// that case, and must not be confused with a region that voted 0% for A.
    pub fn choice_a_ratio(&self) -> Option<f64> {
        match self.expressed() {
            0 => None,
            expressed => Some(self.choice_a as f64 / expressed as f64),
        }
    }

    /// Column-wise sum. `None` if any column overflows.
    pub fn checked_add(&self, rhs: &BallotCounts) -> Option<BallotCounts> {
        Some(BallotCounts {
            registered: self.registered.checked_add(rhs.registered)?,
            abstentions: self.abstentions.checked_add(rhs.abstentions)?,
            null_votes: self.null_votes.checked_add(rhs.null_votes)?,
            choice_a: self.choice_a.checked_add(rhs.choice_a)?,
            choice_b: self.choice_b.checked_add(rhs.choice_b)?,
        })
    }

    /// Column-wise sum, each column saturating at `u64::MAX`.
    pub fn saturating_add(&self, rhs: &BallotCounts) -> BallotCounts {
        BallotCounts {
            registered: self.registered.saturating_add(rhs.registered),
            abstentions: self.abstentions.saturating_add(rhs.abstentions),
            null_votes: self.null_votes.saturating_add(rhs.null_votes),
            choice_a: self.choice_a.saturating_add(rhs.choice_a),
            choice_b: self.choice_b.saturating_add(rhs.choice_b),
        }
    }
}

/// One line of the ballot file.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct BallotRecord {
    /// The department code as written in the ballot file. It may be
    /// unpadded ("1" instead of "01").
    pub department_code: String,
    pub counts: BallotCounts,
}

/// The boundary of a region, keyed by the region name.
#[derive(PartialEq, Debug, Clone)]
pub struct GeometryRecord {
    pub name: String,
    pub boundary: MultiPolygon<f64>,
}

// ******** Join keys *********

/// A department code in its fixed-width form.
///
/// The ballot file writes the numeric codes without their leading zero while
/// the reference tables keep two characters ("01", "2A", "971"). Both sides
/// go through this type before being compared.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd)]
pub struct DepartmentCode(String);

impl DepartmentCode {
    pub const WIDTH: usize = 2;
    pub const FILLER: char = '0';

    /// Left-pads the code with `FILLER` up to `WIDTH` characters. Longer codes
    /// are kept unchanged.
    pub fn normalize(raw: &str) -> DepartmentCode {
        let len = raw.chars().count();
        let mut code = String::with_capacity(Self::WIDTH.max(raw.len()));
        for _ in len..Self::WIDTH {
            code.push(Self::FILLER);
        }
        code.push_str(raw);
        DepartmentCode(code)
    }

    /// Same as `normalize`, but a blank code is a missing value.
    pub fn parse(raw: &str) -> Option<DepartmentCode> {
        if raw.trim().is_empty() {
            None
        } else {
            Some(DepartmentCode::normalize(raw))
        }
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// A text cell of a reference table, `None` when blank.
pub fn non_blank(cell: &str) -> Option<String> {
    if cell.trim().is_empty() {
        None
    } else {
        Some(cell.to_string())
    }
}

// ******** Derived structures *********

/// A department enriched with the identity of its region.
///
/// A field is `None` when its cell is blank. The region fields are also
/// `None` when the department points to a region that is not in the region
/// table.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct AreaRecord {
    pub code_reg: Option<String>,
    pub name_reg: Option<String>,
    pub code_dep: Option<DepartmentCode>,
    pub name_dep: Option<String>,
}

impl AreaRecord {
    /// All the fields are present. Only complete areas receive ballots.
    pub fn is_complete(&self) -> bool {
        self.code_reg.is_some()
            && self.name_reg.is_some()
            && self.code_dep.is_some()
            && self.name_dep.is_some()
    }
}

/// A ballot line resolved to its department and region.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct JoinedRecord {
    pub department_code: DepartmentCode,
    pub counts: BallotCounts,
    pub code_reg: String,
    pub name_reg: String,
    pub code_dep: DepartmentCode,
    pub name_dep: String,
}

/// The outcome of joining the ballots to the areas.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct JoinedTable {
    pub records: Vec<JoinedRecord>,
    /// The ballot lines that could not be resolved to a mainland area.
    pub dropped: Vec<BallotRecord>,
    /// Number of areas removed because their region is excluded.
    pub excluded_areas: usize,
}

/// The sums of the ballot counts for one region.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct RegionResult {
    pub code_reg: String,
    pub name_reg: String,
    pub counts: BallotCounts,
}

/// A regional result, ready to be drawn on a map.
#[derive(PartialEq, Debug, Clone)]
pub struct MapResult {
    pub result: RegionResult,
    /// Missing when no boundary carries the region name.
    pub boundary: Option<MultiPolygon<f64>>,
    /// Share of the expressed ballots for choice A, `None` when the region
    /// has no expressed ballot.
    pub ratio: Option<f64>,
}
