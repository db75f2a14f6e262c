use crate::refmap::*;

use referendum::schema::DEFAULT_GEOMETRY_NAME_PROPERTY;
use referendum::EXCLUDED_REGION_CODES;

pub const DEFAULT_CONTEST_NAME: &str = "Referendum";
pub const DEFAULT_MAP_WIDTH: u32 = 800;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "contestName")]
    pub contest_name: String,
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
    #[serde(rename = "contestDate")]
    pub contest_date: Option<String>,
    #[serde(rename = "mapWidth")]
    pub map_width: Option<u32>,
}

/// The configuration echoed in the summary.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub contest: String,
    pub date: Option<String>,
    #[serde(rename = "excludedRegionCodes")]
    pub excluded_region_codes: Vec<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceSettings {
    #[serde(rename = "ballotsPath")]
    pub ballots_path: Option<String>,
    #[serde(rename = "regionsPath")]
    pub regions_path: Option<String>,
    #[serde(rename = "departmentsPath")]
    pub departments_path: Option<String>,
    #[serde(rename = "geometryPath")]
    pub geometry_path: Option<String>,
    #[serde(rename = "ballotsDelimiter")]
    pub ballots_delimiter: Option<String>,
    #[serde(rename = "geometryNameProperty")]
    pub geometry_name_property: Option<String>,
}

impl SourceSettings {
    pub fn ballots_delimiter(&self) -> RefmapResult<u8> {
        match self.ballots_delimiter.as_deref() {
            None => Ok(b';'),
            Some(s) if s.len() == 1 => Ok(s.as_bytes()[0]),
            Some(s) => whatever!(
                "ballotsDelimiter must be a single ASCII character, got {:?}",
                s
            ),
        }
    }

    pub fn geometry_name_property(&self) -> &str {
        self.geometry_name_property
            .as_deref()
            .unwrap_or(DEFAULT_GEOMETRY_NAME_PROPERTY)
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ReferendumConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: OutputSettings,
    pub sources: SourceSettings,
    #[serde(rename = "excludedRegionCodes")]
    pub excluded_region_codes: Option<Vec<String>>,
}

impl ReferendumConfig {
    /// The configuration used when no file is given on the command line.
    pub fn empty() -> ReferendumConfig {
        ReferendumConfig {
            output_settings: OutputSettings {
                contest_name: DEFAULT_CONTEST_NAME.to_string(),
                output_directory: None,
                contest_date: None,
                map_width: None,
            },
            sources: SourceSettings::default(),
            excluded_region_codes: None,
        }
    }

    pub fn excluded_region_codes(&self) -> Vec<String> {
        match &self.excluded_region_codes {
            Some(codes) => codes.clone(),
            None => EXCLUDED_REGION_CODES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    pub fn map_width(&self) -> u32 {
        self.output_settings.map_width.unwrap_or(DEFAULT_MAP_WIDTH)
    }

    pub fn output_config(&self) -> OutputConfig {
        OutputConfig {
            contest: self.output_settings.contest_name.clone(),
            date: self.output_settings.contest_date.clone(),
            excluded_region_codes: self.excluded_region_codes(),
        }
    }
}

pub fn read_config(path: &str) -> RefmapResult<ReferendumConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    serde_json::from_str(&contents).context(ParsingJsonSnafu { path })
}

pub fn read_summary(path: &str) -> RefmapResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    debug!("read_summary: {:?}", js);
    Ok(js)
}
