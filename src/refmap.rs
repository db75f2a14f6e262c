use log::{debug, info, warn};

use referendum::schema::{SchemaError, Table};
use referendum::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::refmap::config_reader::*;

pub mod config_reader;
mod io_csv;
mod io_geojson;
mod render_svg;

#[derive(Debug, Snafu)]
pub enum RefmapError {
    #[snafu(display("Error opening file {path}"))]
    OpeningFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing file {path}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error opening JSON file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON file {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error serializing the summary"))]
    WritingJson { source: serde_json::Error },
    #[snafu(display("Error reading the header of {path}"))]
    CsvHeader { source: csv::Error, path: String },
    #[snafu(display("Error parsing line {lineno} of {path}"))]
    CsvLineParse {
        source: csv::Error,
        path: String,
        lineno: u64,
    },
    #[snafu(display("Unexpected columns in {path}"))]
    Schema { source: SchemaError, path: String },
    #[snafu(display("Invalid geometry in {path}, feature {feature}: {message}"))]
    InvalidGeometry {
        path: String,
        feature: usize,
        message: String,
    },
    #[snafu(display("No input file given for the table {table}"))]
    MissingSource { table: String },
    #[snafu(display("The configuration file has no parent directory"))]
    MissingParentDir {},
    #[snafu(display("None of the regions has a boundary, nothing to draw"))]
    NothingToDraw {},
    #[snafu(display("Difference detected between the computed summary and the reference summary {path}"))]
    ReferenceMismatch { path: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type RefmapResult<T> = Result<T, RefmapError>;

/// The input files, once the command line and the configuration are merged.
#[derive(Eq, PartialEq, Debug, Clone)]
struct Sources {
    ballots: String,
    regions: String,
    departments: String,
    geometry: String,
}

/// A path from the command line is used as is, a path from the configuration
/// is relative to the configuration file.
fn resolve_source(
    table: Table,
    arg: &Option<String>,
    configured: &Option<String>,
    root: &Path,
) -> RefmapResult<String> {
    if let Some(p) = arg {
        return Ok(p.clone());
    }
    match configured {
        Some(p) => Ok(root.join(p).display().to_string()),
        None => MissingSourceSnafu {
            table: table.name(),
        }
        .fail(),
    }
}

fn resolve_sources(args: &Args, config: &ReferendumConfig, root: &Path) -> RefmapResult<Sources> {
    let s = &config.sources;
    Ok(Sources {
        ballots: resolve_source(Table::Ballots, &args.ballots, &s.ballots_path, root)?,
        regions: resolve_source(Table::Regions, &args.regions, &s.regions_path, root)?,
        departments: resolve_source(
            Table::Departments,
            &args.departments,
            &s.departments_path,
            root,
        )?,
        geometry: resolve_source(Table::Geometry, &args.geometry, &s.geometry_path, root)?,
    })
}

fn result_to_json(m: &MapResult) -> JSValue {
    let c = &m.result.counts;
    json!({
        "code": m.result.code_reg,
        "name": m.result.name_reg,
        "registered": c.registered,
        "abstentions": c.abstentions,
        "null": c.null_votes,
        "choiceA": c.choice_a,
        "choiceB": c.choice_b,
        "ratio": m.ratio,
        "hasBoundary": m.boundary.is_some(),
    })
}

fn build_summary_js(config: &ReferendumConfig, map: &[MapResult]) -> JSValue {
    let mut sorted: Vec<&MapResult> = map.iter().collect();
    sorted.sort_by(|a, b| a.result.code_reg.cmp(&b.result.code_reg));
    let results: Vec<JSValue> = sorted.iter().map(|m| result_to_json(m)).collect();
    json!({
        "config": config.output_config(),
        "results": results
    })
}

fn log_results(results: &[RegionResult]) {
    info!(
        "{:>6} {:<32} {:>12} {:>12} {:>10} {:>12} {:>12}",
        "code", "name", "registered", "abstentions", "null", "choice A", "choice B"
    );
    for r in results.iter() {
        let c = &r.counts;
        info!(
            "{:>6} {:<32} {:>12} {:>12} {:>10} {:>12} {:>12}",
            r.code_reg, r.name_reg, c.registered, c.abstentions, c.null_votes, c.choice_a, c.choice_b
        );
    }
}

fn write_text(path: &str, contents: &str) -> RefmapResult<()> {
    create_parent_dir(path)?;
    fs::write(path, contents).context(WritingFileSnafu { path })?;
    info!("write_text: summary written to {}", path);
    Ok(())
}

fn create_parent_dir(path: &str) -> RefmapResult<()> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).context(WritingFileSnafu { path })?;
        }
    }
    Ok(())
}

pub fn run_referendum(args: &Args) -> RefmapResult<()> {
    let (config, root): (ReferendumConfig, PathBuf) = match &args.config {
        Some(path) => {
            let config = read_config(path)?;
            let root = Path::new(path)
                .parent()
                .context(MissingParentDirSnafu {})?
                .to_path_buf();
            (config, root)
        }
        None => (ReferendumConfig::empty(), PathBuf::new()),
    };
    info!("config: {:?}", config);

    let sources = resolve_sources(args, &config, &root)?;
    debug!("sources: {:?}", sources);

    // All the tables are read (and their columns checked) before joining.
    let regions = io_csv::read_regions(io_csv::open_file(&sources.regions)?, &sources.regions)?;
    let departments = io_csv::read_departments(
        io_csv::open_file(&sources.departments)?,
        &sources.departments,
    )?;
    let ballots = io_csv::read_ballots(
        io_csv::open_file(&sources.ballots)?,
        config.sources.ballots_delimiter()?,
        &sources.ballots,
    )?;
    let geometry = io_geojson::read_geometry(
        BufReader::new(io_csv::open_file(&sources.geometry)?),
        config.sources.geometry_name_property(),
        &sources.geometry,
    )?;

    let areas = merge_areas(&regions, &departments);
    let excluded = config.excluded_region_codes();
    let joined = join_ballots_excluding(&ballots, &areas, &excluded);
    info!(
        "{} ballot lines joined, {} dropped, {} areas excluded ({:?})",
        joined.records.len(),
        joined.dropped.len(),
        joined.excluded_areas,
        excluded
    );
    let results = aggregate_by_region(&joined.records);
    log_results(&results);
    let map = compute_ratio_map(&results, &geometry);

    let summary_js = build_summary_js(&config, &map);
    let pretty_js_summary =
        serde_json::to_string_pretty(&summary_js).context(WritingJsonSnafu {})?;

    let output_dir: Option<PathBuf> = config
        .output_settings
        .output_directory
        .as_ref()
        .map(|d| root.join(d));
    match (args.out.as_deref(), &output_dir) {
        (Some("stdout"), _) | (None, None) => println!("{}", pretty_js_summary),
        (Some(path), _) => write_text(path, &pretty_js_summary)?,
        (None, Some(dir)) => write_text(
            &dir.join("summary.json").display().to_string(),
            &pretty_js_summary,
        )?,
    }

    let svg_path: Option<String> = match (&args.svg, &output_dir) {
        (Some(path), _) => Some(path.clone()),
        (None, Some(dir)) => Some(dir.join("map.svg").display().to_string()),
        (None, None) => None,
    };
    if let Some(path) = svg_path {
        create_parent_dir(&path)?;
        render_svg::to_svg(&path, &map, config.map_width())?;
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = &args.reference {
        let summary_ref = read_summary(summary_p)?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(WritingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_summary {
            warn!("Found differences with the reference summary");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_summary.as_str(),
                "\n",
            );
            return ReferenceMismatchSnafu { path: summary_p }.fail();
        }
    }

    Ok(())
}
