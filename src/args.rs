use clap::Parser;

/// This program computes the results of a referendum by region and draws them on a map.
#[derive(Parser, Debug, Clone, Default)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The JSON file describing the referendum: input files, output settings and
    /// excluded regions. The input paths it contains are relative to its own location.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,
    /// (file path) A reference summary in JSON format. If provided, refmap will check that the computed
    /// summary matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary of the referendum will be written in JSON format
    /// to the given location. Setting this option overrides the output directory of the --config option.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path or empty) If specified, the map of the results will be written in SVG format to the given
    /// location. Setting this option overrides the output directory of the --config option.
    #[clap(long, value_parser)]
    pub svg: Option<String>,

    /// (file path) The ballot file (semicolon-separated). Overrides the path given in the configuration.
    #[clap(long, value_parser)]
    pub ballots: Option<String>,

    /// (file path) The region reference file (comma-separated). Overrides the path given in the configuration.
    #[clap(long, value_parser)]
    pub regions: Option<String>,

    /// (file path) The department reference file (comma-separated). Overrides the path given in the configuration.
    #[clap(long, value_parser)]
    pub departments: Option<String>,

    /// (file path) The GeoJSON file with the region boundaries. Overrides the path given in the configuration.
    #[clap(long, value_parser)]
    pub geometry: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on debug logging (unless RUST_LOG says otherwise).
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
