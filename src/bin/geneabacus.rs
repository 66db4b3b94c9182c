use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use geneabacus::config::{Compression, Config, ProfileFormat, ProfileType};

/// geneabacus: per-feature read counting and coverage profiling over SAM/BAM alignments.
#[derive(Parser)]
#[command(name = "geneabacus", version, about)]
struct Cli {
    /// One or more SAM/BAM/CRAM input paths.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// External decompressor argv, applied once per input path (e.g. "samtools view -h").
    #[arg(long, num_args = 1.., value_delimiter = ' ')]
    decoder_command: Option<Vec<String>>,

    /// Feature definition file (FON JSON by default).
    #[arg(long)]
    features: PathBuf,

    /// Treat the feature file as the 2-column name\tlength TAB format.
    #[arg(long)]
    features_tab: bool,

    /// Optional filter feature set (same format as --features).
    #[arg(long)]
    filter: Option<PathBuf>,

    /// Re-add count features missing from --filter, with fresh ids.
    #[arg(long)]
    include_missing_in_filter: bool,

    /// Optional name\tnewName mapping table for profile output names.
    #[arg(long)]
    mapping: Option<PathBuf>,

    /// Total worker threads (split between decompression and counting).
    #[arg(long)]
    n_worker: Option<usize>,

    /// Alignment-multiplicity count tiers, ascending (default: 1).
    #[arg(long, value_delimiter = ',', default_value = "1")]
    count_multis: Vec<u32>,

    /// Treat every alignment as unique (pairMulti = 1) instead of reading the NH tag.
    #[arg(long)]
    ignore_nh_tag: bool,

    /// Minimum cumulative overlap (bp) required to count a fragment against a feature.
    #[arg(long, default_value_t = 1)]
    min_overlap: u32,

    /// Input is paired-end.
    #[arg(long)]
    paired: bool,

    /// Only read 1 is informative (singleton paired-end libraries).
    #[arg(long)]
    only_read1: bool,

    /// Library strand convention relative to read 1: 1, -1, or 0 (unstranded).
    #[arg(long, default_value_t = 0)]
    library_r1_strand: i8,

    /// Coverage-profile projection mode.
    #[arg(long, value_enum)]
    profile_type: Option<CliProfileType>,

    /// Only profile fragments with pairMulti <= this value (default: unlimited).
    #[arg(long)]
    profile_multi: Option<u32>,

    /// Max leading-mismatch run (bp) to trim before projecting 'first'/'last' coordinates.
    #[arg(long, default_value_t = 0)]
    profile_untemplated: u32,

    /// Drop fragments whose untemplated run was trimmed, instead of shifting past it.
    #[arg(long)]
    profile_no_untemplated: bool,

    /// Profile in genomic coordinates instead of transcript-local coordinates.
    #[arg(long)]
    profile_no_coord_mapping: bool,

    /// Extension length (bp) for the 'extension' profile mode.
    #[arg(long, default_value_t = 0)]
    extension_length: u32,

    /// Fractional position (0.0-1.0) for the 'position' profile mode.
    #[arg(long, default_value_t = 0.5)]
    position_fraction: f64,

    /// Symmetric exon overhang (bp) added before building the coordinate mapper.
    #[arg(long, default_value_t = 0)]
    overhang: u32,

    /// Restrict to these exact read lengths (bp), comma-separated.
    #[arg(long, value_delimiter = ',')]
    read_lengths: Option<Vec<u32>>,

    /// Require the proper-pair SAM flag.
    #[arg(long)]
    proper_pair_only: bool,

    /// Minimum mapping quality.
    #[arg(long)]
    min_map_q: Option<u8>,

    /// Fragment-length filter "min,max" (bp).
    #[arg(long, value_parser = parse_fragment_length)]
    fragment_length: Option<(u32, u32)>,

    /// Keep a uniform-random fraction of fragments, in [0,1).
    #[arg(long)]
    random_proportion: Option<f64>,

    /// Normalize tier totals on distinct read names rather than weighted fragment counts.
    #[arg(long)]
    count_total_real_read: bool,

    /// Counts CSV output path.
    #[arg(long)]
    counts_output: Option<PathBuf>,

    /// Coverage profile output path.
    #[arg(long)]
    profile_output: Option<PathBuf>,

    /// Coverage profile output format.
    #[arg(long, value_enum, default_value_t = CliProfileFormat::Csv)]
    profile_format: CliProfileFormat,

    /// Coverage profile output compression.
    #[arg(long, value_enum, default_value_t = CliCompression::None)]
    profile_compression: CliCompression,

    /// JSON run-report output path.
    #[arg(long)]
    report_output: Option<PathBuf>,

    /// Passthrough SAM output path for kept fragments.
    #[arg(long)]
    sam_output: Option<PathBuf>,

    /// Print [INFO]/[TIMER]/[WARNING] progress to stderr.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum CliProfileType {
    First,
    Last,
    FirstLast,
    Position,
    All,
    Splice,
    Extension,
}

impl From<CliProfileType> for ProfileType {
    fn from(v: CliProfileType) -> Self {
        match v {
            CliProfileType::First => ProfileType::First,
            CliProfileType::Last => ProfileType::Last,
            CliProfileType::FirstLast => ProfileType::FirstLast,
            CliProfileType::Position => ProfileType::Position,
            CliProfileType::All => ProfileType::All,
            CliProfileType::Splice => ProfileType::Splice,
            CliProfileType::Extension => ProfileType::Extension,
        }
    }
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum CliProfileFormat {
    Bedgraph,
    Csv,
    Binary,
}

impl From<CliProfileFormat> for ProfileFormat {
    fn from(v: CliProfileFormat) -> Self {
        match v {
            CliProfileFormat::Bedgraph => ProfileFormat::BedGraph,
            CliProfileFormat::Csv => ProfileFormat::Csv,
            CliProfileFormat::Binary => ProfileFormat::Binary,
        }
    }
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum CliCompression {
    None,
    Lz4,
    Lz4hc,
}

impl From<CliCompression> for Compression {
    fn from(v: CliCompression) -> Self {
        match v {
            CliCompression::None => Compression::None,
            CliCompression::Lz4 => Compression::Lz4,
            CliCompression::Lz4hc => Compression::Lz4Hc,
        }
    }
}

fn parse_fragment_length(s: &str) -> Result<(u32, u32), String> {
    let (lo, hi) = s.split_once(',').ok_or_else(|| format!("expected MIN,MAX, got '{s}'"))?;
    let lo: u32 = lo.parse().map_err(|_| format!("bad min in '{s}'"))?;
    let hi: u32 = hi.parse().map_err(|_| format!("bad max in '{s}'"))?;
    Ok((lo, hi))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config {
        inputs: cli.inputs,
        decoder_command: cli.decoder_command,
        feature_file: cli.features,
        feature_file_is_tab: cli.features_tab,
        filter_file: cli.filter,
        include_missing_in_filter: cli.include_missing_in_filter,
        mapping_file: cli.mapping,
        count_multis: cli.count_multis,
        ignore_nh_tag: cli.ignore_nh_tag,
        min_overlap: cli.min_overlap,
        paired: cli.paired,
        only_read1: cli.only_read1,
        library_r1_strand: cli.library_r1_strand,
        profile_type: cli.profile_type.map(Into::into),
        profile_untemplated: cli.profile_untemplated,
        profile_no_untemplated: cli.profile_no_untemplated,
        profile_no_coord_mapping: cli.profile_no_coord_mapping,
        extension_length: cli.extension_length,
        position_fraction: cli.position_fraction,
        overhang: cli.overhang,
        read_lengths: cli.read_lengths,
        proper_pair_only: cli.proper_pair_only,
        min_map_q: cli.min_map_q,
        fragment_length: cli.fragment_length,
        random_proportion: cli.random_proportion,
        count_total_real_read: cli.count_total_real_read,
        counts_output: cli.counts_output,
        profile_output: cli.profile_output,
        profile_format: cli.profile_format.into(),
        profile_compression: cli.profile_compression.into(),
        report_output: cli.report_output,
        sam_output: cli.sam_output,
        verbose: cli.verbose,
        ..Config::default()
    };
    if let Some(n) = cli.n_worker {
        config.n_worker = n;
    }
    if let Some(m) = cli.profile_multi {
        config.profile_multi = m;
    }

    geneabacus::run(&config).context("geneabacus run failed")?;
    Ok(())
}
