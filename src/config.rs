use std::path::PathBuf;

/// One of the six coverage-profile projection modes (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileType {
    First,
    Last,
    FirstLast,
    Position,
    All,
    Splice,
    Extension,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileFormat {
    BedGraph,
    Csv,
    Binary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Lz4,
    Lz4Hc,
}

/// The struct the (out-of-scope) CLI hands to the core. Every tunable named
/// across spec §3/§5/§6 lives here; nothing here is parsed from flags by
/// this crate itself.
#[derive(Debug, Clone)]
pub struct Config {
    pub inputs: Vec<PathBuf>,
    pub decoder_command: Option<Vec<String>>,

    pub feature_file: PathBuf,
    pub feature_file_is_tab: bool,
    pub filter_file: Option<PathBuf>,
    pub include_missing_in_filter: bool,
    pub mapping_file: Option<PathBuf>,

    pub n_worker: usize,
    pub count_multis: Vec<u32>,
    pub ignore_nh_tag: bool,
    pub min_overlap: u32,
    pub paired: bool,
    pub only_read1: bool,
    /// +1, -1, or 0 (unstranded)
    pub library_r1_strand: i8,

    pub profile_type: Option<ProfileType>,
    pub profile_multi: u32,
    pub profile_untemplated: u32,
    pub profile_no_untemplated: bool,
    pub profile_no_coord_mapping: bool,
    pub extension_length: u32,
    pub position_fraction: f64,
    pub overhang: u32,

    pub read_lengths: Option<Vec<u32>>,
    pub proper_pair_only: bool,
    pub min_map_q: Option<u8>,
    pub fragment_length: Option<(u32, u32)>,
    pub random_proportion: Option<f64>,
    pub count_total_real_read: bool,

    pub counts_output: Option<PathBuf>,
    pub profile_output: Option<PathBuf>,
    pub profile_format: ProfileFormat,
    pub profile_compression: Compression,
    pub report_output: Option<PathBuf>,
    pub sam_output: Option<PathBuf>,

    pub verbose: bool,
}

impl Config {
    /// `nWorker1` decompression threads handed to the BAM reader: half the
    /// configured worker count, at least one.
    pub fn n_worker1(&self) -> usize {
        (self.n_worker / 2).max(1)
    }

    /// `nWorker2` counting/profiling worker tasks: whatever's left, at least one.
    pub fn n_worker2(&self) -> usize {
        self.n_worker.saturating_sub(self.n_worker1()).max(1)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            inputs: Vec::new(),
            decoder_command: None,
            feature_file: PathBuf::new(),
            feature_file_is_tab: false,
            filter_file: None,
            include_missing_in_filter: false,
            mapping_file: None,
            n_worker: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
            count_multis: vec![1],
            ignore_nh_tag: false,
            min_overlap: 1,
            paired: false,
            only_read1: false,
            library_r1_strand: 0,
            profile_type: None,
            profile_multi: u32::MAX,
            profile_untemplated: 0,
            profile_no_untemplated: false,
            profile_no_coord_mapping: false,
            extension_length: 0,
            position_fraction: 0.5,
            overhang: 0,
            read_lengths: None,
            proper_pair_only: false,
            min_map_q: None,
            fragment_length: None,
            random_proportion: None,
            count_total_real_read: false,
            counts_output: None,
            profile_output: None,
            profile_format: ProfileFormat::Csv,
            profile_compression: Compression::None,
            report_output: None,
            sam_output: None,
            verbose: false,
        }
    }
}
