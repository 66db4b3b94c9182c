//! Per-feature read counting and coverage profiling over SAM/BAM
//! alignments: streaming ingestion, strand-aware interval overlap, a
//! genomic/transcript coordinate mapper, a bounded-channel worker pool,
//! and CSV/bedGraph/binary output.

pub mod align;
pub mod alignment_source;
pub mod cache;
pub mod cancel;
pub mod config;
pub mod coord_mapper;
pub mod error;
pub mod feature;
pub mod feature_ext;
pub mod feature_tree;
pub mod interval_tree;
pub mod profile;
pub mod report;
pub mod worker_pool;
pub mod writers;

use std::sync::Mutex;

use config::Config;
use error::{GeneAbacusError, Result};
use feature::{apply_filter, FeatureSource, FonReader, NameMapping, TabReader};
use report::RunReport;

/// Runs the full pipeline once over `config`: loads features (and the
/// optional filter/mapping tables), builds the interval tree and
/// coordinate mappers, streams the configured inputs through the worker
/// pool, and writes whichever of counts/profile/report/SAM outputs were
/// requested.
pub fn run(config: &Config) -> Result<RunReport> {
    if config.verbose {
        eprintln!("[INFO] loading features from {}", config.feature_file.display());
    }

    let mut features = if config.feature_file_is_tab {
        TabReader { path: config.feature_file.clone() }.load()?
    } else {
        FonReader { path: config.feature_file.clone() }.load()?
    };

    if let Some(filter_path) = &config.filter_file {
        let filter = FonReader { path: filter_path.clone() }.load()?;
        features = apply_filter(&features, &filter, config.include_missing_in_filter);
    }

    let name_mapping = config.mapping_file.as_ref().map(|p| NameMapping::load(p)).transpose()?;

    if let Some(pt) = config.profile_type {
        if matches!(pt, config::ProfileType::First | config::ProfileType::Last) && config.library_r1_strand == 0 {
            return Err(GeneAbacusError::FormatError(
                "profile types 'first'/'last' require a stranded library".into(),
            ));
        }
    }

    if config.verbose {
        eprintln!("[INFO] {} features loaded", features.features.len());
        eprintln!("[TIMER] building interval trees and coordinate mappers");
    }

    let profiling = config.profile_type.is_some();
    let contexts = feature_ext::build_feature_contexts(&features, config.overhang, profiling);
    let mut feature_exts = feature_ext::build_feature_exts(&contexts, config.count_multis.len());
    let feature_tree = feature_tree::FeatureTree::build(&features);

    let sam_writer = match &config.sam_output {
        Some(path) => {
            let header_view = alignment_source::peek_header(
                &config.inputs,
                config.decoder_command.as_deref(),
                config.n_worker1(),
            )?;
            let header = rust_htslib::bam::Header::from_template(&header_view);
            let writer = rust_htslib::bam::Writer::from_path(path, &header, rust_htslib::bam::Format::Sam)?;
            Some(Mutex::new(writer))
        }
        None => None,
    };
    let cancel = cancel::CancelToken::new();

    if config.verbose {
        eprintln!(
            "[INFO] starting worker pool: nWorker1={} nWorker2={}",
            config.n_worker1(),
            config.n_worker2()
        );
    }

    let (report, tier_totals) = worker_pool::run(
        config,
        &feature_tree,
        &contexts,
        &mut feature_exts,
        sam_writer.as_ref(),
        &cancel,
    )?;

    if config.verbose {
        eprintln!(
            "[INFO] done: input={} align_unique={} align_multi={}",
            report.input, report.align_unique, report.align_multi
        );
    }

    if let Some(path) = &config.counts_output {
        writers::write_counts(path, &features, &feature_exts, &config.count_multis, &tier_totals)?;
    }
    if let Some(path) = &config.profile_output {
        if !profiling {
            return Err(GeneAbacusError::FormatError(
                "profile_output configured without a profile_type".into(),
            ));
        }
        writers::write_profiles(
            path,
            &features,
            &feature_exts,
            name_mapping.as_ref(),
            config.profile_format,
            config.profile_compression,
        )?;
    }
    if let Some(path) = &config.report_output {
        report.write_json(path)?;
    }

    Ok(report)
}
