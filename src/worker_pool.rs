//! The three-stage pipeline's worker and reducer halves (spec §4.5/§4.6):
//! `nWorker2` worker threads draining Pair batches and filling per-fragment
//! Caches, and a single reducer draining filled Caches into the global
//! `FeatureExt` array. Grounded on `original_source/cmd/geneabacus/pc.go`,
//! which holds both the worker and reducer goroutines.

use std::collections::HashSet;
use std::sync::Mutex;

use crossbeam_channel::{bounded, Receiver, Sender};
use rand::Rng;
use rust_htslib::bam::record::{Aux, Record};

use crate::alignment_source::{self, Pair};
use crate::cache::Cache;
use crate::cancel::CancelToken;
use crate::config::Config;
use crate::error::{GeneAbacusError, Result};
use crate::feature_ext::{rpkm, FeatureContext, FeatureExt};
use crate::feature_tree::FeatureTree;
use crate::profile::{self, KernelContext};
use crate::report::RunReport;

/// Reads the `NH` aux tag (any integer width) and returns `1` when
/// `ignore_nh_tag` is set. Missing tag with `ignore_nh_tag == false` is
/// `MissingTag` (spec §4.5 step 1 / §7).
fn read_multiplicity(record: &Record, ignore_nh_tag: bool) -> Result<u32> {
    if ignore_nh_tag {
        return Ok(1);
    }
    match record.aux(b"NH") {
        Ok(Aux::I8(v)) => Ok(v.max(0) as u32),
        Ok(Aux::U8(v)) => Ok(v as u32),
        Ok(Aux::I16(v)) => Ok(v.max(0) as u32),
        Ok(Aux::U16(v)) => Ok(v as u32),
        Ok(Aux::I32(v)) => Ok(v.max(0) as u32),
        Ok(Aux::U32(v)) => Ok(v),
        _ => Err(GeneAbacusError::MissingTag(String::from_utf8_lossy(record.qname()).into_owned())),
    }
}

fn length_filter(reads: &[Record], allowed: &[u32]) -> bool {
    reads.iter().all(|r| allowed.contains(&(r.seq_len() as u32)))
}

fn proper_pair_mapq_filter(reads: &[Record], proper_pair_only: bool, min_map_q: Option<u8>) -> bool {
    reads.iter().all(|r| {
        (!proper_pair_only || r.is_proper_pair()) && min_map_q.map_or(true, |q| r.mapq() >= q)
    })
}

/// Pre-overlap fragment-length filter (§4.5 step 5): only active when
/// coordinate mapping is disabled, using the first read's `TLEN`.
fn fragment_length_prefilter(reads: &[Record], config: &Config) -> bool {
    if !config.profile_no_coord_mapping {
        return true;
    }
    match config.fragment_length {
        None => true,
        Some((lo, hi)) => {
            let tlen = reads[0].insert_size().unsigned_abs() as u32;
            tlen >= lo && tlen <= hi
        }
    }
}

/// Processes one fragment against every overlapping feature, filling
/// `cache` with one packet per kept feature. Per-fragment filter drops
/// are not errors (spec §7) and are reported as `Ok(())`.
fn process_pair(
    pair: &Pair,
    config: &Config,
    feature_tree: &FeatureTree,
    contexts: &[FeatureContext],
    cache: &mut Cache,
    sam_writer: Option<&Mutex<rust_htslib::bam::Writer>>,
) -> Result<()> {
    let pair_multi = read_multiplicity(&pair.reads[0], config.ignore_nh_tag)?;
    let pair_count = 1.0_f32 / pair_multi as f32;
    cache.input_count += 1.0 / pair_multi as f64;
    cache.n_input += 1;

    if let Some(allowed) = &config.read_lengths {
        if !length_filter(&pair.reads, allowed) {
            return Ok(());
        }
    }
    if !proper_pair_mapq_filter(&pair.reads, config.proper_pair_only, config.min_map_q) {
        return Ok(());
    }
    if !fragment_length_prefilter(&pair.reads, config) {
        return Ok(());
    }
    if let Some(p) = config.random_proportion {
        if rand::rng().random::<f64>() > p {
            return Ok(());
        }
    }

    let overlaps = feature_tree.overlap_feature_read(&pair.reads, &pair.chrom, config.library_r1_strand);
    if overlaps.is_empty() {
        return Ok(());
    }

    let profiling = config.profile_type.is_some();
    let mut kept = false;

    for (feature_id, overlap) in &overlaps {
        if overlap.length < config.min_overlap as u64 {
            continue;
        }
        let ctx = &contexts[*feature_id as usize];

        if config.profile_no_coord_mapping {
            if let Some((lo, hi)) = config.fragment_length {
                if let Some((start, end)) =
                    profile::fragment_coords(&pair.reads, overlap, ctx.coord_mapper.as_ref(), true)
                {
                    let span = (end - start) as u32;
                    if span < lo || span > hi {
                        continue;
                    }
                }
            }
        }

        let packet = cache.next_packet(*feature_id);

        let coord_inside = if profiling && pair_multi <= config.profile_multi {
            let mut kctx = KernelContext {
                reads: &pair.reads,
                only_read1: pair.only_read1,
                paired: config.paired,
                library_r1_strand: config.library_r1_strand,
                overlap,
                feature_strand: ctx.feature.strand,
                feature_genome_end: ctx.genome_end(),
                coord_mapper: ctx.coord_mapper.as_ref(),
                pair_count,
                profile_change: &mut packet.profile_change,
                no_map: config.profile_no_coord_mapping,
                profile_untemplated: config.profile_untemplated,
                profile_no_untemplated: config.profile_no_untemplated,
                extension_length: config.extension_length,
                position_fraction: config.position_fraction,
            };
            profile::apply(config.profile_type.unwrap(), &mut kctx)?
        } else {
            true
        };

        if !profiling || coord_inside {
            for (i, &tier) in config.count_multis.iter().enumerate() {
                if pair_multi <= tier {
                    packet.counts[i] += pair_count;
                    kept = true;
                }
            }
        }
    }

    if kept {
        let tier_idx = config
            .count_multis
            .iter()
            .position(|&t| pair_multi <= t)
            .unwrap_or(config.count_multis.len() - 1);
        if config.count_total_real_read {
            cache.multi_set_names[tier_idx].insert(String::from_utf8_lossy(pair.reads[0].qname()).into_owned());
        } else {
            cache.multi_counts[tier_idx] += 1.0 / pair_multi as f64;
        }
        if pair_multi == 1 {
            cache.n_unique += 1;
        } else {
            cache.n_multi += 1;
        }
        if let Some(writer) = sam_writer {
            let mut w = writer.lock().unwrap();
            for r in &pair.reads {
                w.write(r)?;
            }
        }
    }

    Ok(())
}

/// Runs the full pipeline: spawns the reader and `nWorker2` workers inside
/// a scoped-thread region, drives the reducer on the calling thread, and
/// returns the accumulated report. `feature_exts` is mutated in place by
/// the reducer only; `contexts` is shared read-only by every worker.
pub fn run(
    config: &Config,
    feature_tree: &FeatureTree,
    contexts: &[FeatureContext],
    feature_exts: &mut [FeatureExt],
    sam_writer: Option<&Mutex<rust_htslib::bam::Writer>>,
    cancel: &CancelToken,
) -> Result<(RunReport, Vec<f64>)> {
    let n_worker1 = config.n_worker1();
    let n_worker2 = config.n_worker2();
    let n_tiers = config.count_multis.len();

    let (pair_tx, pair_rx): (Sender<Vec<Pair>>, Receiver<Vec<Pair>>) = bounded(config.n_worker.max(1) * 10);
    let (free_tx, free_rx): (Sender<Cache>, Receiver<Cache>) = bounded(n_worker2 * 2);
    let (full_tx, full_rx): (Sender<Cache>, Receiver<Cache>) = bounded(n_worker2 * 2);

    for _ in 0..n_worker2 * 2 {
        let _ = free_tx.send(Cache::new(n_tiers));
    }

    let mut input_count = 0.0f64;
    let mut multi_counts = vec![0.0f64; n_tiers];
    let mut multi_set_names: Vec<HashSet<String>> = vec![HashSet::new(); n_tiers];
    let mut n_input = 0u64;
    let mut n_unique = 0u64;
    let mut n_multi = 0u64;

    std::thread::scope(|scope| {
        let reader_cancel = cancel.clone();
        scope.spawn(move || {
            let result = alignment_source::run(
                &config.inputs,
                config.decoder_command.as_deref(),
                config.paired,
                n_worker1,
                pair_tx,
                &reader_cancel,
            );
            if let Err(e) = result {
                reader_cancel.fail(e);
            }
        });

        for _ in 0..n_worker2 {
            let pair_rx = pair_rx.clone();
            let free_rx = free_rx.clone();
            let free_tx = free_tx.clone();
            let full_tx = full_tx.clone();
            let worker_cancel = cancel.clone();
            scope.spawn(move || loop {
                if worker_cancel.is_cancelled() {
                    return;
                }
                let batch = match pair_rx.recv() {
                    Ok(b) => b,
                    Err(_) => return,
                };
                for pair in &batch {
                    let mut cache = match free_rx.recv() {
                        Ok(c) => c,
                        Err(_) => return,
                    };
                    if let Err(e) = process_pair(pair, config, feature_tree, contexts, &mut cache, sam_writer) {
                        worker_cancel.fail(e);
                        return;
                    }
                    if cache.is_empty() {
                        let _ = free_tx.send(cache);
                    } else if full_tx.send(cache).is_err() {
                        return;
                    }
                }
            });
        }
        drop(pair_rx);
        drop(free_rx);
        drop(full_tx);

        while let Ok(mut cache) = full_rx.recv() {
            if cancel.is_cancelled() {
                break;
            }
            for packet in cache.packets() {
                let ext = &mut feature_exts[packet.feature_id as usize];
                for (i, &c) in packet.counts.iter().enumerate() {
                    ext.counts[1 + 2 * i] += c as f64;
                }
                for (idx, delta) in packet.profile_change.entries() {
                    if (idx as usize) < ext.profile.len() {
                        ext.profile[idx as usize] += delta;
                    }
                }
            }
            input_count += cache.input_count;
            n_input += cache.n_input;
            n_unique += cache.n_unique;
            n_multi += cache.n_multi;
            for i in 0..n_tiers {
                multi_counts[i] += cache.multi_counts[i];
                for name in cache.multi_set_names[i].drain() {
                    multi_set_names[i].insert(name);
                }
            }
            cache.reset();
            let _ = free_tx.send(cache);
        }
    });

    if let Some(err) = cancel.take_error() {
        return Err(err);
    }

    // Cumulative per-tier totals used by the CSV writer for RPKM (spec §6:
    // "cumulative real-read count ... or cumulative weighted count,
    // depending on countTotalRealRead").
    let mut tier_totals = vec![0.0f64; n_tiers];
    let mut running_set: HashSet<String> = HashSet::new();
    let mut running_weighted = 0.0f64;
    for i in 0..n_tiers {
        if config.count_total_real_read {
            for name in &multi_set_names[i] {
                running_set.insert(name.clone());
            }
            tier_totals[i] = running_set.len() as f64;
        } else {
            running_weighted += multi_counts[i];
            tier_totals[i] = running_weighted;
        }
    }
    for ext in feature_exts.iter_mut() {
        let length = ext.total_length();
        for i in 0..n_tiers {
            let count = ext.counts[1 + 2 * i];
            ext.counts[2 + 2 * i] = rpkm(count, length, tier_totals[i]);
        }
    }
    let _ = input_count;

    let report = RunReport {
        input: n_input as u32,
        align_unique: n_unique as u32,
        align_multi: n_multi as u32,
        output: (n_unique + n_multi) as u32,
    };
    Ok((report, tier_totals))
}
