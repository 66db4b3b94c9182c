//! Streaming SAM/BAM ingestion and fragment (Pair) reconstruction (spec §4.3).
//!
//! Opens every input uniformly through `rust_htslib::bam::Reader`, which
//! sniffs SAM/BAM/CRAM by magic bytes — the same convention the teacher's
//! `commands::coverage::collect_by_root_from_bam` uses for
//! `bam::Reader::from_path`. A plain-SAM input piped through an external
//! decompressor is served to `rust-htslib` through a named pipe, since
//! `bam::Reader` is path-based rather than generic over `Read`.

use std::fs::File;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crossbeam_channel::Sender;
use rust_htslib::bam::{self, Read as BamRead};

use crate::cancel::CancelToken;
use crate::error::{GeneAbacusError, Result};

pub const PAIR_BATCH_SIZE: usize = 10;

/// Transient fragment: 1 or 2 mapped read records plus, for a singleton,
/// whether the mapped mate is the library's "read 1".
pub struct Pair {
    pub reads: Vec<bam::Record>,
    pub only_read1: bool,
    pub chrom: String,
}

/// Opens `path` (optionally through `decoder_command`, a named-pipe-fed
/// external decompressor) with `n_worker1` decompression threads.
fn open_input(
    path: &Path,
    decoder_command: Option<&[String]>,
    n_worker1: usize,
) -> Result<(bam::Reader, Option<tempfile::TempDir>)> {
    match decoder_command {
        None => {
            let mut reader = bam::Reader::from_path(path)
                .map_err(|e| GeneAbacusError::IoFailure(std::io::Error::other(e.to_string())))?;
            reader
                .set_threads(n_worker1)
                .map_err(|e| GeneAbacusError::IoFailure(std::io::Error::other(e.to_string())))?;
            Ok((reader, None))
        }
        Some(argv) => {
            let tmp = tempfile::tempdir()?;
            let fifo_path = tmp.path().join("geneabacus.fifo");
            nix::unistd::mkfifo(&fifo_path, nix::sys::stat::Mode::S_IRUSR | nix::sys::stat::Mode::S_IWUSR)
                .map_err(|e| GeneAbacusError::IoFailure(std::io::Error::other(e.to_string())))?;

            let (prog, args) = argv
                .split_first()
                .ok_or_else(|| GeneAbacusError::FormatError("empty decoder command".into()))?;
            let mut full_args: Vec<&str> = args.iter().map(|s| s.as_str()).collect();
            let path_str = path.to_string_lossy().into_owned();
            full_args.push(&path_str);

            let mut child = Command::new(prog)
                .args(&full_args)
                .stdout(Stdio::piped())
                .spawn()?;
            let mut child_stdout = child.stdout.take().expect("piped stdout");
            let writer_fifo_path = fifo_path.clone();
            std::thread::spawn(move || {
                if let Ok(mut fifo_file) = File::create(&writer_fifo_path) {
                    let _ = std::io::copy(&mut child_stdout, &mut fifo_file);
                    let _ = fifo_file.flush();
                }
                let _ = child.wait();
            });

            let mut reader = bam::Reader::from_path(&fifo_path)
                .map_err(|e| GeneAbacusError::IoFailure(std::io::Error::other(e.to_string())))?;
            reader
                .set_threads(n_worker1)
                .map_err(|e| GeneAbacusError::IoFailure(std::io::Error::other(e.to_string())))?;
            Ok((reader, Some(tmp)))
        }
    }
}

/// Opens just the first configured input long enough to clone its header,
/// for the optional SAM-passthrough writer (which needs a header before
/// the worker pool starts). Mirrors the decoder/FIFO setup of `run` itself.
pub fn peek_header(
    inputs: &[PathBuf],
    decoder_command: Option<&[String]>,
    n_worker1: usize,
) -> Result<bam::HeaderView> {
    let path = inputs.first().ok_or_else(|| GeneAbacusError::FormatError("no input files configured".into()))?;
    let (reader, _fifo_guard) = open_input(path, decoder_command, n_worker1)?;
    Ok(reader.header().clone())
}

/// Runs the reader task: opens every configured input in order, assembles
/// Pairs per §4.3's rules, batches them into groups of up to
/// `PAIR_BATCH_SIZE`, and sends full (and a trailing partial) batch into
/// `tx`. Returns early if `cancel` is observed at a send suspension point.
pub fn run(
    inputs: &[PathBuf],
    decoder_command: Option<&[String]>,
    paired: bool,
    n_worker1: usize,
    tx: Sender<Vec<Pair>>,
    cancel: &CancelToken,
) -> Result<()> {
    for path in inputs {
        let (mut reader, _fifo_guard) = open_input(path, decoder_command, n_worker1)?;
        let mut batch = Vec::with_capacity(PAIR_BATCH_SIZE);
        let mut record = bam::Record::new();

        loop {
            if cancel.is_cancelled() {
                return Ok(());
            }
            match reader.read(&mut record) {
                None => break,
                Some(Err(e)) => {
                    return Err(GeneAbacusError::IoFailure(std::io::Error::other(e.to_string())));
                }
                Some(Ok(())) => {}
            }
            let a = record.clone();
            let chrom = String::from_utf8_lossy(reader.header().tid2name(a.tid() as u32)).into_owned();

            let pair = if !paired {
                if a.is_unmapped() || a.is_supplementary() {
                    continue;
                }
                Pair { reads: vec![a], only_read1: false, chrom }
            } else {
                if a.is_unmapped() || a.is_supplementary() {
                    continue;
                }
                if a.is_mate_unmapped() || !a.is_paired() {
                    Pair { reads: vec![a.clone()], only_read1: a.is_first_in_template(), chrom }
                } else {
                    let mut b;
                    loop {
                        match reader.read(&mut record) {
                            None => {
                                return Err(GeneAbacusError::MateNameMismatch(
                                    String::from_utf8_lossy(a.qname()).into_owned(),
                                    "<eof>".into(),
                                ));
                            }
                            Some(Err(e)) => {
                                return Err(GeneAbacusError::IoFailure(std::io::Error::other(e.to_string())));
                            }
                            Some(Ok(())) => {}
                        }
                        if record.is_supplementary() {
                            continue;
                        }
                        b = record.clone();
                        break;
                    }
                    if a.qname() != b.qname() {
                        return Err(GeneAbacusError::MateNameMismatch(
                            String::from_utf8_lossy(a.qname()).into_owned(),
                            String::from_utf8_lossy(b.qname()).into_owned(),
                        ));
                    }
                    let reads = if a.is_first_in_template() { vec![a, b] } else { vec![b, a] };
                    Pair { reads, only_read1: false, chrom }
                }
            };

            batch.push(pair);
            if batch.len() == PAIR_BATCH_SIZE {
                if tx.send(std::mem::replace(&mut batch, Vec::with_capacity(PAIR_BATCH_SIZE))).is_err() {
                    return Ok(());
                }
            }
        }

        if !batch.is_empty() {
            let _ = tx.send(batch);
        }
    }
    Ok(())
}
