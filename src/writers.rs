//! Counts CSV and coverage-profile (bedGraph/CSV/binary, optionally
//! LZ4/LZ4HC-wrapped) output, grounded on
//! `original_source/lib/feature/feature_ext.go` (`WriteCounts`,
//! `WriteProfiles`). LZ4/adler32 are new, explicitly-grounded dependencies
//! (DESIGN.md) since no pack repo already carries either.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};

use crate::config::{Compression, ProfileFormat};
use crate::error::Result;
use crate::feature::{FeatureSet, NameMapping};
use crate::feature_ext::{rpkm, FeatureExt};

/// Counts CSV (spec §6): header + a synthetic "total" row + one row per
/// feature, in feature insertion order. `tier_totals` is the per-tier
/// normalization denominator produced by the worker pool.
pub fn write_counts(
    path: &Path,
    features: &FeatureSet,
    feature_exts: &[FeatureExt],
    count_multis: &[u32],
    tier_totals: &[f64],
) -> Result<()> {
    let file = File::create(path)?;
    let mut w = csv::Writer::from_writer(BufWriter::new(file));

    let mut header = vec!["name".to_string(), "length".to_string()];
    for m in count_multis {
        header.push(format!("count_{m}"));
        header.push(format!("rpkm_{m}"));
    }
    w.write_record(&header)?;

    let total_length: f64 = feature_exts.iter().map(|e| e.total_length()).sum();
    let mut total_row = vec!["total".to_string(), format_f64(total_length)];
    for i in 0..count_multis.len() {
        let total_count: f64 = feature_exts.iter().map(|e| e.counts[1 + 2 * i]).sum();
        let total_rpkm = rpkm(total_count, total_length, tier_totals[i]);
        total_row.push(format_f64(total_count));
        total_row.push(format_f64(total_rpkm));
    }
    w.write_record(&total_row)?;

    for (f, ext) in features.features.iter().zip(feature_exts.iter()) {
        let mut row = vec![f.name.clone(), format_f64(ext.total_length())];
        for i in 0..count_multis.len() {
            row.push(format_f64(ext.counts[1 + 2 * i]));
            row.push(format_f64(ext.counts[2 + 2 * i]));
        }
        w.write_record(&row)?;
    }
    w.flush()?;
    Ok(())
}

fn format_f64(v: f64) -> String {
    format!("{v}")
}

/// Writes the coverage-profile output in the configured format, optionally
/// wrapped in LZ4/LZ4HC.
pub fn write_profiles(
    path: &Path,
    features: &FeatureSet,
    feature_exts: &[FeatureExt],
    mapping: Option<&NameMapping>,
    format: ProfileFormat,
    compression: Compression,
) -> Result<()> {
    let mut body = Vec::new();
    match format {
        ProfileFormat::BedGraph => write_bedgraph(&mut body, features, feature_exts, mapping)?,
        ProfileFormat::Csv => write_profile_csv(&mut body, features, feature_exts, mapping)?,
        ProfileFormat::Binary => write_profile_binary(&mut body, feature_exts)?,
    }

    let out_bytes = match compression {
        Compression::None => body,
        Compression::Lz4 => lz4_flex::compress_prepend_size(&body),
        Compression::Lz4Hc => lz4_flex::compress_hc_prepend_size(&body, 9),
    };

    let mut file = BufWriter::new(File::create(path)?);
    file.write_all(&out_bytes)?;
    file.flush()?;
    Ok(())
}

fn mapped_name<'a>(name: &'a str, mapping: Option<&'a NameMapping>) -> &'a str {
    mapping.map_or(name, |m| m.map_name(name))
}

/// `<name>\t<start>\t<end>\t<value>` per run of constant non-zero value,
/// run-length epsilon `1e-6`.
fn write_bedgraph(
    out: &mut Vec<u8>,
    features: &FeatureSet,
    feature_exts: &[FeatureExt],
    mapping: Option<&NameMapping>,
) -> Result<()> {
    const EPS: f32 = 1e-6;
    for (f, ext) in features.features.iter().zip(feature_exts.iter()) {
        let name = mapped_name(&f.name, mapping);
        let mut i = 0usize;
        while i < ext.profile.len() {
            let v = ext.profile[i];
            if v.abs() < EPS {
                i += 1;
                continue;
            }
            let start = i;
            while i < ext.profile.len() && (ext.profile[i] - v).abs() < EPS {
                i += 1;
            }
            writeln!(out, "{name}\t{start}\t{i}\t{v}")?;
        }
    }
    Ok(())
}

/// `<name>,<length>,v0,v1,v2,...`.
fn write_profile_csv(
    out: &mut Vec<u8>,
    features: &FeatureSet,
    feature_exts: &[FeatureExt],
    mapping: Option<&NameMapping>,
) -> Result<()> {
    for (f, ext) in features.features.iter().zip(feature_exts.iter()) {
        let name = mapped_name(&f.name, mapping);
        write!(out, "{name},{}", ext.profile.len())?;
        for v in &ext.profile {
            write!(out, ",{v}")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// `u8 version=3`, `u32 totalLength`, `u32 adler32` over the concatenated
/// little-endian per-feature length words, then each feature's profile as
/// a little-endian `f32` array.
fn write_profile_binary(out: &mut Vec<u8>, feature_exts: &[FeatureExt]) -> Result<()> {
    let lengths: Vec<u32> = feature_exts.iter().map(|e| e.profile.len() as u32).collect();
    let total_length: u32 = lengths.iter().sum();

    let mut length_bytes = Vec::with_capacity(lengths.len() * 4);
    for &l in &lengths {
        length_bytes.write_u32::<LittleEndian>(l)?;
    }
    let checksum = adler32::adler32(std::io::Cursor::new(&length_bytes))?;

    out.write_u8(3)?;
    out.write_u32::<LittleEndian>(total_length)?;
    out.write_u32::<LittleEndian>(checksum)?;
    for ext in feature_exts {
        for &v in &ext.profile {
            out.write_f32::<LittleEndian>(v)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_header_checksum_matches_length_words() {
        let exts = vec![
            FeatureExt { counts: vec![0.0], profile: vec![0.0; 5] },
            FeatureExt { counts: vec![0.0], profile: vec![0.0; 7] },
        ];
        let mut out = Vec::new();
        write_profile_binary(&mut out, &exts).unwrap();

        assert_eq!(out[0], 3);
        let total_length = u32::from_le_bytes(out[1..5].try_into().unwrap());
        assert_eq!(total_length, 12);
        let checksum = u32::from_le_bytes(out[5..9].try_into().unwrap());
        let length_bytes = [5u32.to_le_bytes(), 7u32.to_le_bytes()].concat();
        let expected = adler32::adler32(std::io::Cursor::new(&length_bytes)).unwrap();
        assert_eq!(checksum, expected);
        assert_eq!(out.len() - 9, 12 * 4);
    }

    #[test]
    fn counts_total_row_recomputes_rpkm_from_totals() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counts.csv");
        let features = FeatureSet {
            features: vec![
                crate::feature::Feature { id: 0, name: "A".into(), chrom: "chr1".into(), strand: 1, exons: vec![(0, 100)] },
                crate::feature::Feature { id: 1, name: "B".into(), chrom: "chr1".into(), strand: 1, exons: vec![(0, 100)] },
            ],
        };
        let exts = vec![
            FeatureExt { counts: vec![100.0, 1.0, 0.0], profile: vec![] },
            FeatureExt { counts: vec![100.0, 1.0, 0.0], profile: vec![] },
        ];
        write_counts(&path, &features, &exts, &[1], &[2.0]).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        let total_line = contents.lines().nth(1).unwrap();
        let total_rpkm: f64 = total_line.split(',').nth(3).unwrap().parse().unwrap();
        // total_count=2, total_length=200: 2 * (1000/200) * (1e6/2) = 5_000_000
        assert!((total_rpkm - 5_000_000.0).abs() < 1e-6);
    }
}
