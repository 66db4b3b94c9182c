use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::Deserialize;

use crate::error::{GeneAbacusError, Result};

/// A half-open genomic interval `[start, end)`, one exon of a feature.
pub type Exon = (u64, u64);

/// Immutable after load. `id` is the feature's position in the owning
/// `FeatureSet`'s `features` vector (dense, contiguous `[0, N)`).
#[derive(Debug, Clone)]
pub struct Feature {
    pub id: u32,
    pub name: String,
    pub chrom: String,
    /// +1, -1, or 0 (unstranded; may not be profiled).
    pub strand: i8,
    pub exons: Vec<Exon>,
}

impl Feature {
    pub fn length(&self) -> u64 {
        self.exons.iter().map(|&(s, e)| e - s).sum()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FeatureSet {
    pub features: Vec<Feature>,
}

impl FeatureSet {
    pub fn by_name(&self) -> HashMap<&str, &Feature> {
        self.features.iter().map(|f| (f.name.as_str(), f)).collect()
    }
}

pub trait FeatureSource {
    fn load(&self) -> Result<FeatureSet>;
}

#[derive(Deserialize)]
struct FonFile {
    fon_version: u32,
    features: Vec<FonFeature>,
}

#[derive(Deserialize)]
struct FonFeature {
    name: String,
    chrom: String,
    strand: String,
    coords: Vec<[u64; 2]>,
}

/// Feature-file reader for the FON JSON schema (`fon_version: 1`,
/// `features: [{name, chrom, strand, coords}, ...]`).
pub struct FonReader {
    pub path: std::path::PathBuf,
}

impl FeatureSource for FonReader {
    fn load(&self) -> Result<FeatureSet> {
        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let parsed: FonFile = serde_json::from_reader(reader)?;
        if parsed.fon_version != 1 {
            return Err(GeneAbacusError::FormatError(format!(
                "unsupported fon_version {} in {}",
                parsed.fon_version,
                self.path.display()
            )));
        }

        let mut features = Vec::with_capacity(parsed.features.len());
        for (id, ff) in parsed.features.into_iter().enumerate() {
            let strand = match ff.strand.as_str() {
                "+" => 1,
                "-" => -1,
                other => {
                    return Err(GeneAbacusError::FormatError(format!(
                        "invalid strand '{other}' for feature '{}'",
                        ff.name
                    )));
                }
            };
            let exons = ff.coords.into_iter().map(|c| (c[0], c[1])).collect();
            features.push(Feature {
                id: id as u32,
                name: ff.name,
                chrom: ff.chrom,
                strand,
                exons,
            });
        }
        Ok(FeatureSet { features })
    }
}

/// Feature-file reader for the 2-column `name\tlength` TAB schema, where
/// `chrom == name` and the single exon is `[0, length)`.
pub struct TabReader {
    pub path: std::path::PathBuf,
}

impl FeatureSource for TabReader {
    fn load(&self) -> Result<FeatureSet> {
        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut features = Vec::new();
        for (id, line) in reader.lines().enumerate() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let mut cols = line.splitn(2, '\t');
            let name = cols.next().ok_or_else(|| {
                GeneAbacusError::FormatError(format!("malformed TAB line: {line}"))
            })?;
            let length: u64 = cols
                .next()
                .ok_or_else(|| GeneAbacusError::FormatError(format!("malformed TAB line: {line}")))?
                .trim()
                .parse()
                .map_err(|_| GeneAbacusError::FormatError(format!("bad length in: {line}")))?;
            features.push(Feature {
                id: id as u32,
                name: name.to_string(),
                chrom: name.to_string(),
                strand: 1,
                exons: vec![(0, length)],
            });
        }
        Ok(FeatureSet { features })
    }
}

/// Optional `name\tnewName` mapping table used only by the bedGraph/CSV
/// profile writers.
pub struct NameMapping {
    map: HashMap<String, String>,
}

impl NameMapping {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut map = HashMap::new();
        for line in reader.lines() {
            let line = line?;
            if let Some((name, new_name)) = line.split_once('\t') {
                map.insert(name.to_string(), new_name.to_string());
            }
        }
        Ok(NameMapping { map })
    }

    pub fn map_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.map.get(name).map(|s| s.as_str()).unwrap_or(name)
    }
}

/// Builds the filter-twin feature set (spec §6 "Filter semantics"): count
/// features are matched to filter features by name, reusing the count
/// feature's id; `include_missing` optionally re-adds unmatched count
/// features with their own coordinates under freshly assigned ids.
pub fn apply_filter(
    counts: &FeatureSet,
    filter: &FeatureSet,
    include_missing: bool,
) -> FeatureSet {
    let filter_by_name = filter.by_name();
    let mut next_id = counts
        .features
        .iter()
        .map(|f| f.id)
        .chain(filter.features.iter().map(|f| f.id))
        .max()
        .map(|m| m + 1)
        .unwrap_or(0);

    let mut out = Vec::with_capacity(counts.features.len());
    for cf in &counts.features {
        match filter_by_name.get(cf.name.as_str()) {
            Some(ff) => out.push(Feature {
                id: cf.id,
                name: cf.name.clone(),
                chrom: ff.chrom.clone(),
                strand: ff.strand,
                exons: ff.exons.clone(),
            }),
            None => {
                eprintln!("[WARNING] feature {} not found in filter set", cf.name);
                if include_missing {
                    out.push(Feature {
                        id: next_id,
                        name: cf.name.clone(),
                        chrom: cf.chrom.clone(),
                        strand: cf.strand,
                        exons: cf.exons.clone(),
                    });
                    next_id += 1;
                }
            }
        }
    }
    FeatureSet { features: out }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn fon_rejects_unknown_version() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"fon_version": 2, "features": []}}"#).unwrap();
        let reader = FonReader { path: f.path().to_path_buf() };
        assert!(matches!(reader.load(), Err(GeneAbacusError::FormatError(_))));
    }

    #[test]
    fn fon_parses_features() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            r#"{{"fon_version": 1, "features": [{{"name":"A","chrom":"chr1","strand":"+","coords":[[100,200]]}}]}}"#
        )
        .unwrap();
        let reader = FonReader { path: f.path().to_path_buf() };
        let set = reader.load().unwrap();
        assert_eq!(set.features.len(), 1);
        assert_eq!(set.features[0].name, "A");
        assert_eq!(set.features[0].exons, vec![(100, 200)]);
        assert_eq!(set.features[0].length(), 100);
    }

    #[test]
    fn tab_single_exon_from_zero() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "chr1\t1000").unwrap();
        let reader = TabReader { path: f.path().to_path_buf() };
        let set = reader.load().unwrap();
        assert_eq!(set.features[0].exons, vec![(0, 1000)]);
    }

    #[test]
    fn filter_missing_gets_fresh_id() {
        let counts = FeatureSet {
            features: vec![
                Feature { id: 0, name: "A".into(), chrom: "chr1".into(), strand: 1, exons: vec![(0, 10)] },
                Feature { id: 1, name: "B".into(), chrom: "chr1".into(), strand: 1, exons: vec![(20, 30)] },
            ],
        };
        let filter = FeatureSet {
            features: vec![Feature { id: 0, name: "A".into(), chrom: "chr1".into(), strand: 1, exons: vec![(0, 5)] }],
        };
        let merged = apply_filter(&counts, &filter, true);
        assert_eq!(merged.features.len(), 2);
        assert_eq!(merged.features[0].id, 0);
        assert_eq!(merged.features[1].id, 2);
        assert_eq!(merged.features[1].name, "B");
    }
}
