//! Data loading, sampling and train/test splitting for the sanitized CSV.

use std::path::Path;

use anyhow::{bail, Context, Result};
use banpl_core::DatasetRecord;

/// Train/test partition of a dataset.
#[derive(Debug, Clone)]
pub struct DataSplit {
    pub train: Vec<DatasetRecord>,
    pub test: Vec<DatasetRecord>,
}

/// Read every row of a sanitized dataset.
pub fn load_records(path: &Path) -> Result<Vec<DatasetRecord>> {
    if !path.exists() {
        bail!(
            "Dataset not found: {} (run 'banpl-prepare prepare' first)",
            path.display()
        );
    }

    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed opening dataset {}", path.display()))?;
    let mut records = Vec::new();
    for (row, record) in reader.deserialize::<DatasetRecord>().enumerate() {
        // Row numbers are 1-based and skip the header line.
        let record =
            record.with_context(|| format!("Invalid row {} in {}", row + 2, path.display()))?;
        records.push(record);
    }
    Ok(records)
}

/// Deterministic Fisher-Yates shuffle.
pub fn shuffle<T>(items: &mut [T], seed: u64) {
    let mut rng = oorandom::Rand64::new(u128::from(seed));
    for i in (1..items.len()).rev() {
        let j = rng.rand_range(0..(i as u64 + 1)) as usize;
        items.swap(i, j);
    }
}

/// Keep `round(len * fraction)` randomly chosen records.
pub fn sample(mut records: Vec<DatasetRecord>, fraction: f64, seed: u64) -> Vec<DatasetRecord> {
    if fraction >= 1.0 {
        return records;
    }
    let keep = (records.len() as f64 * fraction).round() as usize;
    shuffle(&mut records, seed);
    records.truncate(keep);
    records
}

/// Shuffle and split so that `ceil(len * test_size)` records land in `test`.
pub fn train_test_split(
    mut records: Vec<DatasetRecord>,
    test_size: f64,
    seed: u64,
) -> Result<DataSplit> {
    if records.is_empty() {
        bail!("Cannot split an empty dataset");
    }
    let n_test = (records.len() as f64 * test_size).ceil() as usize;
    if n_test >= records.len() {
        bail!(
            "test_size={} leaves no training rows out of {}",
            test_size,
            records.len()
        );
    }

    shuffle(&mut records, seed);
    let test = records.split_off(records.len() - n_test);
    Ok(DataSplit {
        train: records,
        test,
    })
}

/// Index order for one epoch, reshuffled from `seed + epoch`.
pub fn epoch_order(len: usize, seed: u64, epoch: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..len).collect();
    shuffle(&mut order, seed.wrapping_add(epoch as u64));
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use banpl_core::Label;
    use std::fs;
    use tempfile::TempDir;

    fn records(n: usize) -> Vec<DatasetRecord> {
        (0..n)
            .map(|i| DatasetRecord {
                text: format!("tekst {i}"),
                labels: if i % 3 == 0 { Label::Harmful } else { Label::NonHarmful },
                reason: None,
            })
            .collect()
    }

    #[test]
    fn test_split_sizes() {
        let split = train_test_split(records(101), 0.2, 42).expect("split");
        assert_eq!(split.test.len(), 21);
        assert_eq!(split.train.len(), 80);
    }

    #[test]
    fn test_split_is_deterministic_per_seed() {
        let a = train_test_split(records(50), 0.2, 42).expect("split");
        let b = train_test_split(records(50), 0.2, 42).expect("split");
        let c = train_test_split(records(50), 0.2, 7).expect("split");
        assert_eq!(a.test, b.test);
        assert_ne!(a.test, c.test);
    }

    #[test]
    fn test_split_partitions_all_rows() {
        let split = train_test_split(records(30), 0.25, 1).expect("split");
        let mut texts: Vec<String> = split
            .train
            .iter()
            .chain(split.test.iter())
            .map(|r| r.text.clone())
            .collect();
        texts.sort();
        let mut expected: Vec<String> = records(30).into_iter().map(|r| r.text).collect();
        expected.sort();
        assert_eq!(texts, expected);
    }

    #[test]
    fn test_split_rejects_degenerate_input() {
        assert!(train_test_split(Vec::new(), 0.2, 42).is_err());
        assert!(train_test_split(records(1), 0.2, 42).is_err());
    }

    #[test]
    fn test_sample_fraction() {
        assert_eq!(sample(records(1000), 0.01, 42).len(), 10);
        assert_eq!(sample(records(7), 1.0, 42), records(7));
    }

    #[test]
    fn test_epoch_order_changes_between_epochs() {
        let first = epoch_order(20, 42, 0);
        let second = epoch_order(20, 42, 1);
        assert_ne!(first, second);
        let mut sorted = second.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_load_records() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("BAN-PL_1.csv");
        fs::write(&path, "text,labels\nhej,0\nspadaj,1\n").expect("write");

        let rows = load_records(&path).expect("rows");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].labels, Label::Harmful);

        fs::write(&path, "text,labels\nhej,5\n").expect("write");
        let err = load_records(&path).unwrap_err();
        assert!(format!("{err:#}").contains("row 2"));

        assert!(load_records(&tmp.path().join("missing.csv")).is_err());
    }
}
