//! Integration test: class balancers end-to-end

use polars::prelude::*;
use tabprep::balance::{OversamplingBalancer, SmoteBalancer, UndersamplingBalancer};
use tabprep::TabprepError;

fn frame_with_labels(counts: &[(i64, usize)]) -> DataFrame {
    let labels: Vec<i64> = counts
        .iter()
        .flat_map(|&(label, n)| std::iter::repeat(label).take(n))
        .collect();
    let x: Vec<f64> = (0..labels.len()).map(|i| (i as f64) * 0.37 % 11.0).collect();
    df!("x" => x, "y" => labels).unwrap()
}

fn label_counts(df: &DataFrame) -> Vec<(i64, usize)> {
    let ys: Vec<i64> = df
        .column("y")
        .unwrap()
        .i64()
        .unwrap()
        .into_iter()
        .flatten()
        .collect();
    let mut table = std::collections::BTreeMap::new();
    for y in ys {
        *table.entry(y).or_insert(0usize) += 1;
    }
    table.into_iter().collect()
}

#[test]
fn test_oversample_scenario() {
    // 100 zeros, 30 ones, 25 twos at ratio 0.5 -> 100 / 50 / 50
    let df = frame_with_labels(&[(0, 100), (1, 30), (2, 25)]);
    let out = OversamplingBalancer::new("y")
        .with_ratio(0.5)
        .with_seed(42)
        .balance(&df)
        .unwrap();
    assert_eq!(label_counts(&out), vec![(0, 100), (1, 50), (2, 50)]);
}

#[test]
fn test_undersample_scenario() {
    // 150 zeros, 30 ones, 10 twos at ratio 0.5 -> 60 / 30 / 10
    let df = frame_with_labels(&[(0, 150), (1, 30), (2, 10)]);
    let out = UndersamplingBalancer::new("y")
        .with_ratio(0.5)
        .with_seed(42)
        .balance(&df)
        .unwrap();
    assert_eq!(label_counts(&out), vec![(0, 60), (1, 30), (2, 10)]);
}

#[test]
fn test_smote_scenario() {
    let df = frame_with_labels(&[(0, 100), (1, 30), (2, 25)]);
    let out = SmoteBalancer::new("y")
        .with_ratio(0.5)
        .with_seed(42)
        .balance(&df)
        .unwrap();
    assert_eq!(label_counts(&out), vec![(0, 100), (1, 50), (2, 50)]);
}

#[test]
fn test_oversample_ratio_invariant() {
    let df = frame_with_labels(&[(0, 97), (1, 13), (2, 5), (3, 40)]);
    for ratio in [0.2, 0.5, 1.0] {
        let out = OversamplingBalancer::new("y")
            .with_ratio(ratio)
            .with_seed(1)
            .balance(&df)
            .unwrap();
        let counts = label_counts(&out);
        let majority = counts.iter().map(|&(_, n)| n).max().unwrap();
        for &(label, n) in &counts {
            // Every class ends at or above the ratio, within one rounding unit
            let reached = n as f64 / majority as f64;
            assert!(
                reached >= ratio - 1.0 / majority as f64,
                "class {} at {} of majority {} under ratio {}",
                label,
                n,
                majority,
                ratio
            );
        }
    }
}

#[test]
fn test_identity_when_already_balanced() {
    let df = frame_with_labels(&[(0, 40), (1, 30), (2, 25)]);
    for shuffle in [false, true] {
        let over = OversamplingBalancer::new("y")
            .with_ratio(0.5)
            .with_shuffle(shuffle)
            .with_seed(9)
            .balance(&df)
            .unwrap();
        let under = UndersamplingBalancer::new("y")
            .with_ratio(0.5)
            .with_shuffle(shuffle)
            .with_seed(9)
            .balance(&df)
            .unwrap();
        assert_eq!(label_counts(&over), vec![(0, 40), (1, 30), (2, 25)]);
        assert_eq!(label_counts(&under), vec![(0, 40), (1, 30), (2, 25)]);
        assert_eq!(over.height(), df.height());
        assert_eq!(under.height(), df.height());
    }
}

#[test]
fn test_singleton_asymmetry() {
    // One row of class 1: oversample warns and proceeds, SMOTE fails
    let df = frame_with_labels(&[(0, 20), (1, 1)]);

    let oversampled = OversamplingBalancer::new("y")
        .with_ratio(0.5)
        .with_seed(4)
        .balance(&df)
        .unwrap();
    assert_eq!(label_counts(&oversampled), vec![(0, 20), (1, 10)]);

    let smote = SmoteBalancer::new("y").with_ratio(0.5).with_seed(4).balance(&df);
    assert!(matches!(smote, Err(TabprepError::SamplingError(_))));
}

#[test]
fn test_input_frame_never_mutated() {
    let df = frame_with_labels(&[(0, 50), (1, 10)]);
    let before = df.clone();

    OversamplingBalancer::new("y").with_ratio(0.5).with_seed(2).balance(&df).unwrap();
    UndersamplingBalancer::new("y").with_ratio(0.9).with_seed(2).balance(&df).unwrap();
    SmoteBalancer::new("y").with_ratio(0.5).with_seed(2).balance(&df).unwrap();

    assert!(df.equals(&before));
}

#[test]
fn test_string_label_column() {
    let labels: Vec<&str> = std::iter::repeat("cat")
        .take(30)
        .chain(std::iter::repeat("dog").take(6))
        .collect();
    let x: Vec<f64> = (0..36).map(|i| i as f64).collect();
    let df = df!("x" => x, "y" => labels).unwrap();

    let out = OversamplingBalancer::new("y")
        .with_ratio(0.5)
        .with_seed(17)
        .balance(&df)
        .unwrap();
    let ys: Vec<String> = out
        .column("y")
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .map(|v| v.unwrap().to_string())
        .collect();
    assert_eq!(ys.iter().filter(|y| y.as_str() == "dog").count(), 15);
    assert_eq!(ys.iter().filter(|y| y.as_str() == "cat").count(), 30);
}

#[test]
fn test_smote_preserves_label_dtype() {
    let df = frame_with_labels(&[(0, 40), (1, 8)]);
    let out = SmoteBalancer::new("y")
        .with_ratio(0.5)
        .with_seed(5)
        .balance(&df)
        .unwrap();
    assert_eq!(out.column("y").unwrap().dtype(), &DataType::Int64);
    assert_eq!(label_counts(&out), vec![(0, 40), (1, 20)]);
}
