use crate::cli::InputArgs;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

pub const CELL: &str = "20,22,24,90,90,90";

/// Writes a P 1 reflection table with `FC`, `PHIC`, `FP` and `SIGFP` columns where
/// `FP = 2 FC exp(-10 stol²)`.
pub fn write_reflections(dir: &Path) -> PathBuf {
    let path = dir.join("reflections.csv");
    let mut content = String::from("H,K,L,FC:F,PHIC:P,FP:F,SIGFP:Q\n");
    for h in 0..=3 {
        for k in 0..=3 {
            for l in 0..=3 {
                if h == 0 && k == 0 && l == 0 {
                    continue;
                }
                let stol2 = 0.25
                    * ((h as f64 / 20.0).powi(2)
                        + (k as f64 / 22.0).powi(2)
                        + (l as f64 / 24.0).powi(2));
                let fc = 10.0 + h as f64 + 2.0 * k as f64 + 3.0 * l as f64;
                let phic = (37 * h + 11 * k + 5 * l) % 360;
                let fp = 2.0 * fc * (-10.0 * stol2).exp();
                writeln!(content, "{},{},{},{},{},{},1.0", h, k, l, fc, phic, fp).unwrap();
            }
        }
    }
    std::fs::write(&path, content).unwrap();
    path
}

pub fn input_args(input: PathBuf) -> InputArgs {
    InputArgs {
        input,
        config: None,
        cell: Some(CELL.to_string()),
        space_group: Some("P 1".to_string()),
        set_values: vec![],
    }
}
