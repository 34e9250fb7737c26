//! Shared fixtures for integration tests

use std::fmt::Write as _;
use std::io::Write;
use tempfile::NamedTempFile;

const REGIONS: [&str; 4] = ["northeast", "northwest", "southeast", "southwest"];

/// Deterministic insurance-like table: charges are linear in the attributes
/// plus a small bounded wobble.
pub fn insurance_csv(n_rows: usize) -> String {
    let mut csv = String::from("age,sex,bmi,children,smoker,region,charges\n");
    for i in 0..n_rows {
        let age = 18 + (i * 7) % 47;
        let sex = if i % 2 == 0 { "female" } else { "male" };
        let bmi = 18.5 + ((i * 13) % 23) as f64 * 0.75;
        let children = (i * 3) % 4;
        let smoker = if i % 5 == 0 { "yes" } else { "no" };
        let region = REGIONS[(i * 3) % 4];

        let wobble = ((i * 37) % 11) as f64 * 40.0;
        let charges = 250.0 * age as f64
            + 320.0 * bmi
            + 475.0 * children as f64
            + if smoker == "yes" { 23_000.0 } else { 0.0 }
            + wobble
            - 2_000.0;

        writeln!(
            csv,
            "{},{},{:.2},{},{},{},{:.2}",
            age, sex, bmi, children, smoker, region, charges
        )
        .unwrap();
    }
    csv
}

pub fn write_csv(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

pub fn insurance_file(n_rows: usize) -> NamedTempFile {
    write_csv(&insurance_csv(n_rows))
}
