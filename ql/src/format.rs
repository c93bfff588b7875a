use num_format::{CustomFormat, Grouping};

/// Number format for log output, e.g. `1_234_567`
pub fn number_format() -> CustomFormat {
    CustomFormat::builder()
        .grouping(Grouping::Standard)
        .minus_sign("-")
        .separator("_")
        .build()
        .unwrap()
}
