//! Decoder for the kernel pressure-stall information (PSI) text format.
//!
//! ```text
//! some avg10=0.12 avg60=0.30 avg300=0.25 total=123456
//! full avg10=0.00 avg60=0.10 avg300=0.05 total=45678
//! ```
//!
//! The first byte of a line selects the category (`s` or `f`). Fields are
//! consumed positionally: three averages, then the cumulative `total` in
//! microseconds. Anything else after `total` is ignored. The `full` line is
//! optional (older kernels omit it for `cpu`).

use std::borrow::Cow;

use thiserror::Error;

use super::report::{parse_finite, Report};

/// Stall category of a PSI line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PsiCategory {
    Some,
    Full,
}

impl PsiCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PsiCategory::Some => "some",
            PsiCategory::Full => "full",
        }
    }
}

/// Values of one PSI line.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PsiMetrics {
    pub avg10: f64,
    pub avg60: f64,
    pub avg300: f64,
    pub total: u64,
}

/// Decoded content of one `/proc/pressure/<kind>` file.
///
/// A category is `None` when its line was absent; absent is never reported as zeros.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Psi {
    pub some: Option<PsiMetrics>,
    pub full: Option<PsiMetrics>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PsiDecodeError {
    #[error("empty pressure stall input")]
    Empty,

    #[error("unknown pressure category {found:?} on line {line}")]
    UnknownCategory { line: usize, found: char },

    #[error("missing field '{field}' in '{category}' line")]
    MissingField {
        category: &'static str,
        field: &'static str,
    },

    #[error("expected field '{expected}' in '{category}' line, found '{found}'")]
    UnexpectedField {
        category: &'static str,
        expected: &'static str,
        found: String,
    },

    #[error("invalid number '{value}' for field '{field}' in '{category}' line")]
    InvalidNumber {
        category: &'static str,
        field: &'static str,
        value: String,
    },
}

const AVG_FIELDS: [&str; 3] = ["avg10", "avg60", "avg300"];
const TOTAL_FIELD: &str = "total";

/// Decodes a whole PSI file.
pub fn decode(input: &str) -> Result<Psi, PsiDecodeError> {
    if input.trim().is_empty() {
        return Err(PsiDecodeError::Empty);
    }

    let mut psi = Psi::default();
    for (index, line) in input.lines().enumerate() {
        if line.is_empty() {
            continue;
        }

        let category = match line.as_bytes()[0] {
            b's' => PsiCategory::Some,
            b'f' => PsiCategory::Full,
            _ => {
                return Err(PsiDecodeError::UnknownCategory {
                    line: index + 1,
                    found: line.chars().next().unwrap_or_default(),
                })
            }
        };

        let metrics = decode_line(category, line)?;
        match category {
            PsiCategory::Some => psi.some = Some(metrics),
            PsiCategory::Full => psi.full = Some(metrics),
        }
    }

    Ok(psi)
}

fn decode_line(category: PsiCategory, line: &str) -> Result<PsiMetrics, PsiDecodeError> {
    let name = category.as_str();
    // The category word itself is not part of the fields.
    let mut tokens = line.split_ascii_whitespace().skip(1);

    let mut avgs = [0.0f64; 3];
    for (slot, field) in avgs.iter_mut().zip(AVG_FIELDS) {
        let raw = next_field(&mut tokens, name, field)?;
        *slot = parse_finite(raw).ok_or_else(|| PsiDecodeError::InvalidNumber {
            category: name,
            field,
            value: raw.to_string(),
        })?;
    }

    let raw = next_field(&mut tokens, name, TOTAL_FIELD)?;
    let total = raw.parse().map_err(|_| PsiDecodeError::InvalidNumber {
        category: name,
        field: TOTAL_FIELD,
        value: raw.to_string(),
    })?;

    Ok(PsiMetrics {
        avg10: avgs[0],
        avg60: avgs[1],
        avg300: avgs[2],
        total,
    })
}

/// Takes the next `key=value` token and checks its key.
fn next_field<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
    category: &'static str,
    field: &'static str,
) -> Result<&'a str, PsiDecodeError> {
    let token = tokens
        .next()
        .ok_or(PsiDecodeError::MissingField { category, field })?;

    match token.split_once('=') {
        Some((key, value)) if key == field => Ok(value),
        _ => Err(PsiDecodeError::UnexpectedField {
            category,
            expected: field,
            found: token.to_string(),
        }),
    }
}

/// Maps a decoded PSI file for `kind` into reports.
///
/// Only categories present in the input produce reports, four each:
/// `psi_<kind>_<category>_<avg10|avg60|avg300|total>`.
pub fn reports(kind: &str, psi: &Psi) -> Vec<Report> {
    let mut out = Vec::with_capacity(8);
    for (category, metrics) in [(PsiCategory::Some, psi.some), (PsiCategory::Full, psi.full)] {
        let Some(metrics) = metrics else {
            continue;
        };
        let prefix = format!("psi_{}_{}", kind, category.as_str());
        for (field, value) in AVG_FIELDS
            .iter()
            .zip([metrics.avg10, metrics.avg60, metrics.avg300])
        {
            out.push(Report::new(format!("{prefix}_{field}"), value).with_unit(Cow::Borrowed("%")));
        }
        out.push(
            Report::new(format!("{prefix}_{TOTAL_FIELD}"), metrics.total)
                .with_device_class("duration")
                .with_unit("μs"),
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::report::MetricValue;

    const MEMORY: &str = "some avg10=1.50 avg60=2.25 avg300=0.10 total=500\n\
                          full avg10=0.00 avg60=0.00 avg300=0.00 total=0\n";

    #[test]
    fn test_decode_both_categories() {
        let psi = decode(MEMORY).unwrap();
        assert_eq!(
            psi.some,
            Some(PsiMetrics {
                avg10: 1.50,
                avg60: 2.25,
                avg300: 0.10,
                total: 500
            })
        );
        assert_eq!(psi.full, Some(PsiMetrics::default()));
    }

    #[test]
    fn test_memory_reports() {
        let psi = decode(MEMORY).unwrap();
        let reports = reports("memory", &psi);

        let names: Vec<_> = reports.iter().map(Report::name).collect();
        assert_eq!(
            names,
            [
                "psi_memory_some_avg10",
                "psi_memory_some_avg60",
                "psi_memory_some_avg300",
                "psi_memory_some_total",
                "psi_memory_full_avg10",
                "psi_memory_full_avg60",
                "psi_memory_full_avg300",
                "psi_memory_full_total",
            ]
        );
        assert_eq!(reports[0].value(), &MetricValue::Double(1.50));
        assert_eq!(reports[0].unit(), Some("%"));
        assert_eq!(reports[3].value(), &MetricValue::UnsignedLong(500));
        assert_eq!(reports[3].device_class(), Some("duration"));
        assert_eq!(reports[7].value(), &MetricValue::UnsignedLong(0));
    }

    #[test]
    fn test_missing_full_line() {
        let psi = decode("some avg10=1.0 avg60=1.0 avg300=1.0 total=10\n").unwrap();
        assert!(psi.some.is_some());
        assert!(psi.full.is_none());

        let reports = reports("cpu", &psi);
        assert_eq!(reports.len(), 4);
        assert!(reports.iter().all(|r| !r.name().contains("_full_")));
    }

    #[test]
    fn test_unknown_category() {
        let err = decode("xsome avg10=1.0 avg60=1.0 avg300=1.0 total=10\n").unwrap_err();
        assert_eq!(
            err,
            PsiDecodeError::UnknownCategory {
                line: 1,
                found: 'x'
            }
        );

        let err = decode("some avg10=1.0 avg60=1.0 avg300=1.0 total=10\nzzz\n").unwrap_err();
        assert!(matches!(err, PsiDecodeError::UnknownCategory { line: 2, .. }));
    }

    #[test]
    fn test_invalid_number() {
        let err = decode("some avg10=abc avg60=1.0 avg300=1.0 total=10\n").unwrap_err();
        assert_eq!(
            err,
            PsiDecodeError::InvalidNumber {
                category: "some",
                field: "avg10",
                value: "abc".into()
            }
        );

        let err = decode("some avg10=1.0 avg60=inf avg300=1.0 total=10\n").unwrap_err();
        assert!(matches!(
            err,
            PsiDecodeError::InvalidNumber { field: "avg60", .. }
        ));

        let err = decode("some avg10=1 avg60=1 avg300=1 total=1.5\n").unwrap_err();
        assert!(matches!(
            err,
            PsiDecodeError::InvalidNumber { field: "total", .. }
        ));
    }

    #[test]
    fn test_truncated_line() {
        let err = decode("full avg10=1.0 avg60=1.0\n").unwrap_err();
        assert_eq!(
            err,
            PsiDecodeError::MissingField {
                category: "full",
                field: "avg300"
            }
        );
    }

    #[test]
    fn test_fields_out_of_order() {
        let err = decode("some avg60=1.0 avg10=1.0 avg300=1.0 total=1\n").unwrap_err();
        assert!(matches!(
            err,
            PsiDecodeError::UnexpectedField {
                expected: "avg10",
                ..
            }
        ));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(decode(""), Err(PsiDecodeError::Empty));
        assert_eq!(decode("\n"), Err(PsiDecodeError::Empty));
    }

    #[test]
    fn test_no_trailing_newline_and_extra_spaces() {
        let psi = decode("some  avg10=5.25  avg60=6.35 avg300=4.20 total=12345").unwrap();
        assert_eq!(psi.some.unwrap().avg60, 6.35);
        assert_eq!(psi.some.unwrap().total, 12345);
    }
}
