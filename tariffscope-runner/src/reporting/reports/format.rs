//! Shared value formatting for reports and charts.
//!
//! Undefined values always render as `N/A`, never as `0.00`.

use tariffscope_core::{Metric, UndefinedReason};

pub const NOT_AVAILABLE: &str = "N/A";

/// `+1.67%` for positive changes, `-3.20%` / `0.00%` otherwise, `N/A` when undefined.
pub fn fmt_pct(metric: &Metric) -> String {
    match metric.value() {
        Some(v) if v > 0.0 => format!("+{v:.2}%"),
        Some(v) => format!("{v:.2}%"),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Two-decimal value, `N/A` for `None`.
pub fn fmt_value(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.2}"),
        None => NOT_AVAILABLE.to_string(),
    }
}

pub fn fmt_metric(metric: &Metric) -> String {
    fmt_value(metric.value())
}

/// Escape text for HTML and SVG output.
pub fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Machine-readable status: `ok` or the snake_case undefined reason.
pub fn status_code(metric: &Metric) -> &'static str {
    match metric {
        Metric::Defined(_) => "ok",
        Metric::Undefined(reason) => match reason {
            UndefinedReason::MissingExport => "missing_export",
            UndefinedReason::MissingImport => "missing_import",
            UndefinedReason::NoData => "no_data",
            UndefinedReason::ZeroBaseline => "zero_baseline",
            UndefinedReason::UndefinedOperand => "undefined_operand",
            UndefinedReason::NoDefinedBalance => "no_defined_balance",
            UndefinedReason::Overflow => "overflow",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pct_sign_rules() {
        assert_eq!(fmt_pct(&Metric::Defined(1.6666)), "+1.67%");
        assert_eq!(fmt_pct(&Metric::Defined(-3.2)), "-3.20%");
        assert_eq!(fmt_pct(&Metric::Defined(0.0)), "0.00%");
    }

    #[test]
    fn undefined_is_never_zero() {
        let m = Metric::Undefined(UndefinedReason::ZeroBaseline);
        assert_eq!(fmt_pct(&m), "N/A");
        assert_eq!(fmt_metric(&m), "N/A");
        assert_eq!(status_code(&m), "zero_baseline");
    }

    #[test]
    fn status_codes_match_serde_names() {
        for reason in [
            UndefinedReason::MissingExport,
            UndefinedReason::MissingImport,
            UndefinedReason::NoData,
            UndefinedReason::ZeroBaseline,
            UndefinedReason::UndefinedOperand,
            UndefinedReason::NoDefinedBalance,
            UndefinedReason::Overflow,
        ] {
            let json = serde_json::to_string(&reason).unwrap();
            assert_eq!(json.trim_matches('"'), status_code(&Metric::Undefined(reason)));
        }
    }
}
