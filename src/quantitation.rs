//! Guesses quantitation-type parameters from a column's name, description and the
//! values it holds. GEO column descriptions are free text, so every rule here is a heuristic.

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::PrimitiveType;
use crate::model::{GeneralType, QuantitationType, ScaleType, StandardType};

const PREFERRED_NAME: &str = "VALUE";

static PRESENT_ABSENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(ABS_CALL|DETECTION|DETECTION[ _]CALL|PRESENT[ _]?ABSENT)$|present/absent")
        .expect("valid present/absent pattern")
});
static CONFIDENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)p[ _-]?val|detection[ _]p|\bpval\b|\bconfidence\b")
        .expect("valid confidence pattern")
});
static COUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bcount(s)?\b|^(NUM|N)_|number of|\bpixels\b").expect("valid count pattern")
});
static RATIO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)ratio|fold[ _-]?change").expect("valid ratio pattern"));
static BACKGROUND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)background|(^|_)BKD?(_|$)|(^|_)BG(_|$)").expect("valid background pattern")
});
static BACKGROUND_SUBTRACTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)background[ _-]?(subtracted|corrected)|minus background|_(NET|CORR)$")
        .expect("valid background subtracted pattern")
});
static LOG2: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)log[ _-]?(base[ _-]?)?2|\blog2\b").expect("valid log2 pattern"));
static LOG10: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)log[ _-]?(base[ _-]?)?10|\blog10\b").expect("valid log10 pattern")
});
static LN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)natural log|\bln\b").expect("valid ln pattern"));
static UNSPECIFIED_LOG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\blog").expect("valid log pattern"));
static PERCENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)percent|%").expect("valid percent pattern"));

/// Builds a quantitation type for a data column. `values` are the column's present cells,
/// the first of them taken as its example.
pub fn guess(name: &str, description: &str, values: &[&str]) -> QuantitationType {
    let text = format!("{name} {description}");
    let representation = representation(name, description, values);

    let standard_type = if PRESENT_ABSENT.is_match(name) || PRESENT_ABSENT.is_match(description) {
        StandardType::PresentAbsent
    } else if CONFIDENCE.is_match(&text) {
        StandardType::ConfidenceIndicator
    } else if RATIO.is_match(&text) {
        StandardType::Ratio
    } else if COUNT.is_match(&text) {
        StandardType::Count
    } else if matches!(representation, PrimitiveType::String | PrimitiveType::Boolean) {
        StandardType::Other
    } else {
        StandardType::Amount
    };

    let general_type = match (standard_type, representation) {
        (StandardType::PresentAbsent, _) | (_, PrimitiveType::String | PrimitiveType::Boolean) => {
            GeneralType::Categorical
        }
        _ => GeneralType::Quantitative,
    };

    let scale = if general_type == GeneralType::Categorical {
        ScaleType::Other
    } else if LOG2.is_match(&text) {
        ScaleType::Log2
    } else if LOG10.is_match(&text) {
        ScaleType::Log10
    } else if LN.is_match(&text) {
        ScaleType::Ln
    } else if UNSPECIFIED_LOG.is_match(&text) {
        // Unqualified "log" in GEO descriptions is overwhelmingly base 2.
        ScaleType::Log2
    } else if PERCENT.is_match(&text) {
        ScaleType::Percent
    } else {
        ScaleType::Linear
    };

    let is_background_subtracted = BACKGROUND_SUBTRACTED.is_match(&text);
    QuantitationType {
        name: name.to_string(),
        description: description.to_string(),
        representation,
        general_type,
        standard_type,
        scale,
        is_background: !is_background_subtracted && BACKGROUND.is_match(name),
        is_background_subtracted,
        is_ratio: standard_type == StandardType::Ratio,
        is_preferred: name.trim().eq_ignore_ascii_case(PREFERRED_NAME),
    }
}

/// Storage type for the column. The first present value picks the family; integer storage
/// is kept for count columns whose every value is a whole number.
pub fn representation(name: &str, description: &str, values: &[&str]) -> PrimitiveType {
    if PRESENT_ABSENT.is_match(name) {
        return PrimitiveType::String;
    }
    let mut present = values
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .peekable();
    let Some(example) = present.peek().copied() else {
        return PrimitiveType::Double;
    };

    if example.parse::<f64>().is_ok() {
        let counts = COUNT.is_match(name) || COUNT.is_match(description);
        if counts
            && !name.trim().eq_ignore_ascii_case(PREFERRED_NAME)
            && present.all(|value| value.parse::<i32>().is_ok())
        {
            PrimitiveType::Int
        } else {
            PrimitiveType::Double
        }
    } else if example.eq_ignore_ascii_case("true") || example.eq_ignore_ascii_case("false") {
        PrimitiveType::Boolean
    } else {
        PrimitiveType::String
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("VALUE", "MAS5 signal", &["1234.5"], PrimitiveType::Double)]
    #[case("VALUE", "RMA", &["12"], PrimitiveType::Double)]
    #[case("PIXELS", "number of pixels", &["80", "95"], PrimitiveType::Int)]
    #[case("PIXELS", "", &["80"], PrimitiveType::Int)]
    #[case("CH1_SIGNAL", "raw signal", &["120", "3.5"], PrimitiveType::Double)]
    #[case("CH1_SIGNAL", "raw signal", &["120", "95"], PrimitiveType::Double)]
    #[case("NUM_SPOTS", "", &["4", "2.5"], PrimitiveType::Double)]
    #[case("ABS_CALL", "", &["P"], PrimitiveType::String)]
    #[case("FLAG", "", &["", "true"], PrimitiveType::Boolean)]
    #[case("VALUE", "", &[], PrimitiveType::Double)]
    fn representation_from_values(
        #[case] name: &str,
        #[case] description: &str,
        #[case] values: &[&str],
        #[case] expected: PrimitiveType,
    ) {
        assert_eq!(guess(name, description, values).representation, expected);
    }

    #[test]
    fn whole_first_value_keeps_later_fractions() {
        let values = ["120", "3.5"];
        let qt = guess("CH1_SIGNAL", "raw signal", &values);
        let cells: Vec<Option<&str>> = values.iter().copied().map(Some).collect();
        let payload = crate::codec::encode(&cells, qt.representation).unwrap().unwrap();
        assert_eq!(
            crate::codec::decode(&payload, qt.representation).unwrap(),
            crate::codec::DecodedValues::Double(vec![120.0, 3.5])
        );
    }

    #[test]
    fn detection_call_is_present_absent() {
        let qt = guess("ABS_CALL", "the call in an absolute analysis", &["P"]);
        assert_eq!(qt.standard_type, StandardType::PresentAbsent);
        assert_eq!(qt.general_type, GeneralType::Categorical);
        assert!(!qt.is_preferred);
    }

    #[test]
    fn detection_p_value_is_confidence() {
        let qt = guess("DETECTION P-VALUE", "p-value of the detection call", &["0.01"]);
        assert_eq!(qt.standard_type, StandardType::ConfidenceIndicator);
        assert_eq!(qt.general_type, GeneralType::Quantitative);
    }

    #[test]
    fn log_ratio_value() {
        let qt = guess("VALUE", "normalized log2 ratio Cy5/Cy3", &["-0.53"]);
        assert!(qt.is_preferred);
        assert!(qt.is_ratio);
        assert_eq!(qt.scale, ScaleType::Log2);
        assert_eq!(qt.standard_type, StandardType::Ratio);
    }

    #[test]
    fn background_columns() {
        let raw = guess("CH1_BKD_MEDIAN", "channel 1 background median", &["110"]);
        assert!(raw.is_background);
        assert!(!raw.is_background_subtracted);
        let net = guess("CH1_NET", "channel 1 median minus background", &["900"]);
        assert!(net.is_background_subtracted);
        assert!(!net.is_background);
    }

    #[test]
    fn plain_signal_is_linear_amount() {
        let qt = guess("VALUE", "MAS5 signal intensity", &["523.1"]);
        assert_eq!(qt.scale, ScaleType::Linear);
        assert_eq!(qt.standard_type, StandardType::Amount);
    }
}
