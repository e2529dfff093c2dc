use std::collections::HashSet;
use std::fmt;

use serde::Serialize;
use toml::Value;

use crate::diagnostics::DiagnosticSink;

/// Keys accepted at the top level of a schema file.
const SCHEMA_KEYS: &[&str] = &["start_param", "params"];
/// Keys accepted inside a `[[params]]` table.
const PARAM_KEYS: &[&str] = &["name", "type", "unique", "range"];

/// Cell type a parameter declares for its column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Int,
    Float,
}

impl ParamType {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "string" => Some(Self::String),
            "int" => Some(Self::Int),
            "float" => Some(Self::Float),
            _ => None,
        }
    }

    /// Whether a raw cell would convert to this type. Numeric parsing is
    /// locale-invariant (`str::parse` on the trimmed cell); strings always
    /// convert.
    pub fn accepts(&self, cell: &str) -> bool {
        match self {
            Self::String => true,
            Self::Int => cell.trim().parse::<i64>().is_ok(),
            Self::Float => cell.trim().parse::<f64>().is_ok(),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Float => "float",
        })
    }
}

/// Inclusive bounds for a numeric parameter. The variant always matches the
/// parameter's declared type; `Schema` loading enforces that.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RangeBounds {
    Int { min: i64, max: i64 },
    Float { min: f64, max: f64 },
}

/// Verdict of checking one cell against a range constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeCheck {
    Pass,
    OutOfBounds,
    /// The cell does not parse as the bound type, so no bound check applies.
    Unparseable,
}

impl RangeBounds {
    /// Check a raw cell against the bounds. Both ends are inclusive:
    /// `min <= value <= max` passes.
    pub fn check(&self, cell: &str) -> RangeCheck {
        match self {
            RangeBounds::Int { min, max } => match cell.trim().parse::<i64>() {
                Ok(v) if (*min..=*max).contains(&v) => RangeCheck::Pass,
                Ok(_) => RangeCheck::OutOfBounds,
                Err(_) => RangeCheck::Unparseable,
            },
            RangeBounds::Float { min, max } => match cell.trim().parse::<f64>() {
                Ok(v) if *min <= v && v <= *max => RangeCheck::Pass,
                Ok(_) => RangeCheck::OutOfBounds,
                Err(_) => RangeCheck::Unparseable,
            },
        }
    }
}

impl fmt::Display for RangeBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeBounds::Int { min, max } => write!(f, "[{min}, {max}]"),
            RangeBounds::Float { min, max } => write!(f, "[{min}, {max}]"),
        }
    }
}

/// Canonical 7-significant-digit rendering of a float bound.
///
/// Degenerate float ranges are detected by comparing these renderings, not
/// the raw values, so bounds that differ only by representation noise (for
/// example `1.0` vs `1.00000001`) are still rejected as equal.
fn sig7(v: f64) -> String {
    format!("{v:.6e}")
}

/// One named, typed field defined by the schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub ty: ParamType,
    pub unique: bool,
    /// Present only for `int`/`float` parameters.
    pub range: Option<RangeBounds>,
}

/// The declarative contract a table must satisfy: where the header row sits
/// and which parameters the columns carry.
#[derive(Debug, Clone)]
pub struct Schema {
    /// Schema file name, used to attribute diagnostics.
    pub source: String,
    /// 1-based row index of the header row. `0` is the invalid sentinel used
    /// when `start_param` was missing or malformed (an error has been
    /// recorded in that case and the run aborts at the next flush).
    pub header_row: u32,
    pub params: Vec<Parameter>,
}

impl Schema {
    /// Build a schema from a parsed TOML tree, recording every violation in
    /// `sink`. Always returns a best-effort schema; malformed input never
    /// panics or returns early, so all problems surface together.
    pub fn from_toml(source: &str, root: &Value, sink: &mut DiagnosticSink) -> Schema {
        let mut schema = Schema {
            source: source.to_string(),
            header_row: 0,
            params: Vec::new(),
        };

        let Some(table) = root.as_table() else {
            sink.error(format!("{source}: schema root must be a table"));
            return schema;
        };

        match table.get("start_param") {
            Some(value) => match value.as_integer().and_then(|i| u32::try_from(i).ok()) {
                Some(row) if row >= 1 => schema.header_row = row,
                _ => sink.error(format!(
                    "{source}: start_param must be a positive integer (1-based header row)"
                )),
            },
            None => sink.error(format!("{source}: missing required key `start_param`")),
        }

        match table.get("params") {
            Some(Value::Array(entries)) => {
                for (idx, entry) in entries.iter().enumerate() {
                    match entry.as_table() {
                        Some(param) => {
                            schema.params.push(parse_parameter(source, idx, param, sink));
                        }
                        None => sink.error(format!("{source}: params[{idx}] must be a table")),
                    }
                }
            }
            Some(_) => sink.error(format!("{source}: `params` must be an array of tables")),
            None => sink.error(format!("{source}: missing required key `params`")),
        }

        for key in table.keys() {
            if !SCHEMA_KEYS.contains(&key.as_str()) {
                sink.error(format!("{source}: unknown key `{key}`"));
            }
        }

        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for param in &schema.params {
            if !seen.insert(param.name.as_str()) && !duplicates.contains(&param.name.as_str()) {
                duplicates.push(param.name.as_str());
            }
        }
        if !duplicates.is_empty() {
            sink.error(format!(
                "{source}: duplicate parameter names: {}",
                duplicates.join(", ")
            ));
        }

        schema
    }

    /// Look up a parameter by name.
    pub fn param(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.name == name)
    }
}

fn parse_parameter(
    source: &str,
    idx: usize,
    table: &toml::map::Map<String, Value>,
    sink: &mut DiagnosticSink,
) -> Parameter {
    let name = match table.get("name").and_then(Value::as_str) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => {
            sink.error(format!(
                "{source}: params[{idx}]: `name` is required and must be a non-empty string"
            ));
            String::new()
        }
    };

    // `string` is the fallback when `type` is bad; the recorded error aborts
    // the run before the fallback could matter.
    let ty = match table.get("type") {
        Some(value) => match value.as_str().and_then(ParamType::parse) {
            Some(ty) => ty,
            None => {
                sink.error(format!(
                    "{source}: params[{idx}]: `type` must be one of string, int, float"
                ));
                ParamType::String
            }
        },
        None => {
            sink.error(format!("{source}: params[{idx}]: missing required key `type`"));
            ParamType::String
        }
    };

    let unique = match table.get("unique") {
        Some(value) => value.as_bool().unwrap_or_else(|| {
            sink.error(format!("{source}: params[{idx}]: `unique` must be a boolean"));
            false
        }),
        None => false,
    };

    let range = table
        .get("range")
        .and_then(|value| parse_range(source, &name, ty, value, sink));

    for key in table.keys() {
        if !PARAM_KEYS.contains(&key.as_str()) {
            sink.error(format!("{source}: params[{idx}]: unknown key `{key}`"));
        }
    }

    Parameter {
        name,
        ty,
        unique,
        range,
    }
}

fn parse_range(
    source: &str,
    name: &str,
    ty: ParamType,
    value: &Value,
    sink: &mut DiagnosticSink,
) -> Option<RangeBounds> {
    let Some(table) = value.as_table() else {
        sink.error(format!("{source}: parameter `{name}`: `range` must be a table"));
        return None;
    };
    if !table.contains_key("min") || !table.contains_key("max") {
        sink.error(format!(
            "{source}: parameter `{name}`: range requires both `min` and `max`"
        ));
        return None;
    }

    match ty {
        ParamType::Int => {
            let (min, max) = match (
                table.get("min").and_then(Value::as_integer),
                table.get("max").and_then(Value::as_integer),
            ) {
                (Some(min), Some(max)) => (min, max),
                _ => {
                    sink.error(format!(
                        "{source}: parameter `{name}`: range bounds for an int parameter must be integers"
                    ));
                    return None;
                }
            };
            if min == max {
                sink.error(format!(
                    "{source}: parameter `{name}`: range min and max are equal"
                ));
            }
            Some(RangeBounds::Int { min, max })
        }
        ParamType::Float => {
            let (min, max) = match (float_bound(table.get("min")), float_bound(table.get("max"))) {
                (Some(min), Some(max)) => (min, max),
                _ => {
                    sink.error(format!(
                        "{source}: parameter `{name}`: range bounds must be numbers"
                    ));
                    return None;
                }
            };
            if sig7(min) == sig7(max) {
                sink.error(format!(
                    "{source}: parameter `{name}`: range min and max are equal"
                ));
            }
            Some(RangeBounds::Float { min, max })
        }
        ParamType::String => {
            sink.error(format!(
                "{source}: parameter `{name}`: range is only valid for int and float parameters"
            ));
            None
        }
    }
}

/// Float bounds may be written as either a TOML float or a TOML integer.
fn float_bound(value: Option<&Value>) -> Option<f64> {
    match value {
        Some(Value::Float(f)) => Some(*f),
        Some(Value::Integer(i)) => Some(*i as f64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::SinkState;

    fn load(text: &str) -> (Schema, DiagnosticSink) {
        let root: Value = text.parse().expect("test schema must be valid TOML");
        let mut sink = DiagnosticSink::new();
        let schema = Schema::from_toml("item.toml", &root, &mut sink);
        (schema, sink)
    }

    fn error_messages(sink: &DiagnosticSink) -> Vec<String> {
        sink.pending()
            .filter(|d| d.severity == crate::Severity::Error)
            .map(|d| d.message.clone())
            .collect()
    }

    #[test]
    fn well_formed_schema_loads_clean() {
        let (schema, sink) = load(
            r#"
            start_param = 4

            [[params]]
            name = "id"
            type = "int"
            unique = true

            [[params]]
            name = "hp"
            type = "float"

            [params.range]
            min = 0.5
            max = 99
            "#,
        );
        assert_eq!(sink.state(), SinkState::Clean);
        assert_eq!(schema.header_row, 4);
        assert_eq!(schema.params.len(), 2);
        assert!(schema.param("id").unwrap().unique);
        assert_eq!(
            schema.param("hp").unwrap().range,
            Some(RangeBounds::Float { min: 0.5, max: 99.0 })
        );
    }

    #[test]
    fn missing_start_param_leaves_sentinel_and_errors() {
        let (schema, sink) = load(
            r#"
            [[params]]
            name = "id"
            type = "int"
            "#,
        );
        assert_eq!(schema.header_row, 0);
        assert_eq!(
            error_messages(&sink),
            vec!["item.toml: missing required key `start_param`"]
        );
    }

    #[test]
    fn non_positive_start_param_is_rejected() {
        let (schema, sink) = load("start_param = 0\nparams = []");
        assert_eq!(schema.header_row, 0);
        assert!(error_messages(&sink)
            .iter()
            .any(|m| m.contains("start_param must be a positive integer")));
    }

    #[test]
    fn missing_params_yields_empty_list_but_keeps_going() {
        let (schema, sink) = load("start_param = 2\ntitle = \"oops\"");
        assert!(schema.params.is_empty());
        let errors = error_messages(&sink);
        // Both problems are reported in the same pass.
        assert!(errors.iter().any(|m| m.contains("missing required key `params`")));
        assert!(errors.iter().any(|m| m.contains("unknown key `title`")));
    }

    #[test]
    fn unknown_parameter_key_names_the_key() {
        let (_, sink) = load(
            r#"
            start_param = 1

            [[params]]
            name = "id"
            type = "int"
            uniqe = true
            "#,
        );
        assert!(error_messages(&sink)
            .iter()
            .any(|m| m.contains("params[0]: unknown key `uniqe`")));
    }

    #[test]
    fn duplicate_parameter_names_are_aggregated() {
        let (_, sink) = load(
            r#"
            start_param = 1

            [[params]]
            name = "id"
            type = "int"

            [[params]]
            name = "id"
            type = "string"

            [[params]]
            name = "hp"
            type = "int"

            [[params]]
            name = "hp"
            type = "int"
            "#,
        );
        assert_eq!(
            error_messages(&sink),
            vec!["item.toml: duplicate parameter names: id, hp"]
        );
    }

    #[test]
    fn degenerate_int_range_is_rejected_at_load() {
        let (_, sink) = load(
            r#"
            start_param = 1

            [[params]]
            name = "lv"
            type = "int"

            [params.range]
            min = 5
            max = 5
            "#,
        );
        assert!(error_messages(&sink)
            .iter()
            .any(|m| m.contains("range min and max are equal")));
    }

    #[test]
    fn degenerate_float_range_uses_seven_digit_rendering() {
        // The bounds differ in the 9th significant digit; the canonical
        // 7-digit rendering treats them as equal.
        let (_, sink) = load(
            r#"
            start_param = 1

            [[params]]
            name = "rate"
            type = "float"

            [params.range]
            min = 1.00000001
            max = 1.00000002
            "#,
        );
        assert!(error_messages(&sink)
            .iter()
            .any(|m| m.contains("range min and max are equal")));
    }

    #[test]
    fn distinct_float_bounds_pass_the_equality_rule() {
        let (schema, sink) = load(
            r#"
            start_param = 1

            [[params]]
            name = "rate"
            type = "float"

            [params.range]
            min = 1.0
            max = 1.001
            "#,
        );
        assert_eq!(sink.state(), SinkState::Clean);
        assert!(schema.param("rate").unwrap().range.is_some());
    }

    #[test]
    fn range_on_string_parameter_is_an_error() {
        let (schema, sink) = load(
            r#"
            start_param = 1

            [[params]]
            name = "label"
            type = "string"

            [params.range]
            min = 0
            max = 1
            "#,
        );
        assert!(error_messages(&sink)
            .iter()
            .any(|m| m.contains("range is only valid for int and float parameters")));
        assert!(schema.param("label").unwrap().range.is_none());
    }

    #[test]
    fn range_missing_a_bound_is_an_error() {
        let (_, sink) = load(
            r#"
            start_param = 1

            [[params]]
            name = "lv"
            type = "int"

            [params.range]
            min = 0
            "#,
        );
        assert!(error_messages(&sink)
            .iter()
            .any(|m| m.contains("range requires both `min` and `max`")));
    }

    #[test]
    fn param_type_accepts_is_locale_invariant_parse() {
        assert!(ParamType::Int.accepts(" 42 "));
        assert!(!ParamType::Int.accepts("42.5"));
        assert!(ParamType::Float.accepts("42.5"));
        assert!(!ParamType::Float.accepts("4,2"));
        assert!(ParamType::String.accepts("anything"));
    }

    #[test]
    fn range_check_is_inclusive_on_both_ends() {
        let bounds = RangeBounds::Int { min: 1, max: 10 };
        assert_eq!(bounds.check("1"), RangeCheck::Pass);
        assert_eq!(bounds.check("10"), RangeCheck::Pass);
        assert_eq!(bounds.check("0"), RangeCheck::OutOfBounds);
        assert_eq!(bounds.check("11"), RangeCheck::OutOfBounds);
        assert_eq!(bounds.check("x"), RangeCheck::Unparseable);

        let bounds = RangeBounds::Float { min: 0.5, max: 2.5 };
        assert_eq!(bounds.check("0.5"), RangeCheck::Pass);
        assert_eq!(bounds.check("2.5"), RangeCheck::Pass);
        assert_eq!(bounds.check("2.500001"), RangeCheck::OutOfBounds);
    }
}
