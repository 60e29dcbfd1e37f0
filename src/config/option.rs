//! The typed option value union.

use crate::geometry::PointF;
use crate::CoordF;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Runtime kind tag of a [`ConfigOption`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionKind {
    Float,
    Floats,
    Int,
    Ints,
    String,
    Strings,
    Percent,
    FloatOrPercent,
    Bool,
    Bools,
    Point,
    Enum,
}

impl OptionKind {
    pub fn name(&self) -> &'static str {
        match self {
            OptionKind::Float => "a float",
            OptionKind::Floats => "a float list",
            OptionKind::Int => "an integer",
            OptionKind::Ints => "an integer list",
            OptionKind::String => "a string",
            OptionKind::Strings => "a string list",
            OptionKind::Percent => "a percentage",
            OptionKind::FloatOrPercent => "a float or percentage",
            OptionKind::Bool => "a boolean",
            OptionKind::Bools => "a boolean list",
            OptionKind::Point => "a 2D point",
            OptionKind::Enum => "an enum value",
        }
    }
}

/// One configuration value.
///
/// A closed union over every kind the store supports; each variant
/// owns its textual serialization. The string form is the interchange
/// format between configs (see `DynamicConfig::apply`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConfigOption {
    Float(CoordF),
    Floats(Vec<CoordF>),
    Int(i64),
    Ints(Vec<i64>),
    Str(String),
    Strings(Vec<String>),
    /// Percentage, stored as e.g. `40.0` for 40%.
    Percent(CoordF),
    FloatOrPercent {
        value: CoordF,
        percent: bool,
    },
    Bool(bool),
    Bools(Vec<bool>),
    Point(PointF),
    /// Enum value by key; allowed keys live in the option definition.
    Enum(String),
}

impl ConfigOption {
    pub fn kind(&self) -> OptionKind {
        match self {
            ConfigOption::Float(_) => OptionKind::Float,
            ConfigOption::Floats(_) => OptionKind::Floats,
            ConfigOption::Int(_) => OptionKind::Int,
            ConfigOption::Ints(_) => OptionKind::Ints,
            ConfigOption::Str(_) => OptionKind::String,
            ConfigOption::Strings(_) => OptionKind::Strings,
            ConfigOption::Percent(_) => OptionKind::Percent,
            ConfigOption::FloatOrPercent { .. } => OptionKind::FloatOrPercent,
            ConfigOption::Bool(_) => OptionKind::Bool,
            ConfigOption::Bools(_) => OptionKind::Bools,
            ConfigOption::Point(_) => OptionKind::Point,
            ConfigOption::Enum(_) => OptionKind::Enum,
        }
    }

    /// Textual form, parseable by [`ConfigOption::deserialize`] on an
    /// option of the same kind.
    pub fn serialize(&self) -> String {
        fn join<T: fmt::Display>(values: &[T]) -> String {
            values
                .iter()
                .map(T::to_string)
                .collect::<Vec<_>>()
                .join(",")
        }
        match self {
            ConfigOption::Float(v) => v.to_string(),
            ConfigOption::Floats(v) => join(v),
            ConfigOption::Int(v) => v.to_string(),
            ConfigOption::Ints(v) => join(v),
            ConfigOption::Str(v) => v.clone(),
            ConfigOption::Strings(v) => v.join(";"),
            ConfigOption::Percent(v) => format!("{}%", v),
            ConfigOption::FloatOrPercent { value, percent } => {
                if *percent {
                    format!("{}%", value)
                } else {
                    value.to_string()
                }
            }
            ConfigOption::Bool(v) => if *v { "1" } else { "0" }.to_string(),
            ConfigOption::Bools(v) => v
                .iter()
                .map(|b| if *b { "1" } else { "0" })
                .collect::<Vec<_>>()
                .join(","),
            ConfigOption::Point(p) => format!("{},{}", p.x, p.y),
            ConfigOption::Enum(v) => v.clone(),
        }
    }

    /// Parse `input` into this option, keeping the variant.
    pub fn deserialize(&mut self, input: &str) -> Result<(), String> {
        fn parse_list<T: std::str::FromStr>(input: &str, what: &str) -> Result<Vec<T>, String> {
            if input.trim().is_empty() {
                return Ok(Vec::new());
            }
            input
                .split(',')
                .map(|s| {
                    s.trim()
                        .parse::<T>()
                        .map_err(|_| format!("'{}' is not {}", s.trim(), what))
                })
                .collect()
        }
        fn parse_bool(input: &str) -> Result<bool, String> {
            match input.trim() {
                "1" | "true" => Ok(true),
                "0" | "false" => Ok(false),
                other => Err(format!("'{}' is not a boolean", other)),
            }
        }

        let input = input.trim();
        match self {
            ConfigOption::Float(v) => {
                *v = input
                    .parse()
                    .map_err(|_| format!("'{}' is not a float", input))?;
            }
            ConfigOption::Floats(v) => *v = parse_list(input, "a float")?,
            ConfigOption::Int(v) => {
                *v = input
                    .parse()
                    .map_err(|_| format!("'{}' is not an integer", input))?;
            }
            ConfigOption::Ints(v) => *v = parse_list(input, "an integer")?,
            ConfigOption::Str(v) => *v = input.to_string(),
            ConfigOption::Strings(v) => {
                *v = if input.is_empty() {
                    Vec::new()
                } else {
                    input.split(';').map(str::to_string).collect()
                };
            }
            ConfigOption::Percent(v) => {
                let stripped = input.strip_suffix('%').unwrap_or(input);
                *v = stripped
                    .trim()
                    .parse()
                    .map_err(|_| format!("'{}' is not a percentage", input))?;
            }
            ConfigOption::FloatOrPercent { value, percent } => {
                if let Some(stripped) = input.strip_suffix('%') {
                    *value = stripped
                        .trim()
                        .parse()
                        .map_err(|_| format!("'{}' is not a percentage", input))?;
                    *percent = true;
                } else {
                    *value = input
                        .parse()
                        .map_err(|_| format!("'{}' is not a float", input))?;
                    *percent = false;
                }
            }
            ConfigOption::Bool(v) => *v = parse_bool(input)?,
            ConfigOption::Bools(v) => {
                *v = if input.is_empty() {
                    Vec::new()
                } else {
                    input
                        .split(',')
                        .map(parse_bool)
                        .collect::<Result<_, _>>()?
                };
            }
            ConfigOption::Point(p) => {
                let (x, y) = input
                    .split_once(',')
                    .ok_or_else(|| format!("'{}' is not a point", input))?;
                let x: CoordF = x
                    .trim()
                    .parse()
                    .map_err(|_| format!("'{}' is not a float", x))?;
                let y: CoordF = y
                    .trim()
                    .parse()
                    .map_err(|_| format!("'{}' is not a float", y))?;
                *p = PointF::new(x, y);
            }
            ConfigOption::Enum(v) => *v = input.to_string(),
        }
        Ok(())
    }
}
