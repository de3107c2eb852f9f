//! Parameter grid definition for exhaustive search

use crate::error::{Result, TextClfError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A concrete value of a hyperparameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl ParameterValue {
    /// Get as float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParameterValue::Float(v) => Some(*v),
            ParameterValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Get as non-negative integer
    pub fn as_usize(&self) -> Option<usize> {
        match self {
            ParameterValue::Int(v) if *v >= 0 => Some(*v as usize),
            _ => None,
        }
    }

    /// Get as string
    pub fn as_string(&self) -> Option<&str> {
        match self {
            ParameterValue::String(v) => Some(v),
            _ => None,
        }
    }

    /// Get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParameterValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Parse a literal, trying bool, int and float before falling back to string
    pub fn parse_literal(raw: &str) -> Self {
        let raw = raw.trim();
        if let Ok(b) = raw.parse::<bool>() {
            ParameterValue::Bool(b)
        } else if let Ok(i) = raw.parse::<i64>() {
            ParameterValue::Int(i)
        } else if let Ok(f) = raw.parse::<f64>() {
            ParameterValue::Float(f)
        } else {
            ParameterValue::String(raw.to_string())
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Bool(v) => write!(f, "{}", v),
            ParameterValue::Int(v) => write!(f, "{}", v),
            ParameterValue::Float(v) => write!(f, "{}", v),
            ParameterValue::String(v) => write!(f, "'{}'", v),
        }
    }
}

/// One point of the grid: parameter name to value, ordered by name
pub type ParameterSet = BTreeMap<String, ParameterValue>;

/// Format a parameter set the way the runner prints best parameters
pub fn format_parameter_set(params: &ParameterSet) -> String {
    let body: Vec<String> = params
        .iter()
        .map(|(name, value)| format!("'{}': {}", name, value))
        .collect();
    format!("{{{}}}", body.join(", "))
}

/// Exhaustive parameter grid.
///
/// Names follow the `<step>__<param>` convention understood by
/// [`Pipeline::set_params`](crate::pipeline::Pipeline::set_params).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParamGrid {
    parameters: BTreeMap<String, Vec<ParameterValue>>,
}

impl ParamGrid {
    /// Create an empty grid (a single, empty combination)
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter with its candidate values
    pub fn add(mut self, name: impl Into<String>, values: Vec<ParameterValue>) -> Self {
        self.parameters.insert(name.into(), values);
        self
    }

    /// Number of parameters in the grid
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Number of combinations the grid expands to
    pub fn n_combinations(&self) -> usize {
        self.parameters.values().map(|v| v.len()).product()
    }

    /// First parameter given no values; such a grid has no combinations
    pub fn empty_parameter(&self) -> Option<&str> {
        self.parameters.iter().find(|(_, values)| values.is_empty()).map(|(name, _)| name.as_str())
    }

    /// Expand into every combination, last parameter varying fastest.
    ///
    /// An empty grid yields exactly one empty combination.
    pub fn combinations(&self) -> Vec<ParameterSet> {
        let mut combos: Vec<ParameterSet> = vec![ParameterSet::new()];
        for (name, values) in &self.parameters {
            let mut next = Vec::with_capacity(combos.len() * values.len());
            for combo in &combos {
                for value in values {
                    let mut extended = combo.clone();
                    extended.insert(name.clone(), value.clone());
                    next.push(extended);
                }
            }
            combos = next;
        }
        combos
    }
}

impl FromStr for ParamGrid {
    type Err = TextClfError;

    /// Parse `name=v1,v2;name2=v3` into a grid
    fn from_str(s: &str) -> Result<Self> {
        let mut grid = ParamGrid::new();
        for entry in s.split(';').map(str::trim).filter(|e| !e.is_empty()) {
            let (name, values) = parse_grid_entry(entry)?;
            grid = grid.add(name, values);
        }
        Ok(grid)
    }
}

/// Parse a single `name=v1,v2,...` entry
pub fn parse_grid_entry(entry: &str) -> Result<(String, Vec<ParameterValue>)> {
    let (name, raw_values) = entry.split_once('=').ok_or_else(|| {
        TextClfError::ConfigError(format!("Parameter entry '{}' must look like name=v1,v2", entry))
    })?;

    let name = name.trim();
    if name.is_empty() {
        return Err(TextClfError::ConfigError(format!("Parameter entry '{}' has no name", entry)));
    }

    let values: Vec<ParameterValue> = raw_values
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ParameterValue::parse_literal)
        .collect();

    if values.is_empty() {
        return Err(TextClfError::ConfigError(format!("Parameter '{}' has no values", name)));
    }

    Ok((name.to_string(), values))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_grid_has_single_combination() {
        let grid = ParamGrid::new();
        let combos = grid.combinations();
        assert_eq!(combos.len(), 1);
        assert!(combos[0].is_empty());
        assert_eq!(grid.n_combinations(), 1);
        assert_eq!(grid.empty_parameter(), None);
    }

    #[test]
    fn test_parameter_without_values() {
        let grid = ParamGrid::new()
            .add("clf__alpha", vec![ParameterValue::Float(1.0)])
            .add("clf__max_iter", vec![]);
        assert_eq!(grid.n_combinations(), 0);
        assert!(grid.combinations().is_empty());
        assert_eq!(grid.empty_parameter(), Some("clf__max_iter"));
    }

    #[test]
    fn test_grid_expansion() {
        let grid = ParamGrid::new()
            .add("clf__alpha", vec![ParameterValue::Float(0.1), ParameterValue::Float(1.0)])
            .add("features__both_gram__ngram_max", vec![
                ParameterValue::Int(1),
                ParameterValue::Int(2),
                ParameterValue::Int(3),
            ]);

        let combos = grid.combinations();
        assert_eq!(combos.len(), 6);
        assert_eq!(grid.n_combinations(), 6);
        assert_eq!(combos[0]["clf__alpha"], ParameterValue::Float(0.1));
        assert_eq!(combos[0]["features__both_gram__ngram_max"], ParameterValue::Int(1));
        assert_eq!(combos[1]["features__both_gram__ngram_max"], ParameterValue::Int(2));
    }

    #[test]
    fn test_parse_literal() {
        assert_eq!(ParameterValue::parse_literal("true"), ParameterValue::Bool(true));
        assert_eq!(ParameterValue::parse_literal("3"), ParameterValue::Int(3));
        assert_eq!(ParameterValue::parse_literal("0.5"), ParameterValue::Float(0.5));
        assert_eq!(ParameterValue::parse_literal("hinge"), ParameterValue::String("hinge".into()));
    }

    #[test]
    fn test_grid_from_str() {
        let grid: ParamGrid = "clf__alpha=0.1,1.0; clf__max_iter=100".parse().unwrap();
        assert_eq!(grid.len(), 2);
        assert_eq!(grid.n_combinations(), 2);

        assert!("clf__alpha".parse::<ParamGrid>().is_err());
        assert!("clf__alpha=".parse::<ParamGrid>().is_err());
    }

    #[test]
    fn test_format_parameter_set() {
        let mut params = ParameterSet::new();
        assert_eq!(format_parameter_set(&params), "{}");

        params.insert("clf__alpha".into(), ParameterValue::Float(0.5));
        params.insert("clf__loss".into(), ParameterValue::String("hinge".into()));
        assert_eq!(format_parameter_set(&params), "{'clf__alpha': 0.5, 'clf__loss': 'hinge'}");
    }
}
