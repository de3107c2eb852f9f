//! Hyperparameter search
//!
//! A [`ParamGrid`] maps `<step>__<param>` names to candidate values;
//! [`GridSearchCV`] scores every combination by k-fold accuracy and refits
//! the winner.

mod search_space;
pub mod grid_search;

pub use grid_search::{CandidateResult, GridSearchCV, GridSearchSummary};
pub use search_space::{format_parameter_set, parse_grid_entry, ParamGrid, ParameterSet, ParameterValue};
