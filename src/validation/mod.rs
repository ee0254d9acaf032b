//! Container validation.
//!
//! [`conformance`] walks a container (archive, unpacked directory or open container) through
//! the structural checks and returns every result, passing or failing. [`logic`] holds pure
//! functions over materialized links that judge the relational shape of a linkset.

pub mod conformance;
pub mod logic;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use conformance::{
    validate_archive, validate_container, validate_directory, ValidationState, Validator,
};
pub use logic::{
    check_bitotal, check_biunique, check_consistency, check_consistency_with, is_binary_linkset,
    BitotalCheck, BiuniqueCheck, ConsistencyCheck, LogicReport, RelationSets, RightTotality,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValidationGroup {
    Part1Container,
    Part1Index,
    Part1Linkset,
    Part1Documents,
}

impl ValidationGroup {
    pub fn label(&self) -> &'static str {
        match self {
            ValidationGroup::Part1Container => "Part 1: Container",
            ValidationGroup::Part1Index => "Part 1: Header File",
            ValidationGroup::Part1Linkset => "Part 1: Linksets",
            ValidationGroup::Part1Documents => "Part 1: Documents",
        }
    }
}

/// One checked criterion. It passes when the observed value equals the expected one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub criterion: String,
    pub expected: Value,
    pub observed: Value,
    pub group: ValidationGroup,
}

impl ValidationResult {
    pub fn new<E: Into<Value>, O: Into<Value>>(
        group: ValidationGroup,
        criterion: impl Into<String>,
        expected: E,
        observed: O,
    ) -> ValidationResult {
        ValidationResult {
            criterion: criterion.into(),
            expected: expected.into(),
            observed: observed.into(),
            group,
        }
    }

    /// A yes/no criterion expecting `true`.
    pub fn check(group: ValidationGroup, criterion: impl Into<String>, observed: bool) -> Self {
        ValidationResult::new(group, criterion, true, observed)
    }

    pub fn passed(&self) -> bool {
        self.expected == self.observed
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: expected {}, observed {} ({})",
            self.group.label(),
            self.criterion,
            self.expected,
            self.observed,
            if self.passed() { "passed" } else { "failed" }
        )
    }
}

/// Ordered list of results. Valid iff nothing failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    results: Vec<ValidationResult>,
}

impl ValidationReport {
    pub fn new() -> ValidationReport {
        ValidationReport::default()
    }

    pub fn push(&mut self, result: ValidationResult) {
        if result.passed() {
            tracing::debug!("{result}");
        } else {
            tracing::warn!("{result}");
        }
        self.results.push(result);
    }

    pub fn results(&self) -> &[ValidationResult] {
        &self.results
    }

    pub fn failures(&self) -> Vec<ValidationResult> {
        self.results.iter().filter(|r| !r.passed()).cloned().collect()
    }

    pub fn failure_count(&self) -> usize {
        self.results.iter().filter(|r| !r.passed()).count()
    }

    pub fn is_valid(&self) -> bool {
        self.failure_count() == 0
    }

    pub fn in_group(&self, group: ValidationGroup) -> impl Iterator<Item = &ValidationResult> {
        self.results.iter().filter(move |r| r.group == group)
    }

    pub fn find(&self, criterion: &str) -> Option<&ValidationResult> {
        self.results.iter().find(|r| r.criterion == criterion)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
