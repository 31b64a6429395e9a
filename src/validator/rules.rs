//! Findings, the accumulator and the custom-rule seam.

use std::fmt;

use crate::diagnostics::{DiagnosticCode, PathLocator, Severity};
use crate::message::Message;

/// One validation finding: where, what, how bad, and which rule said so.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationFinding {
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub path: PathLocator,
    pub message: String,
    pub rule_id: String,
}

impl fmt::Display for ValidationFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] at {} ({}): {}",
            self.severity, self.code, self.path, self.rule_id, self.message
        )
    }
}

/// Gathers findings across the validation passes.  Validation never raises
/// and never mutates the message; everything lands here.
#[derive(Debug, Default)]
pub struct ValidationAccumulator {
    findings: Vec<ValidationFinding>,
}

impl ValidationAccumulator {
    pub fn new() -> Self {
        ValidationAccumulator::default()
    }

    pub fn add(
        &mut self,
        severity: Severity,
        code: DiagnosticCode,
        path: PathLocator,
        message: impl Into<String>,
        rule_id: &str,
    ) {
        self.findings.push(ValidationFinding {
            severity,
            code,
            path,
            message: message.into(),
            rule_id: rule_id.to_string(),
        });
    }

    pub fn error(&mut self, code: DiagnosticCode, path: PathLocator, message: impl Into<String>, rule_id: &str) {
        self.add(Severity::Error, code, path, message, rule_id);
    }

    pub fn warning(&mut self, code: DiagnosticCode, path: PathLocator, message: impl Into<String>, rule_id: &str) {
        self.add(Severity::Warning, code, path, message, rule_id);
    }

    pub fn info(&mut self, code: DiagnosticCode, path: PathLocator, message: impl Into<String>, rule_id: &str) {
        self.add(Severity::Info, code, path, message, rule_id);
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn into_result(self) -> ValidationResult {
        ValidationResult {
            findings: self.findings,
        }
    }
}

/// The outcome of a validation run.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub findings: Vec<ValidationFinding>,
}

impl ValidationResult {
    /// No findings at error severity.
    pub fn is_valid(&self) -> bool {
        !self.findings.iter().any(|f| f.severity == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationFinding> {
        self.findings.iter().filter(|f| f.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationFinding> {
        self.findings.iter().filter(|f| f.severity == Severity::Warning)
    }

    pub fn with_code(&self, code: DiagnosticCode) -> impl Iterator<Item = &ValidationFinding> {
        self.findings.iter().filter(move |f| f.code == code)
    }
}

/// A composable validation rule.  Built-in passes and site-specific checks
/// share this seam.
pub trait Rule {
    /// Stable identifier reported with every finding the rule produces.
    fn id(&self) -> &str;

    fn apply(&self, message: &Message, acc: &mut ValidationAccumulator);
}

/// A custom rule from a closure, for one-off site checks.
pub struct FnRule<F>
where
    F: Fn(&Message, &mut ValidationAccumulator),
{
    id: String,
    check: F,
}

impl<F> FnRule<F>
where
    F: Fn(&Message, &mut ValidationAccumulator),
{
    pub fn new(id: impl Into<String>, check: F) -> Self {
        FnRule { id: id.into(), check }
    }
}

impl<F> Rule for FnRule<F>
where
    F: Fn(&Message, &mut ValidationAccumulator),
{
    fn id(&self) -> &str {
        &self.id
    }

    fn apply(&self, message: &Message, acc: &mut ValidationAccumulator) {
        (self.check)(message, acc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::TryFrom;

    #[test]
    fn result_is_valid_without_errors() {
        let mut acc = ValidationAccumulator::new();
        acc.warning(DiagnosticCode::ValueSetViolation, PathLocator::new(), "just a warning", "test");
        let result = acc.into_result();
        assert!(result.is_valid());
        assert_eq!(result.warnings().count(), 1);
    }

    #[test]
    fn errors_invalidate() {
        let mut acc = ValidationAccumulator::new();
        acc.error(DiagnosticCode::CardinalityViolation, PathLocator::new(), "missing", "test");
        let result = acc.into_result();
        assert!(!result.is_valid());
        assert_eq!(result.errors().count(), 1);
    }

    #[test]
    fn fn_rules_run_against_the_message() {
        let msg = Message::try_from("MSH|^~\\&|A|B|C|D|20230101||ADT^A01|1|P|2.5").unwrap();
        let rule = FnRule::new("control-id-present", |message: &Message, acc: &mut ValidationAccumulator| {
            if message.control_id().is_none() {
                acc.error(DiagnosticCode::CardinalityViolation, PathLocator::segment(1, "MSH").field(10), "control id required", "control-id-present");
            }
        });

        let mut acc = ValidationAccumulator::new();
        rule.apply(&msg, &mut acc);
        assert!(acc.is_empty());
    }
}
