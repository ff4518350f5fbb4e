//! Dependency checkers for named comparison operators.

use regex::Regex;

/// Compares a dependency's resolved value against its required value for
/// operators other than the default exact equality.
pub trait DependencyChecker: Send + Sync {
    fn check(&self, dependency_value: &str, operator: &str, required_value: &str) -> bool;

    /// Whether `operator` is understood. Unsupported operators are
    /// declaration errors rather than a silent `false`.
    fn supports(&self, _operator: &str) -> bool {
        true
    }
}

impl<F> DependencyChecker for F
where
    F: Fn(&str, &str, &str) -> bool + Send + Sync,
{
    fn check(&self, dependency_value: &str, operator: &str, required_value: &str) -> bool {
        self(dependency_value, operator, required_value)
    }
}

/// Checker for a small fixed operator set:
///
/// | operator | holds when |
/// |---|---|
/// | `!=` | the strings differ |
/// | `<` `<=` `>` `>=` | both sides parse as numbers and compare so |
/// | `~` | the value matches the required regular expression |
/// | `in` | the value is one of the comma-separated required values |
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardChecker;

impl StandardChecker {
    pub const OPERATORS: [&'static str; 7] = ["!=", "<", "<=", ">", ">=", "~", "in"];
}

impl DependencyChecker for StandardChecker {
    fn check(&self, dependency_value: &str, operator: &str, required_value: &str) -> bool {
        match operator {
            "!=" => dependency_value != required_value,
            "<" | "<=" | ">" | ">=" => {
                let (Ok(actual), Ok(required)) = (
                    dependency_value.trim().parse::<f64>(),
                    required_value.trim().parse::<f64>(),
                ) else {
                    return false;
                };
                match operator {
                    "<" => actual < required,
                    "<=" => actual <= required,
                    ">" => actual > required,
                    _ => actual >= required,
                }
            }
            "~" => Regex::new(required_value)
                .map(|re| re.is_match(dependency_value))
                .unwrap_or(false),
            "in" => required_value
                .split(',')
                .any(|candidate| candidate.trim() == dependency_value),
            _ => false,
        }
    }

    fn supports(&self, operator: &str) -> bool {
        Self::OPERATORS.contains(&operator)
    }
}
