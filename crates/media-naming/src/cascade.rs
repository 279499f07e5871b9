//! First-match-wins evaluation over an ordered list of regex rules.

use regex::{Captures, Regex};
use tracing::trace;

/// Pulls the value out of a successful match.
pub type Extractor<T> = fn(&Captures<'_>) -> Option<T>;

/// A named pattern paired with the function that reads its captures.
pub struct Rule<T> {
    name: &'static str,
    pattern: Regex,
    extract: Extractor<T>,
}

impl<T> Rule<T> {
    /// Create a rule from an already compiled pattern.
    pub fn new(name: &'static str, pattern: Regex, extract: Extractor<T>) -> Self {
        Self {
            name,
            pattern,
            extract,
        }
    }

    /// Rule name, used in logs and tests.
    pub fn name(&self) -> &'static str {
        self.name
    }

    fn apply(&self, input: &str) -> Option<T> {
        let caps = self.pattern.captures(input)?;
        (self.extract)(&caps)
    }
}

impl<T> std::fmt::Debug for Rule<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("pattern", &self.pattern.as_str())
            .finish()
    }
}

/// Result of a cascade evaluation: the winning rule and its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeMatch<T> {
    pub rule: &'static str,
    pub value: T,
}

/// Ordered rules evaluated until one produces a value.
///
/// Rules are consulted strictly in insertion order. Once a rule yields a value
/// no later rule is evaluated, so more specific patterns must be pushed first.
#[derive(Debug)]
pub struct Cascade<T> {
    rules: Vec<Rule<T>>,
}

impl<T> Cascade<T> {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule with lower priority than every rule already present.
    pub fn push(mut self, name: &'static str, pattern: Regex, extract: Extractor<T>) -> Self {
        self.rules.push(Rule::new(name, pattern, extract));
        self
    }

    /// Names of the rules in priority order.
    pub fn rule_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.iter().map(Rule::name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluate the rules against `input` and return the first hit.
    pub fn evaluate(&self, input: &str) -> Option<CascadeMatch<T>> {
        self.rules.iter().find_map(|rule| {
            let value = rule.apply(input)?;
            trace!(rule = rule.name, input, "cascade rule matched");
            Some(CascadeMatch {
                rule: rule.name,
                value,
            })
        })
    }
}

impl<T> Default for Cascade<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Owned text of capture group `index`, if it participated in the match.
pub(crate) fn group(caps: &Captures<'_>, index: usize) -> Option<String> {
    caps.get(index).map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digits(caps: &Captures<'_>) -> Option<String> {
        group(caps, 1)
    }

    fn never(_: &Captures<'_>) -> Option<String> {
        None
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let cascade = Cascade::new()
            .push("three", Regex::new(r"(\d{3})").unwrap(), digits)
            .push("one", Regex::new(r"(\d)").unwrap(), digits);

        let hit = cascade.evaluate("abc 1234").unwrap();
        assert_eq!(hit.rule, "three");
        assert_eq!(hit.value, "123");

        let hit = cascade.evaluate("abc 12").unwrap();
        assert_eq!(hit.rule, "one");
        assert_eq!(hit.value, "1");
    }

    #[test]
    fn test_rule_without_value_falls_through() {
        let cascade = Cascade::new()
            .push("empty", Regex::new(r"\d").unwrap(), never)
            .push("digits", Regex::new(r"(\d+)").unwrap(), digits);

        let hit = cascade.evaluate("x42").unwrap();
        assert_eq!(hit.rule, "digits");
        assert_eq!(hit.value, "42");
    }

    #[test]
    fn test_no_match() {
        let cascade: Cascade<String> =
            Cascade::new().push("digits", Regex::new(r"(\d+)").unwrap(), digits);
        assert!(cascade.evaluate("no numbers").is_none());
        assert_eq!(cascade.rule_names().collect::<Vec<_>>(), vec!["digits"]);
        assert_eq!(cascade.len(), 1);
    }
}
