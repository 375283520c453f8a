use crate::EditingContextRule;
use std::fmt;

/// A unit of test execution.
///
/// Closures of type `FnMut() -> anyhow::Result<()>` are statements.
pub trait Statement {
    fn evaluate(&mut self) -> anyhow::Result<()>;
}

impl<F> Statement for F
where
    F: FnMut() -> anyhow::Result<()>,
{
    fn evaluate(&mut self) -> anyhow::Result<()> {
        self()
    }
}

/// Names the test a statement belongs to. Both parts are optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Description {
    pub class_name: Option<String>,
    pub method_name: Option<String>,
}

impl Description {
    pub fn new(class_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self {
            class_name: Some(class_name.into()),
            method_name: Some(method_name.into()),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.method_name, &self.class_name) {
            (Some(method), Some(class)) => write!(f, "{method}({class})"),
            (Some(method), None) => f.write_str(method),
            (None, Some(class)) => f.write_str(class),
            (None, None) => f.write_str("<unnamed>"),
        }
    }
}

/// The statement returned by [`EditingContextRule::apply`].
///
/// Evaluating it runs `before()`, the wrapped statement and `after()`, in
/// that order, with `after()` guaranteed to run.
pub struct RuleStatement<'r, S> {
    rule: &'r mut EditingContextRule,
    base: S,
    description: Description,
}

impl<'r, S: Statement> RuleStatement<'r, S> {
    pub(crate) fn new(rule: &'r mut EditingContextRule, base: S, description: Description) -> Self {
        Self {
            rule,
            base,
            description,
        }
    }

    pub fn description(&self) -> &Description {
        &self.description
    }
}

impl<S: Statement> Statement for RuleStatement<'_, S> {
    fn evaluate(&mut self) -> anyhow::Result<()> {
        let Self {
            rule,
            base,
            description,
        } = self;
        rule.guarded(description, |_| base.evaluate())
    }
}
