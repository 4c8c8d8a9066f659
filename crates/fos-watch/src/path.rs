//! Selector paths
//!
//! A selector path is a CSS selector with `:shadow` markers, e.g.
//! `:shadow hass-subpage .container :shadow img`. Each marker steps from the
//! current element into its shadow root; everything between markers is a
//! plain selector queried against the current node.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

const SHADOW: &str = ":shadow";

/// One step of a [`SelectorPath`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Enter the current element's shadow root
    CrossShadow,
    /// `querySelector` against the current node
    Query(String),
}

/// Parsed selector path
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectorPath {
    steps: Vec<Step>,
}

impl SelectorPath {
    /// Split `path` on the literal `:shadow` token.
    ///
    /// Fragments are trimmed and empty ones dropped. Selector syntax is not
    /// checked here; invalid fragments fail when they are queried.
    pub fn parse(path: &str) -> Self {
        let mut steps = Vec::new();
        for (i, fragment) in path.split(SHADOW).enumerate() {
            if i > 0 {
                steps.push(Step::CrossShadow);
            }
            let fragment = fragment.trim();
            if !fragment.is_empty() {
                steps.push(Step::Query(fragment.to_string()));
            }
        }
        Self { steps }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of shadow boundaries the path crosses
    pub fn shadow_crossings(&self) -> usize {
        self.steps.iter().filter(|s| **s == Step::CrossShadow).count()
    }
}

impl fmt::Display for SelectorPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            match step {
                Step::CrossShadow => f.write_str(SHADOW)?,
                Step::Query(selector) => f.write_str(selector)?,
            }
        }
        Ok(())
    }
}

impl FromStr for SelectorPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for SelectorPath {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}
