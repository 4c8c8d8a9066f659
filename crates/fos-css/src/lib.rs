//! fOS CSS Selectors
//!
//! Selector parsing and matching for `querySelector`-style lookups over a
//! [`fos_dom::DomTree`].

mod parser;
mod query;
mod selectors;

pub use query::ElementQuery;
pub use selectors::{
    AttributeMatcher, AttributeSelector, Combinator, ComplexSelector, CompoundSelector, NthExpression,
    PseudoClass, SelectorComponent, SelectorList,
};

/// Parse a selector list
pub fn parse_selector(selector: &str) -> Result<SelectorList, SelectorError> {
    SelectorList::parse(selector)
}

/// Selector syntax error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("Empty selector")]
    Empty,

    #[error("Unexpected '{ch}' at offset {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("Unexpected end of selector")]
    UnexpectedEnd,

    #[error("Unsupported pseudo selector {0}")]
    UnsupportedPseudo(String),

    #[error("Invalid :nth-* argument '{0}'")]
    InvalidNth(String),
}
