//! CSS Selectors Module
//!
//! Selector data model and matching against a [`DomTree`]. Complex
//! selectors are stored right to left so matching starts at the subject and
//! walks outwards through the combinators.

use std::str::FromStr;

use fos_dom::{DomTree, ElementData, NodeId, NodeType};

use crate::SelectorError;
use crate::parser::SelectorParser;

/// Comma-separated selector list, e.g. `img, .logo > img`
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorList {
    pub selectors: Vec<ComplexSelector>,
}

impl SelectorList {
    /// Parse a selector list
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        SelectorParser::new(input).parse_list()
    }

    /// Whether any selector in the list matches `element`
    pub fn matches(&self, tree: &DomTree, element: NodeId) -> bool {
        tree.is_element(element) && self.selectors.iter().any(|s| s.matches(tree, element))
    }
}

impl FromStr for SelectorList {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Combinator between two compound selectors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// `a b`
    Descendant,
    /// `a > b`
    Child,
    /// `a + b`
    NextSibling,
    /// `a ~ b`
    SubsequentSibling,
}

/// Compound selectors joined by combinators
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexSelector {
    /// Rightmost compound, the element being selected
    pub subject: CompoundSelector,
    /// Remaining compounds, nearest to the subject first
    pub ancestors: Vec<(Combinator, CompoundSelector)>,
}

impl ComplexSelector {
    pub fn matches(&self, tree: &DomTree, element: NodeId) -> bool {
        self.subject.matches(tree, element) && match_chain(tree, element, &self.ancestors)
    }
}

fn match_chain(tree: &DomTree, element: NodeId, rest: &[(Combinator, CompoundSelector)]) -> bool {
    let Some(((combinator, compound), rest)) = rest.split_first() else {
        return true;
    };

    let step = |candidate: NodeId| compound.matches(tree, candidate) && match_chain(tree, candidate, rest);

    match combinator {
        Combinator::Child => parent_element(tree, element).is_some_and(&step),
        Combinator::Descendant => {
            let mut current = parent_element(tree, element);
            while let Some(ancestor) = current {
                if step(ancestor) {
                    return true;
                }
                current = parent_element(tree, ancestor);
            }
            false
        }
        Combinator::NextSibling => previous_element_sibling(tree, element).is_some_and(&step),
        Combinator::SubsequentSibling => {
            let mut current = previous_element_sibling(tree, element);
            while let Some(sibling) = current {
                if step(sibling) {
                    return true;
                }
                current = previous_element_sibling(tree, sibling);
            }
            false
        }
    }
}

fn parent_element(tree: &DomTree, element: NodeId) -> Option<NodeId> {
    tree.parent(element).filter(|&p| tree.is_element(p))
}

fn previous_element_sibling(tree: &DomTree, element: NodeId) -> Option<NodeId> {
    let mut current = tree.previous_sibling(element);
    while let Some(sibling) = current {
        if tree.is_element(sibling) {
            return Some(sibling);
        }
        current = tree.previous_sibling(sibling);
    }
    None
}

/// Sequence of simple selectors without combinators, e.g. `img.logo[src]`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompoundSelector {
    pub components: Vec<SelectorComponent>,
}

impl CompoundSelector {
    pub fn matches(&self, tree: &DomTree, element: NodeId) -> bool {
        let Some(data) = tree.element(element) else {
            return false;
        };
        self.components
            .iter()
            .all(|component| match_component(component, tree, element, data))
    }
}

/// A component of a selector
#[derive(Debug, Clone, PartialEq)]
pub enum SelectorComponent {
    /// Universal selector *
    Universal,
    /// Type selector (lowercase tag name)
    Type(String),
    /// ID selector #id
    Id(String),
    /// Class selector .class
    Class(String),
    /// Attribute selector [attr], [attr=value], etc.
    Attribute(AttributeSelector),
    /// Pseudo-class :first-child, :nth-child(), etc.
    PseudoClass(PseudoClass),
}

/// Supported pseudo-classes; all are tree-structural or logical
#[derive(Debug, Clone, PartialEq)]
pub enum PseudoClass {
    Root,
    Empty,
    FirstChild,
    LastChild,
    OnlyChild,
    FirstOfType,
    LastOfType,
    NthChild(NthExpression),
    NthLastChild(NthExpression),
    Not(Vec<CompoundSelector>),
}

/// An+B expression for :nth-* selectors
#[derive(Debug, Clone, PartialEq)]
pub struct NthExpression {
    /// Coefficient (A in An+B)
    pub a: i32,
    /// Offset (B in An+B)
    pub b: i32,
}

impl NthExpression {
    /// Create "odd" expression (2n+1)
    pub fn odd() -> Self {
        Self { a: 2, b: 1 }
    }

    /// Create "even" expression (2n)
    pub fn even() -> Self {
        Self { a: 2, b: 0 }
    }

    /// Create a simple index (0n+b)
    pub fn index(n: i32) -> Self {
        Self { a: 0, b: n }
    }

    pub fn new(a: i32, b: i32) -> Self {
        Self { a, b }
    }

    /// Parse from string like "2n+1", "odd", "even", "3"
    pub fn parse(s: &str) -> Option<Self> {
        let s: String = s.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_ascii_lowercase();

        match s.as_str() {
            "odd" => return Some(Self::odd()),
            "even" => return Some(Self::even()),
            _ => {}
        }

        if let Ok(n) = s.parse::<i32>() {
            return Some(Self::index(n));
        }

        let n_pos = s.find('n')?;
        let a = match &s[..n_pos] {
            "" | "+" => 1,
            "-" => -1,
            a => a.parse().ok()?,
        };
        let rest = &s[n_pos + 1..];
        let b = if rest.is_empty() {
            0
        } else {
            // "+3" parses directly; reject "3" with no sign after `n`
            if !rest.starts_with(['+', '-']) {
                return None;
            }
            rest.parse().ok()?
        };

        Some(Self::new(a, b))
    }

    /// Check if index n (1-based) matches this expression
    pub fn matches(&self, n: i32) -> bool {
        if self.a == 0 {
            return n == self.b;
        }

        // Widened so extreme `a`/`b` values cannot overflow
        let (a, diff) = (i64::from(self.a), i64::from(n) - i64::from(self.b));
        if a > 0 {
            diff >= 0 && diff % a == 0
        } else {
            diff <= 0 && diff % a == 0
        }
    }
}

/// Attribute selector
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSelector {
    pub name: String,
    pub matcher: Option<AttributeMatcher>,
    pub case_insensitive: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeMatcher {
    /// [attr=value] - exact match
    Exact(String),
    /// [attr~=value] - whitespace-separated list contains
    Contains(String),
    /// [attr|=value] - exact or prefix with hyphen
    DashMatch(String),
    /// [attr^=value] - starts with
    Prefix(String),
    /// [attr$=value] - ends with
    Suffix(String),
    /// [attr*=value] - contains substring
    Substring(String),
}

impl AttributeSelector {
    /// Check if an attribute value matches
    pub fn matches(&self, value: Option<&str>) -> bool {
        let (Some(matcher), Some(value)) = (&self.matcher, value) else {
            return self.matcher.is_none() && value.is_some();
        };

        let fold = |s: &str| {
            if self.case_insensitive {
                s.to_lowercase()
            } else {
                s.to_string()
            }
        };
        let value = fold(value);

        match matcher {
            AttributeMatcher::Exact(expected) => value == fold(expected),
            AttributeMatcher::Contains(expected) => {
                let expected = fold(expected);
                value.split_whitespace().any(|w| w == expected)
            }
            AttributeMatcher::DashMatch(expected) => {
                let expected = fold(expected);
                value == expected || value.starts_with(&format!("{expected}-"))
            }
            // Empty operands never match for the substring family
            AttributeMatcher::Prefix(expected) => !expected.is_empty() && value.starts_with(&fold(expected)),
            AttributeMatcher::Suffix(expected) => !expected.is_empty() && value.ends_with(&fold(expected)),
            AttributeMatcher::Substring(expected) => !expected.is_empty() && value.contains(&fold(expected)),
        }
    }
}

/// Position of an element among its element siblings (1-based)
struct SiblingPosition {
    index: usize,
    count: usize,
    type_index: usize,
    type_count: usize,
}

fn sibling_position(tree: &DomTree, element: NodeId, tag: &str) -> SiblingPosition {
    let Some(parent) = tree.parent(element) else {
        return SiblingPosition { index: 1, count: 1, type_index: 1, type_count: 1 };
    };

    let mut position = SiblingPosition { index: 0, count: 0, type_index: 0, type_count: 0 };
    for sibling in tree.element_children(parent) {
        let same_type = tree.tag_name(sibling) == Some(tag);
        position.count += 1;
        if same_type {
            position.type_count += 1;
        }
        if sibling == element {
            position.index = position.count;
            position.type_index = position.type_count;
        }
    }
    position
}

fn match_component(component: &SelectorComponent, tree: &DomTree, element: NodeId, data: &ElementData) -> bool {
    match component {
        SelectorComponent::Universal => true,
        SelectorComponent::Type(tag) => data.tag() == tag.as_str(),
        SelectorComponent::Id(id) => data.id() == Some(id.as_str()),
        SelectorComponent::Class(class) => data.classes().any(|c| c == class.as_str()),
        SelectorComponent::Attribute(attr) => attr.matches(data.get_attr(&attr.name)),
        SelectorComponent::PseudoClass(pseudo) => match_pseudo_class(pseudo, tree, element, data),
    }
}

fn match_pseudo_class(pseudo: &PseudoClass, tree: &DomTree, element: NodeId, data: &ElementData) -> bool {
    match pseudo {
        PseudoClass::Root => tree
            .parent(element)
            .is_some_and(|p| tree.node_type(p) == Some(NodeType::Document)),
        PseudoClass::Empty => tree
            .children(element)
            .iter()
            .all(|&c| matches!(tree.node_type(c), Some(NodeType::Comment))),
        PseudoClass::Not(compounds) => !compounds.iter().any(|c| c.matches(tree, element)),
        structural => {
            let pos = sibling_position(tree, element, data.tag());
            match structural {
                PseudoClass::FirstChild => pos.index == 1,
                PseudoClass::LastChild => pos.index == pos.count,
                PseudoClass::OnlyChild => pos.count == 1,
                PseudoClass::FirstOfType => pos.type_index == 1,
                PseudoClass::LastOfType => pos.type_index == pos.type_count,
                PseudoClass::NthChild(expr) => expr.matches(pos.index as i32),
                PseudoClass::NthLastChild(expr) => expr.matches((pos.count - pos.index + 1) as i32),
                PseudoClass::Root | PseudoClass::Empty | PseudoClass::Not(_) => false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nth_expression_odd() {
        let expr = NthExpression::odd();
        assert!(expr.matches(1));
        assert!(!expr.matches(2));
        assert!(expr.matches(3));
        assert!(!expr.matches(4));
    }

    #[test]
    fn test_nth_expression_parse() {
        assert_eq!(NthExpression::parse("odd"), Some(NthExpression::odd()));
        assert_eq!(NthExpression::parse(" EVEN "), Some(NthExpression::even()));
        assert_eq!(NthExpression::parse("3"), Some(NthExpression::index(3)));
        assert_eq!(NthExpression::parse("2n"), Some(NthExpression::new(2, 0)));
        assert_eq!(NthExpression::parse("2n + 1"), Some(NthExpression::new(2, 1)));
        assert_eq!(NthExpression::parse("-n+3"), Some(NthExpression::new(-1, 3)));
        assert_eq!(NthExpression::parse("n3"), None);
        assert_eq!(NthExpression::parse("x"), None);
    }

    #[test]
    fn test_nth_expression_negative() {
        let expr = NthExpression::new(-1, 3);
        assert!(expr.matches(1));
        assert!(expr.matches(3));
        assert!(!expr.matches(4));
    }

    #[test]
    fn test_nth_expression_extreme_offsets() {
        let expr = NthExpression::parse("2n-2147483648").unwrap();
        assert!(expr.matches(2));
        assert!(!expr.matches(3));

        let expr = NthExpression::new(-1, i32::MAX);
        assert!(expr.matches(5));
        assert!(!NthExpression::new(-1, i32::MIN).matches(1));
        assert!(!NthExpression::new(i32::MIN, 1).matches(i32::MAX));
    }

    #[test]
    fn test_attribute_selector_exact() {
        let sel = AttributeSelector {
            name: "type".to_string(),
            matcher: Some(AttributeMatcher::Exact("text".to_string())),
            case_insensitive: false,
        };

        assert!(sel.matches(Some("text")));
        assert!(!sel.matches(Some("TEXT")));
        assert!(!sel.matches(None));
    }

    #[test]
    fn test_attribute_selector_case_insensitive() {
        let sel = AttributeSelector {
            name: "src".to_string(),
            matcher: Some(AttributeMatcher::Substring("/ACME/".to_string())),
            case_insensitive: true,
        };

        assert!(sel.matches(Some("https://brands.example/acme/icon.png")));
        assert!(!sel.matches(Some("/other/icon.png")));
    }

    #[test]
    fn test_attribute_selector_existence() {
        let sel = AttributeSelector {
            name: "src".to_string(),
            matcher: None,
            case_insensitive: false,
        };
        assert!(sel.matches(Some("")));
        assert!(!sel.matches(None));
    }

    #[test]
    fn test_empty_substring_operand_never_matches() {
        let sel = AttributeSelector {
            name: "class".to_string(),
            matcher: Some(AttributeMatcher::Prefix(String::new())),
            case_insensitive: false,
        };
        assert!(!sel.matches(Some("btn")));
    }
}
