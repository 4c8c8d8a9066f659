//! Selector Parser
//!
//! Hand-written recursive descent over the selector grammar used by
//! `querySelector`: compound selectors, the four combinators and the
//! pseudo-classes in [`PseudoClass`].

use crate::SelectorError;
use crate::selectors::{
    AttributeMatcher, AttributeSelector, Combinator, ComplexSelector, CompoundSelector, NthExpression,
    PseudoClass, SelectorComponent, SelectorList,
};

pub(crate) struct SelectorParser {
    chars: Vec<char>,
    pos: usize,
}

impl SelectorParser {
    pub(crate) fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    pub(crate) fn parse_list(mut self) -> Result<SelectorList, SelectorError> {
        self.skip_whitespace();
        if self.peek().is_none() {
            return Err(SelectorError::Empty);
        }

        let mut selectors = Vec::new();
        loop {
            self.skip_whitespace();
            selectors.push(self.parse_complex()?);
            self.skip_whitespace();
            match self.next() {
                None => break,
                Some(',') => continue,
                Some(c) => return Err(self.unexpected(c)),
            }
        }
        Ok(SelectorList { selectors })
    }

    fn parse_complex(&mut self) -> Result<ComplexSelector, SelectorError> {
        let mut compounds = vec![self.parse_compound()?];
        let mut combinators = Vec::new();

        loop {
            let had_whitespace = self.skip_whitespace();
            let combinator = match self.peek() {
                None | Some(',') | Some(')') => break,
                Some('>') => Combinator::Child,
                Some('+') => Combinator::NextSibling,
                Some('~') => Combinator::SubsequentSibling,
                Some(_) if had_whitespace => Combinator::Descendant,
                Some(c) => return Err(self.unexpected(c)),
            };
            if combinator != Combinator::Descendant {
                self.pos += 1;
                self.skip_whitespace();
            }
            combinators.push(combinator);
            compounds.push(self.parse_compound()?);
        }

        let subject = compounds.pop().unwrap_or_default();
        let ancestors = combinators.into_iter().rev().zip(compounds.into_iter().rev()).collect();
        Ok(ComplexSelector { subject, ancestors })
    }

    fn parse_compound(&mut self) -> Result<CompoundSelector, SelectorError> {
        let mut components = Vec::new();

        match self.peek() {
            Some('*') => {
                self.pos += 1;
                components.push(SelectorComponent::Universal);
            }
            Some(c) if is_ident_start(c) => {
                components.push(SelectorComponent::Type(self.parse_ident()?.to_ascii_lowercase()));
            }
            _ => {}
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    components.push(SelectorComponent::Id(self.parse_ident()?));
                }
                Some('.') => {
                    self.pos += 1;
                    components.push(SelectorComponent::Class(self.parse_ident()?));
                }
                Some('[') => {
                    self.pos += 1;
                    components.push(SelectorComponent::Attribute(self.parse_attribute()?));
                }
                Some(':') => {
                    self.pos += 1;
                    components.push(SelectorComponent::PseudoClass(self.parse_pseudo_class()?));
                }
                _ => break,
            }
        }

        if components.is_empty() {
            return Err(match self.peek() {
                Some(c) => self.unexpected(c),
                None => SelectorError::UnexpectedEnd,
            });
        }
        Ok(CompoundSelector { components })
    }

    fn parse_attribute(&mut self) -> Result<AttributeSelector, SelectorError> {
        self.skip_whitespace();
        let name = self.parse_ident()?.to_ascii_lowercase();
        self.skip_whitespace();

        let operator = match self.next() {
            Some(']') => {
                return Ok(AttributeSelector { name, matcher: None, case_insensitive: false });
            }
            Some('=') => '=',
            Some(op @ ('~' | '|' | '^' | '$' | '*')) => {
                self.expect('=')?;
                op
            }
            Some(c) => return Err(self.unexpected(c)),
            None => return Err(SelectorError::UnexpectedEnd),
        };

        self.skip_whitespace();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                self.parse_string(quote)?
            }
            _ => self.parse_ident()?,
        };
        self.skip_whitespace();

        let case_insensitive = match self.peek() {
            Some('i' | 'I') => {
                self.pos += 1;
                true
            }
            Some('s' | 'S') => {
                self.pos += 1;
                false
            }
            _ => false,
        };
        self.skip_whitespace();
        self.expect(']')?;

        let matcher = match operator {
            '=' => AttributeMatcher::Exact(value),
            '~' => AttributeMatcher::Contains(value),
            '|' => AttributeMatcher::DashMatch(value),
            '^' => AttributeMatcher::Prefix(value),
            '$' => AttributeMatcher::Suffix(value),
            _ => AttributeMatcher::Substring(value),
        };
        Ok(AttributeSelector { name, matcher: Some(matcher), case_insensitive })
    }

    fn parse_pseudo_class(&mut self) -> Result<PseudoClass, SelectorError> {
        if self.peek() == Some(':') {
            self.pos += 1;
            let name = self.parse_ident()?;
            return Err(SelectorError::UnsupportedPseudo(format!("::{name}")));
        }

        let name = self.parse_ident()?.to_ascii_lowercase();
        let functional = self.peek() == Some('(');
        if functional {
            self.pos += 1;
        }

        let pseudo = match (name.as_str(), functional) {
            ("root", false) => PseudoClass::Root,
            ("empty", false) => PseudoClass::Empty,
            ("first-child", false) => PseudoClass::FirstChild,
            ("last-child", false) => PseudoClass::LastChild,
            ("only-child", false) => PseudoClass::OnlyChild,
            ("first-of-type", false) => PseudoClass::FirstOfType,
            ("last-of-type", false) => PseudoClass::LastOfType,
            ("nth-child", true) => PseudoClass::NthChild(self.parse_nth()?),
            ("nth-last-child", true) => PseudoClass::NthLastChild(self.parse_nth()?),
            ("not", true) => {
                let mut compounds = Vec::new();
                loop {
                    self.skip_whitespace();
                    compounds.push(self.parse_compound()?);
                    self.skip_whitespace();
                    match self.next() {
                        Some(',') => continue,
                        Some(')') => break,
                        Some(c) => return Err(self.unexpected(c)),
                        None => return Err(SelectorError::UnexpectedEnd),
                    }
                }
                PseudoClass::Not(compounds)
            }
            _ => return Err(SelectorError::UnsupportedPseudo(format!(":{name}"))),
        };
        Ok(pseudo)
    }

    /// Argument of `:nth-*()`, consuming the closing parenthesis
    fn parse_nth(&mut self) -> Result<NthExpression, SelectorError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c != ')') {
            self.pos += 1;
        }
        let argument: String = self.chars[start..self.pos].iter().collect();
        self.expect(')')?;
        NthExpression::parse(&argument).ok_or(SelectorError::InvalidNth(argument))
    }

    fn parse_ident(&mut self) -> Result<String, SelectorError> {
        let mut ident = String::new();
        while let Some(c) = self.peek() {
            if c == '\\' {
                self.pos += 1;
                match self.next() {
                    Some(escaped) => ident.push(escaped),
                    None => return Err(SelectorError::UnexpectedEnd),
                }
            } else if is_ident_char(c) {
                self.pos += 1;
                ident.push(c);
            } else {
                break;
            }
        }

        if ident.is_empty() {
            return Err(match self.peek() {
                Some(c) => self.unexpected(c),
                None => SelectorError::UnexpectedEnd,
            });
        }
        Ok(ident)
    }

    fn parse_string(&mut self, quote: char) -> Result<String, SelectorError> {
        let mut value = String::new();
        loop {
            match self.next() {
                Some(c) if c == quote => return Ok(value),
                Some('\\') => match self.next() {
                    Some(escaped) => value.push(escaped),
                    None => return Err(SelectorError::UnexpectedEnd),
                },
                Some(c) => value.push(c),
                None => return Err(SelectorError::UnexpectedEnd),
            }
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn expect(&mut self, expected: char) -> Result<(), SelectorError> {
        match self.next() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(self.unexpected(c)),
            None => Err(SelectorError::UnexpectedEnd),
        }
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos != start
    }

    fn unexpected(&self, ch: char) -> SelectorError {
        SelectorError::UnexpectedChar { ch, pos: self.pos }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '-' || c == '\\' || !c.is_ascii()
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-' || !c.is_ascii()
}
