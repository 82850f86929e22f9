//! CSS selector parsing.
//! Reference: <https://www.w3.org/TR/selectors-3/>

use crate::{
    Combinator, ComplexSelector, CompoundSelector, SelectorError, SelectorList, SimpleSelector,
};
use core::mem::take;

#[derive(Clone, Debug, PartialEq, Eq)]
/// Internal tokenizer token kinds.
enum Tok {
    /// A combinator token like child/adjacent/general sibling.
    Combinator(Combinator),
    /// Whitespace that implies a descendant combinator.
    DescendantWS,
    /// A simple selector token (type, class, id, attribute, universal).
    Simple(SimpleSelector),
    /// Group separator.
    Comma,
}

/// Tokenizer over a selector string.
struct SelectorTokenizer<'input> {
    /// Underlying bytes of the selector.
    input_bytes: &'input [u8],
    /// Current cursor index into `input_bytes`.
    index: usize,
}

/// True for bytes allowed inside an identifier. Non-ASCII bytes are accepted so
/// UTF-8 class names survive untouched.
#[inline]
const fn is_ident_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' || byte >= 0x80
}

impl<'input> SelectorTokenizer<'input> {
    /// Construct a tokenizer from input.
    #[inline]
    const fn new(input: &'input str) -> Self {
        Self {
            input_bytes: input.as_bytes(),
            index: 0,
        }
    }

    /// Return the next selector token and its starting offset, if any.
    fn next_token(&mut self) -> Result<Option<(usize, Tok)>, SelectorError> {
        let before = self.index;
        self.skip_spaces();
        // Leading and trailing whitespace never form a combinator.
        if self.index != before && before != 0 && self.index < self.input_bytes.len() {
            return Ok(Some((before, Tok::DescendantWS)));
        }
        let start = self.index;
        let Some(&current) = self.input_bytes.get(self.index) else {
            return Ok(None);
        };
        let token = match current {
            b'*' => {
                self.index = self.index.saturating_add(1);
                Tok::Simple(SimpleSelector::Universal)
            }
            b'.' => {
                self.index = self.index.saturating_add(1);
                Tok::Simple(SimpleSelector::Class(self.expect_ident(start)?))
            }
            b'#' => {
                self.index = self.index.saturating_add(1);
                Tok::Simple(SimpleSelector::IdSelector(self.expect_ident(start)?))
            }
            b'[' => self.consume_attr(start)?,
            b'>' => {
                self.index = self.index.saturating_add(1);
                Tok::Combinator(Combinator::Child)
            }
            b'+' => {
                self.index = self.index.saturating_add(1);
                Tok::Combinator(Combinator::AdjacentSibling)
            }
            b'~' => {
                self.index = self.index.saturating_add(1);
                Tok::Combinator(Combinator::GeneralSibling)
            }
            b',' => {
                self.index = self.index.saturating_add(1);
                Tok::Comma
            }
            byte if is_ident_byte(byte) => {
                let ident = self.consume_ident().to_ascii_lowercase();
                Tok::Simple(SimpleSelector::Type(ident))
            }
            _ => return Err(self.unexpected(start)),
        };
        Ok(Some((start, token)))
    }

    /// Consume an identifier consisting of ASCII alphanumerics, '-', '_' and non-ASCII bytes.
    #[inline]
    fn consume_ident(&mut self) -> String {
        let start = self.index;
        while self
            .input_bytes
            .get(self.index)
            .is_some_and(|&byte| is_ident_byte(byte))
        {
            self.index = self.index.saturating_add(1);
        }
        let slice = self.input_bytes.get(start..self.index).unwrap_or(&[]);
        String::from_utf8_lossy(slice).into_owned()
    }

    /// Consume an identifier that must be present (after `.`, `#` or `[`).
    #[inline]
    fn expect_ident(&mut self, token_start: usize) -> Result<String, SelectorError> {
        let ident = self.consume_ident();
        if ident.is_empty() {
            return Err(SelectorError::MissingIdentifier(token_start));
        }
        Ok(ident)
    }

    /// Parse an attribute selector, supporting `[name]` and `[name=value]` (quoted or unquoted).
    fn consume_attr(&mut self, start: usize) -> Result<Tok, SelectorError> {
        // skip '['
        self.index = self.index.saturating_add(1);
        self.skip_spaces();
        let name = self.expect_ident(start)?.to_ascii_lowercase();
        self.skip_spaces();
        let simple = match self.input_bytes.get(self.index) {
            Some(b']') => SimpleSelector::AttrExists(name),
            Some(b'=') => {
                self.index = self.index.saturating_add(1);
                self.skip_spaces();
                let value = match self.input_bytes.get(self.index) {
                    Some(&quote) if quote == b'"' || quote == b'\'' => {
                        let quote_start = self.index;
                        self.index = self.index.saturating_add(1);
                        self.consume_quoted_attr_value(quote, quote_start)?
                    }
                    _ => self.consume_unquoted_attr_value(),
                };
                self.skip_spaces();
                SimpleSelector::AttrEquals { name, value }
            }
            Some(_) => return Err(self.unexpected(self.index)),
            None => return Err(SelectorError::UnterminatedAttribute(start)),
        };
        match self.input_bytes.get(self.index) {
            Some(b']') => {
                self.index = self.index.saturating_add(1);
                Ok(Tok::Simple(simple))
            }
            Some(_) => Err(self.unexpected(self.index)),
            None => Err(SelectorError::UnterminatedAttribute(start)),
        }
    }

    /// Consume an unquoted attribute value until whitespace or a closing bracket.
    #[inline]
    fn consume_unquoted_attr_value(&mut self) -> String {
        let start = self.index;
        while let Some(&byte) = self.input_bytes.get(self.index) {
            if byte.is_ascii_whitespace() || byte == b']' {
                break;
            }
            self.index = self.index.saturating_add(1);
        }
        let slice = self.input_bytes.get(start..self.index).unwrap_or(&[]);
        String::from_utf8_lossy(slice).into_owned()
    }

    /// Consume a quoted attribute value until the matching quote byte.
    #[inline]
    fn consume_quoted_attr_value(
        &mut self,
        quote: u8,
        quote_start: usize,
    ) -> Result<String, SelectorError> {
        let start = self.index;
        while matches!(self.input_bytes.get(self.index), Some(&byte) if byte != quote) {
            self.index = self.index.saturating_add(1);
        }
        if self.input_bytes.get(self.index).is_none() {
            return Err(SelectorError::UnterminatedString(quote_start));
        }
        let slice = self.input_bytes.get(start..self.index).unwrap_or(&[]);
        let out = String::from_utf8_lossy(slice).into_owned();
        self.index = self.index.saturating_add(1);
        Ok(out)
    }

    /// Skip ASCII whitespace.
    #[inline]
    fn skip_spaces(&mut self) {
        while matches!(self.input_bytes.get(self.index), Some(byte) if byte.is_ascii_whitespace()) {
            self.index = self.index.saturating_add(1);
        }
    }

    /// Build an `UnexpectedCharacter` error for the character at `offset`.
    fn unexpected(&self, offset: usize) -> SelectorError {
        let found = self
            .input_bytes
            .get(offset..)
            .and_then(|rest| String::from_utf8_lossy(rest).chars().next())
            .unwrap_or('\u{fffd}');
        SelectorError::UnexpectedCharacter { offset, found }
    }
}

/// Parse a selector list from CSS text.
/// Selectors 3 §3, 4, 5-8, 11
///
/// Groups are split on comma tokens, so commas inside quoted attribute values
/// stay part of the value.
///
/// # Errors
/// Returns a [`SelectorError`] if the list or any of its groups is malformed.
pub fn parse_selector_list(input: &str) -> Result<SelectorList, SelectorError> {
    let mut tokens = SelectorTokenizer::new(input);
    let mut list = SelectorList::default();
    loop {
        let (selector, separator) = parse_group(&mut tokens)?;
        list.selectors.push(selector);
        if separator.is_none() {
            return Ok(list);
        }
    }
}

/// Parse one complex selector.
/// Selectors 3 §11 (combinators) and §5-8 (simple selectors)
///
/// # Errors
/// Returns a [`SelectorError`] for empty input, dangling combinators, a group
/// separator, and anything the tokenizer rejects.
pub fn parse_complex_selector(input: &str) -> Result<ComplexSelector, SelectorError> {
    let mut tokens = SelectorTokenizer::new(input);
    match parse_group(&mut tokens)? {
        (selector, None) => Ok(selector),
        (_, Some(offset)) => Err(tokens.unexpected(offset)),
    }
}

/// Parse tokens up to the next comma or the end of input. Returns the complex
/// selector and the offset of the comma that ended it, if any.
fn parse_group(
    tokens: &mut SelectorTokenizer<'_>,
) -> Result<(ComplexSelector, Option<usize>), SelectorError> {
    let mut first: Option<CompoundSelector> = None;
    let mut rest: Vec<(Combinator, CompoundSelector)> = Vec::new();
    let mut current = CompoundSelector::default();
    // Combinator that sits to the left of `current`.
    let mut leading: Option<Combinator> = None;
    // Combinator seen after `current`, waiting for its right-hand compound.
    let mut pending: Option<(Combinator, usize, bool)> = None;
    let mut separator = None;

    let mut finish = |compound: CompoundSelector, combinator: Option<Combinator>| {
        if first.is_none() {
            first = Some(compound);
        } else {
            rest.push((combinator.unwrap_or(Combinator::Descendant), compound));
        }
    };

    while let Some((offset, token)) = tokens.next_token()? {
        match token {
            Tok::Combinator(comb) => {
                if current.simples.is_empty() || pending.is_some_and(|(_, _, explicit)| explicit) {
                    return Err(SelectorError::DanglingCombinator(offset));
                }
                pending = Some((comb, offset, true));
            }
            Tok::DescendantWS => {
                if pending.is_none() && !current.simples.is_empty() {
                    pending = Some((Combinator::Descendant, offset, false));
                }
            }
            Tok::Simple(simple) => {
                if let Some((comb, _, _)) = pending.take() {
                    finish(take(&mut current), leading);
                    leading = Some(comb);
                }
                current.simples.push(simple);
            }
            Tok::Comma => {
                separator = Some(offset);
                break;
            }
        }
    }

    if let Some((_, offset, true)) = pending {
        return Err(SelectorError::DanglingCombinator(offset));
    }
    if current.simples.is_empty() {
        return Err(SelectorError::Empty);
    }
    finish(current, leading);

    let selector = ComplexSelector {
        first: first.unwrap_or_default(),
        rest,
    };
    Ok((selector, separator))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_then_descendant_keeps_combinator_order() {
        let sel = parse_complex_selector("ul > li .item").unwrap();
        assert_eq!(sel.first.simples, vec![SimpleSelector::Type("ul".into())]);
        assert_eq!(sel.rest.len(), 2);
        assert_eq!(sel.rest[0].0, Combinator::Child);
        assert_eq!(sel.rest[1].0, Combinator::Descendant);
        assert_eq!(sel.rest[1].1.simples, vec![SimpleSelector::Class("item".into())]);
    }

    #[test]
    fn combinators_without_spaces() {
        let sel = parse_complex_selector("a+b~c>d").unwrap();
        let combs: Vec<Combinator> = sel.rest.iter().map(|pair| pair.0).collect();
        assert_eq!(
            combs,
            vec![Combinator::AdjacentSibling, Combinator::GeneralSibling, Combinator::Child]
        );
    }

    #[test]
    fn trailing_whitespace_is_not_a_combinator() {
        let sel = parse_complex_selector(".item   ").unwrap();
        assert!(sel.rest.is_empty());
    }

    #[test]
    fn attribute_forms() {
        let sel = parse_complex_selector("[data-x][data-kind='a b'][Role=tab]").unwrap();
        assert_eq!(
            sel.first.simples,
            vec![
                SimpleSelector::AttrExists("data-x".into()),
                SimpleSelector::AttrEquals { name: "data-kind".into(), value: "a b".into() },
                SimpleSelector::AttrEquals { name: "role".into(), value: "tab".into() },
            ]
        );
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(parse_complex_selector(""), Err(SelectorError::Empty));
        assert_eq!(parse_complex_selector("> a"), Err(SelectorError::DanglingCombinator(0)));
        assert_eq!(parse_complex_selector("a >"), Err(SelectorError::DanglingCombinator(2)));
        assert_eq!(parse_complex_selector("a > > b"), Err(SelectorError::DanglingCombinator(4)));
        assert_eq!(parse_complex_selector("."), Err(SelectorError::MissingIdentifier(0)));
        assert_eq!(parse_complex_selector("[x"), Err(SelectorError::UnterminatedAttribute(0)));
        assert_eq!(parse_complex_selector("[x='y]"), Err(SelectorError::UnterminatedString(3)));
        assert_eq!(
            parse_complex_selector("li:hover"),
            Err(SelectorError::UnexpectedCharacter { offset: 2, found: ':' })
        );
        assert_eq!(parse_selector_list("a,,b"), Err(SelectorError::Empty));
        assert_eq!(parse_selector_list("a,"), Err(SelectorError::Empty));
        assert_eq!(parse_selector_list("a >, b"), Err(SelectorError::DanglingCombinator(2)));
        assert_eq!(
            parse_complex_selector("a, b"),
            Err(SelectorError::UnexpectedCharacter { offset: 1, found: ',' })
        );
    }

    #[test]
    fn commas_inside_quoted_values_stay_in_the_value() {
        let list = parse_selector_list(r#"[data-x="a,b"], li , [title='x, y'] > b"#).unwrap();
        assert_eq!(list.selectors.len(), 3);
        assert_eq!(
            list.selectors[0].first.simples,
            vec![SimpleSelector::AttrEquals { name: "data-x".into(), value: "a,b".into() }]
        );
        assert_eq!(list.selectors[1].first.simples, vec![SimpleSelector::Type("li".into())]);
        assert!(list.selectors[1].rest.is_empty());
        assert_eq!(
            list.selectors[2].first.simples,
            vec![SimpleSelector::AttrEquals { name: "title".into(), value: "x, y".into() }]
        );
        assert_eq!(list.selectors[2].rest[0].0, Combinator::Child);
    }
}
