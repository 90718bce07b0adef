//! Single-pass stylesheet partitioning.
//!
//! Walks the top-level rules of a stylesheet with `cssparser`, working on byte
//! offsets into the original text so extracted rules and the residual keep their
//! exact source formatting. Nested rules are never inspected: an `@media` inside
//! `@supports` stays wherever its parent goes.
//!
//! The walk is tolerant of anything a browser would skip (`*zoom: 1`, unknown
//! at-rules, invalid selectors). Only structural damage that makes byte ranges
//! meaningless is an error: unclosed blocks, comments or strings, and a stray
//! `}` at the top level.

use std::ops::Range;

use cssparser::{ParseError, Parser, ParserInput, SourceLocation, Token};
use thiserror::Error;

use super::breakpoint::Breakpoints;
use super::classify::ParsedRuleHeader;
use super::storage::MediaStorage;
use crate::debug;

/// A top-level `@media` rule located in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
struct MediaRuleSpan {
    /// From the end of the previous top-level token, so removal also takes the
    /// whitespace that separated the rule from what came before.
    removal: Range<usize>,
    /// The rule itself: `@media <prelude> { ... }`.
    rule: Range<usize>,
    prelude: Range<usize>,
}

/// Residual stylesheet plus the filled partition storage.
#[derive(Debug)]
pub struct Partitioned {
    pub residual: String,
    pub storage: MediaStorage,
    /// Number of rules moved out of the residual.
    pub moved: usize,
}

/// A stylesheet too damaged to cut apart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at {line}:{column}")]
pub struct CssSyntaxError {
    pub kind: &'static str,
    /// 1-based.
    pub line: u32,
    pub column: u32,
}

impl CssSyntaxError {
    fn at(kind: &'static str, location: SourceLocation) -> Self {
        Self {
            kind,
            line: location.line + 1,
            column: location.column,
        }
    }
}

/// Partition `css` by the breakpoint table.
///
/// Every top-level `@media` rule ends up in exactly one place: the residual
/// stylesheet, or one partition of the returned storage.
pub fn partition_stylesheet(
    css: &str,
    breakpoints: &Breakpoints,
    unit: &str,
) -> Result<Partitioned, CssSyntaxError> {
    let mut storage = MediaStorage::new();
    let mut removed: Vec<Range<usize>> = Vec::new();

    for span in top_level_media_rules(css)? {
        let header = ParsedRuleHeader::parse(&css[span.prelude.clone()]);
        let Some(resolution) = header.resolution_in(unit) else {
            continue;
        };
        let Some(breakpoint) = breakpoints.ceiling(resolution) else {
            debug!("split"; "`{}` exceeds every breakpoint, kept in place", header.raw_condition);
            continue;
        };

        storage.add_media(
            &breakpoint.partition_name,
            &css[span.rule.clone()],
            header.raw_condition,
        );
        removed.push(span.removal);
    }

    Ok(Partitioned {
        residual: residual_of(css, &removed),
        moved: removed.len(),
        storage,
    })
}

/// Source text with `removed` ranges cut out.
fn residual_of(css: &str, removed: &[Range<usize>]) -> String {
    if removed.is_empty() {
        return css.to_string();
    }

    let mut residual = String::with_capacity(css.len());
    let mut cursor = 0;
    for range in removed {
        residual.push_str(&css[cursor..range.start]);
        cursor = range.end;
    }
    residual.push_str(&css[cursor..]);

    // Whitespace that followed a removed leading rule now leads the sheet.
    if removed[0].start == 0 {
        residual.trim_start().to_string()
    } else {
        residual
    }
}

/// Locate every top-level `@media` block rule.
fn top_level_media_rules(css: &str) -> Result<Vec<MediaRuleSpan>, CssSyntaxError> {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    let mut spans = Vec::new();
    // End of the last non-whitespace top-level token.
    let mut last_end = 0;

    loop {
        let start = parser.position().byte_index();
        let location = parser.current_source_location();
        let token = match parser.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };

        match token {
            Token::WhiteSpace(_) => continue,
            Token::AtKeyword(ref name) if name.eq_ignore_ascii_case("media") => {
                if let Some((prelude, end)) = read_block_rule(&mut parser)? {
                    spans.push(MediaRuleSpan {
                        removal: last_end..end,
                        rule: start..end,
                        prelude,
                    });
                }
            }
            Token::CloseCurlyBracket => {
                return Err(CssSyntaxError::at("unexpected `}`", location));
            }
            ref other => {
                let raw = &css[start..parser.position().byte_index()];
                check_terminated(other, raw, location)?;
                if opens_block(other) {
                    skip_block(&mut parser, other, location)?;
                }
            }
        }
        last_end = parser.position().byte_index();
    }

    Ok(spans)
}

/// Consume an at-rule prelude and its `{}` block.
///
/// Returns the prelude range and the end offset of the block, or `None` for
/// statement at-rules (`@media print;`) and preludes cut off by end of input.
fn read_block_rule(
    parser: &mut Parser<'_, '_>,
) -> Result<Option<(Range<usize>, usize)>, CssSyntaxError> {
    let prelude_start = parser.position().byte_index();
    loop {
        let location = parser.current_source_location();
        let Ok(token) = parser.next_including_whitespace_and_comments() else {
            return Ok(None);
        };
        let token = token.clone();
        match token {
            Token::CurlyBracketBlock => {
                // Position sits just past the `{`.
                let prelude_end = parser.position().byte_index() - 1;
                skip_block(parser, &token, location)?;
                return Ok(Some((prelude_start..prelude_end, parser.position().byte_index())));
            }
            Token::Semicolon => return Ok(None),
            Token::BadString(_) => return Err(CssSyntaxError::at("unclosed string", location)),
            ref other if opens_block(other) => skip_block(parser, other, location)?,
            _ => {}
        }
    }
}

fn opens_block(token: &Token<'_>) -> bool {
    matches!(
        token,
        Token::CurlyBracketBlock
            | Token::ParenthesisBlock
            | Token::SquareBracketBlock
            | Token::Function(_)
    )
}

/// Comments and strings that run into the end of input.
fn check_terminated(
    token: &Token<'_>,
    raw: &str,
    location: SourceLocation,
) -> Result<(), CssSyntaxError> {
    let terminated = match token {
        Token::Comment(_) => raw.len() >= 4 && raw.ends_with("*/"),
        Token::QuotedString(_) => closes_quote(raw),
        Token::BadString(_) => false,
        _ => true,
    };
    if terminated {
        return Ok(());
    }
    let kind = match token {
        Token::Comment(_) => "unclosed comment",
        _ => "unclosed string",
    };
    Err(CssSyntaxError::at(kind, location))
}

/// Whether a raw quoted string ends with its own, unescaped, quote.
fn closes_quote(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    let [quote, inner @ .., last] = bytes else {
        return false;
    };
    let escapes = inner.iter().rev().take_while(|&&b| b == b'\\').count();
    last == quote && escapes % 2 == 0
}

/// Consume the rest of the block `opener` just opened, including its closing
/// bracket.
fn skip_block<'i>(
    parser: &mut Parser<'i, '_>,
    opener: &Token<'_>,
    opened_at: SourceLocation,
) -> Result<(), CssSyntaxError> {
    let mut inner_end = 0;
    let mut nested = Ok(());
    let _ = parser.parse_nested_block(|p| {
        loop {
            let location = p.current_source_location();
            let Ok(token) = p.next_including_whitespace_and_comments() else {
                break;
            };
            let token = token.clone();
            if let Token::BadString(_) = token {
                nested = Err(CssSyntaxError::at("unclosed string", location));
                break;
            }
            if opens_block(&token) {
                nested = skip_block(p, &token, location);
                if nested.is_err() {
                    break;
                }
            }
        }
        inner_end = p.position().byte_index();
        Ok::<_, ParseError<'i, ()>>(())
    });
    nested?;

    // Nothing consumed after the block body means end of input, not a closer.
    if parser.position().byte_index() > inner_end {
        return Ok(());
    }
    let kind = match opener {
        Token::CurlyBracketBlock => "unclosed block",
        _ => "unclosed bracket",
    };
    Err(CssSyntaxError::at(kind, opened_at))
}
