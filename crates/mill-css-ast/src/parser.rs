//! Lossless CSS parser
//!
//! Tokens come from `cssparser`; node boundaries and raws are cut from the
//! exact source slices between token positions. Every byte of the input ends
//! up either in a node payload or in a node's [`Raws`](crate::Raws), which is
//! what lets the printer reproduce untouched regions exactly. The parser is
//! forgiving: it only fails on structurally unrecoverable input (unclosed
//! blocks, comments or strings and stray closing braces at the top level).

use crate::error::{CssError, CssResult, Location};
use crate::node::{AtRule, Comment, Decl, NodeData, NodeId, NodeKind, Raws, Rule, Source};
use crate::tree::Tree;
use cssparser::{ParseError, Parser as TokenStream, ParserInput, SourcePosition, Token};
use std::path::Path;
use std::sync::Arc;

/// Parse stylesheet text. `file` is recorded on every node's [`Source`].
pub fn parse(css: &str, file: Option<&Path>) -> CssResult<Tree> {
    let tree = Parser::new(css, file).run()?;
    tracing::debug!(
        file = ?file,
        bytes = css.len(),
        nodes = tree.arena_len(),
        "Parsed stylesheet"
    );
    Ok(tree)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminator {
    Semicolon,
    Open,
    /// End of input, or the closing brace of the enclosing block
    End,
}

struct Parser<'a> {
    src: &'a str,
    file: Option<Arc<Path>>,
    line_starts: Vec<usize>,
    tree: Tree,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str, file: Option<&Path>) -> Self {
        let line_starts = std::iter::once(0)
            .chain(src.match_indices('\n').map(|(idx, _)| idx + 1))
            .collect();
        Self {
            src,
            file: file.map(Arc::from),
            line_starts,
            tree: Tree::new(),
        }
    }

    fn run(mut self) -> CssResult<Tree> {
        let root = self.tree.root();
        self.tree.get_mut(root).source = Some(self.source(0));
        let mut input = ParserInput::new(self.src);
        let mut tokens = TokenStream::new(&mut input);
        self.parse_body(&mut tokens, root)?;
        Ok(self.tree)
    }

    fn line_col(&self, offset: usize) -> (usize, usize) {
        let line_idx = self
            .line_starts
            .partition_point(|start| *start <= offset)
            .saturating_sub(1);
        let line_start = self.line_starts.get(line_idx).copied().unwrap_or(0);
        let column = self
            .src
            .get(line_start..offset)
            .map_or(0, |line| line.chars().count())
            + 1;
        (line_idx + 1, column)
    }

    fn source(&self, offset: usize) -> Source {
        let (line, column) = self.line_col(offset);
        Source {
            file: self.file.clone(),
            offset,
            line,
            column,
        }
    }

    fn location(&self, position: SourcePosition) -> Location {
        let (line, column) = self.line_col(position.byte_index());
        Location::new(self.file.as_deref(), line, column)
    }

    fn add(&mut self, parent: NodeId, kind: NodeKind, raws: Raws, start: SourcePosition) -> NodeId {
        let mut data = NodeData::new(kind);
        data.raws = raws;
        data.source = Some(self.source(start.byte_index()));
        data.fresh = false;
        let id = self.tree.push(data);
        self.tree.append(parent, id);
        id
    }

    /// Parse nodes until the end of `tokens`: EOF for the root, the closing
    /// brace for a block.
    fn parse_body(&mut self, tokens: &mut TokenStream<'a, '_>, parent: NodeId) -> CssResult<()> {
        loop {
            // Whitespace plus stray semicolons, kept verbatim as the next node's `before`
            let spacing = tokens.position();
            let (start, token) = loop {
                let start = tokens.position();
                match tokens.next_including_whitespace_and_comments() {
                    Ok(Token::WhiteSpace(_) | Token::Semicolon) => continue,
                    Ok(token) => break (start, Some(token.clone())),
                    Err(_) => break (start, None),
                }
            };
            let before = tokens.slice(spacing..start).to_string();

            match token {
                None => {
                    self.tree.get_mut(parent).raws.after = before;
                    return Ok(());
                }
                Some(Token::CloseCurlyBracket) => {
                    return Err(CssError::UnexpectedClose {
                        location: self.location(start),
                    })
                }
                Some(Token::Comment(text)) => {
                    self.check_token(tokens, &Token::Comment(text), start)?;
                    let raws = Raws {
                        before,
                        ..Raws::default()
                    };
                    let comment = Comment {
                        text: text.to_string(),
                    };
                    self.add(parent, NodeKind::Comment(comment), raws, start);
                }
                Some(Token::AtKeyword(_)) => self.at_rule(tokens, parent, before, start)?,
                Some(first) => self.statement(tokens, parent, before, start, &first)?,
            }
        }
    }

    fn at_rule(
        &mut self,
        tokens: &mut TokenStream<'a, '_>,
        parent: NodeId,
        before: String,
        start: SourcePosition,
    ) -> CssResult<()> {
        let keyword = tokens.slice_from(start);
        let name = keyword.strip_prefix('@').unwrap_or(keyword).to_string();

        let rest = tokens.position();
        let (end, terminator) = self.scan_statement(tokens)?;
        let text = tokens.slice(rest..end);
        let params_start = text.len() - text.trim_start().len();
        let after_name = text[..params_start].to_string();
        let params = text[params_start..].trim_end().to_string();
        let between = text[params_start + params.len()..].to_string();

        let block = terminator == Terminator::Open;
        let raws = Raws {
            before,
            after_name,
            between,
            semicolon: terminator == Terminator::Semicolon,
            ..Raws::default()
        };
        let node = self.add(
            parent,
            NodeKind::AtRule(AtRule {
                name,
                params,
                block,
            }),
            raws,
            start,
        );
        self.finish_statement(tokens, node, end, terminator)
    }

    fn statement(
        &mut self,
        tokens: &mut TokenStream<'a, '_>,
        parent: NodeId,
        before: String,
        start: SourcePosition,
        first: &Token<'a>,
    ) -> CssResult<()> {
        let (end, terminator) = match first {
            Token::CurlyBracketBlock => (start, Terminator::Open),
            token => {
                self.check_token(tokens, token, start)?;
                self.scan_statement(tokens)?
            }
        };
        let text = tokens.slice(start..end);

        if terminator == Terminator::Open {
            let selector = text.trim_end().to_string();
            let raws = Raws {
                before,
                between: text[selector.len()..].to_string(),
                ..Raws::default()
            };
            let node = self.add(parent, NodeKind::Rule(Rule { selector }), raws, start);
            return self.finish_statement(tokens, node, end, terminator);
        }

        let (prop, between, value, after) = split_declaration(text);
        let raws = Raws {
            before,
            between,
            after,
            semicolon: terminator == Terminator::Semicolon,
            ..Raws::default()
        };
        let node = self.add(parent, NodeKind::Decl(Decl { prop, value }), raws, start);
        self.finish_statement(tokens, node, end, terminator)
    }

    /// Consume tokens up to the first `;` or `{` of the current block level.
    /// Returns where the terminator starts.
    fn scan_statement(
        &self,
        tokens: &mut TokenStream<'a, '_>,
    ) -> CssResult<(SourcePosition, Terminator)> {
        loop {
            let start = tokens.position();
            let token = match tokens.next_including_whitespace_and_comments() {
                Ok(token) => token.clone(),
                Err(_) => return Ok((tokens.position(), Terminator::End)),
            };
            match token {
                Token::Semicolon => return Ok((start, Terminator::Semicolon)),
                Token::CurlyBracketBlock => return Ok((start, Terminator::Open)),
                Token::CloseCurlyBracket => {
                    return Err(CssError::UnexpectedClose {
                        location: self.location(start),
                    })
                }
                other => self.check_token(tokens, &other, start)?,
            }
        }
    }

    fn finish_statement(
        &mut self,
        tokens: &mut TokenStream<'a, '_>,
        node: NodeId,
        open: SourcePosition,
        terminator: Terminator,
    ) -> CssResult<()> {
        if terminator != Terminator::Open {
            return Ok(());
        }
        let mut outcome = Ok(());
        // Tokens are only left over after an error, which `outcome` carries
        let _ = tokens.parse_nested_block(|block| {
            outcome = self.parse_body(block, node);
            Ok::<_, ParseError<'a, ()>>(())
        });
        outcome?;
        if !tokens.slice_from(open).ends_with('}') {
            return Err(CssError::UnclosedBlock {
                location: self.location(open),
            });
        }
        Ok(())
    }

    /// Reject the unterminated forms `cssparser` silently closes at EOF
    fn check_token(
        &self,
        tokens: &mut TokenStream<'a, '_>,
        token: &Token<'a>,
        start: SourcePosition,
    ) -> CssResult<()> {
        match token {
            Token::QuotedString(_) if closes_string(tokens.slice_from(start)) => Ok(()),
            Token::QuotedString(_) | Token::BadString(_) => Err(CssError::UnclosedString {
                location: self.location(start),
            }),
            Token::Comment(_) => {
                let raw = tokens.slice_from(start);
                if raw.len() >= 4 && raw.ends_with("*/") {
                    Ok(())
                } else {
                    Err(CssError::UnclosedComment {
                        location: self.location(start),
                    })
                }
            }
            Token::Function(_) | Token::ParenthesisBlock => self.check_nested(tokens, start, ')'),
            Token::SquareBracketBlock => self.check_nested(tokens, start, ']'),
            Token::CurlyBracketBlock => self.check_nested(tokens, start, '}'),
            _ => Ok(()),
        }
    }

    fn check_nested(
        &self,
        tokens: &mut TokenStream<'a, '_>,
        open: SourcePosition,
        close: char,
    ) -> CssResult<()> {
        let mut outcome = Ok(());
        let _ = tokens.parse_nested_block(|block| {
            outcome = self.check_all(block);
            Ok::<_, ParseError<'a, ()>>(())
        });
        outcome?;
        if tokens.slice_from(open).ends_with(close) {
            Ok(())
        } else {
            Err(CssError::UnclosedBlock {
                location: self.location(open),
            })
        }
    }

    fn check_all(&self, tokens: &mut TokenStream<'a, '_>) -> CssResult<()> {
        loop {
            let start = tokens.position();
            let token = match tokens.next_including_whitespace_and_comments() {
                Ok(token) => token.clone(),
                Err(_) => return Ok(()),
            };
            self.check_token(tokens, &token, start)?;
        }
    }
}

/// `raw` is a whole quoted string token: its closing quote is present and not escaped
fn closes_string(raw: &str) -> bool {
    let Some(quote) = raw.chars().next() else {
        return false;
    };
    let Some(body) = raw[quote.len_utf8()..].strip_suffix(quote) else {
        return false;
    };
    let escapes = body.chars().rev().take_while(|ch| *ch == '\\').count();
    escapes % 2 == 0
}

/// Split `prop : value  ` into (prop, ` : `, value, trailing whitespace)
fn split_declaration(text: &str) -> (String, String, String, String) {
    let Some(colon) = text.find(':') else {
        let prop = text.trim_end();
        return (
            prop.to_string(),
            String::new(),
            String::new(),
            text[prop.len()..].to_string(),
        );
    };

    let prop = text[..colon].trim_end();
    let rest = &text[colon + 1..];
    let value_start = colon + 1 + (rest.len() - rest.trim_start().len());
    let value = text[value_start..].trim_end();
    (
        prop.to_string(),
        text[prop.len()..value_start].to_string(),
        value.to_string(),
        text[value_start + value.len()..].to_string(),
    )
}
