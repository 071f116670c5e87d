// SPDX-FileCopyrightText: 2026 Strongroom Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Splitting an input line into chained sub-commands.
//!
//! Input arrives already split on whitespace. A small state machine walks the
//! tokens, gluing quoted spans (`"like this"` or `'like this'`) back into a
//! single literal word, then the words are grouped on the `&&` operator.
//! An operator inside quotes is a literal word. A span that is still open at
//! the end of input is an error and nothing runs.

use strongroom_core::{CHAIN_OPERATOR, StrongroomError};

const QUOTES: [char; 2] = ['"', '\''];

/// One lexed word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Word {
    pub(crate) text: String,
    /// Came from a quoted span, so never an operator or placeholder.
    pub(crate) quoted: bool,
}

impl Word {
    pub(crate) fn bare(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quoted: false,
        }
    }

    pub(crate) fn literal(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quoted: true,
        }
    }

    fn is_operator(&self) -> bool {
        !self.quoted && self.text == CHAIN_OPERATOR
    }
}

enum Lexer {
    Bare,
    Quoted { quote: char, buf: String },
}

/// Merge quoted spans in `tokens` into literal words.
pub(crate) fn lex<S: AsRef<str>>(tokens: &[S]) -> Result<Vec<Word>, StrongroomError> {
    let mut words = Vec::with_capacity(tokens.len());
    let mut state = Lexer::Bare;

    for token in tokens.iter().map(AsRef::as_ref) {
        state = match state {
            Lexer::Bare => match token.chars().next().filter(|c| QUOTES.contains(c)) {
                Some(quote) => {
                    let body = &token[quote.len_utf8()..];
                    match body.strip_suffix(quote) {
                        Some(inner) => {
                            words.push(Word::literal(inner));
                            Lexer::Bare
                        }
                        None => Lexer::Quoted {
                            quote,
                            buf: body.to_string(),
                        },
                    }
                }
                None => {
                    words.push(Word::bare(token));
                    Lexer::Bare
                }
            },
            Lexer::Quoted { quote, mut buf } => {
                buf.push(' ');
                match token.strip_suffix(quote) {
                    Some(tail) => {
                        buf.push_str(tail);
                        words.push(Word::literal(buf));
                        Lexer::Bare
                    }
                    None => {
                        buf.push_str(token);
                        Lexer::Quoted { quote, buf }
                    }
                }
            }
        };
    }

    match state {
        Lexer::Bare => Ok(words),
        Lexer::Quoted { .. } => Err(StrongroomError::UnterminatedQuote),
    }
}

/// Group words on unquoted operators, dropping empty slots.
pub(crate) fn group(words: Vec<Word>) -> Vec<Vec<String>> {
    let mut commands = Vec::new();
    let mut current = Vec::new();
    for word in words {
        if word.is_operator() {
            if !current.is_empty() {
                commands.push(std::mem::take(&mut current));
            }
        } else {
            current.push(word.text);
        }
    }
    if !current.is_empty() {
        commands.push(current);
    }
    commands
}

/// Split a token list into sub-command argument vectors.
pub fn split<S: AsRef<str>>(tokens: &[S]) -> Result<Vec<Vec<String>>, StrongroomError> {
    Ok(group(lex(tokens)?))
}

/// Merge quoted spans and strip the quotes, keeping operators as words.
pub fn unquote<S: AsRef<str>>(tokens: &[S]) -> Result<Vec<String>, StrongroomError> {
    Ok(lex(tokens)?.into_iter().map(|w| w.text).collect())
}

/// Whitespace tokenization used for interactive lines.
pub fn tokenize(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}
