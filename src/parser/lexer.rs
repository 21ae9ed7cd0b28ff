use std::fmt::Display;

use itertools::{Itertools, PeekingNext};

use super::{CompileErrorType, Result};
use crate::grammar::Marker;

#[derive(PartialEq, Debug, Clone)]
pub enum Token {
    Arrow,
    StarArrow,
    Or,
    Epsilon,
    Nonterminal(String, Option<Marker>),
    Terminal(String)
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Arrow => write!(f, "->"),
            Token::StarArrow => write!(f, "*>"),
            Token::Or => write!(f, "|"),
            Token::Epsilon => write!(f, "€"),
            Token::Nonterminal(name, Some(Marker::Clear)) => write!(f, "&{}", name),
            Token::Nonterminal(name, Some(Marker::Delete)) => write!(f, "%{}", name),
            Token::Nonterminal(name, None) => write!(f, "{}", name),
            Token::Terminal(text) => write!(f, "{:?}", text),
        }
    }
}

pub fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

pub fn lex_terminal(line: &mut impl Iterator<Item = char>) -> Result<Token> {
    // The open quote decides which quote closes the string
    let quote = line.next().ok_or(CompileErrorType::UnmatchedQuote)?;
    let mut token_text = String::new();

    loop {
        match line.next() {
            None => return Err(CompileErrorType::UnmatchedQuote),
            Some(c) if c == quote => break,
            Some('\\') => token_text.push(match line.next() {
                Some('\\') => '\\',
                Some('\'') => '\'',
                Some('\"') => '\"',
                Some('n') => '\n',
                Some('t') => '\t',
                Some(other) => return Err(CompileErrorType::UnknownEscape(other)),
                None => return Err(CompileErrorType::UnmatchedQuote),
            }),
            Some(c) => token_text.push(c),
        }
    }

    Ok(Token::Terminal(token_text))
}

pub fn lex_nonterminal(line: &mut impl PeekingNext<Item = char>) -> Result<Token> {
    let marker = line.peeking_next(|&c| Marker::from_char(c).is_some()).and_then(Marker::from_char);
    let name: String = line.peeking_take_while(|&c| is_name_char(c)).collect();

    if name.is_empty() {
        return match line.next() {
            Some(c) => Err(CompileErrorType::UnexpectedCharacter(c)),
            None => Err(CompileErrorType::MissingNonterminal),
        };
    }

    Ok(Token::Nonterminal(name, marker))
}

// Lexes a two character arrow whose first character has been peeked
fn lex_arrow(line: &mut impl Iterator<Item = char>, token: Token) -> Result<Token> {
    let first = line.next();
    match line.next() {
        Some('>') => Ok(token),
        _ => Err(CompileErrorType::UnexpectedCharacter(first.unwrap_or('>'))),
    }
}

pub fn lex_line(line: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();

    let mut line_chars = line.chars().peekable();

    while let Some(&c) = line_chars.peek() {
        match c {
            // Comment until the end of the line
            '#' => break,
            '|' => {
                line_chars.next();
                tokens.push(Token::Or);
            }
            '€' | 'ε' => {
                line_chars.next();
                tokens.push(Token::Epsilon);
            }
            '-' => tokens.push(lex_arrow(&mut line_chars, Token::Arrow)?),
            '*' => tokens.push(lex_arrow(&mut line_chars, Token::StarArrow)?),
            '\"' | '\'' => tokens.push(lex_terminal(&mut line_chars)?),
            c if c.is_whitespace() => {
                line_chars.next();
            }
            c if is_name_char(c) || Marker::from_char(c).is_some() => {
                tokens.push(lex_nonterminal(&mut line_chars)?)
            }
            c => return Err(CompileErrorType::UnexpectedCharacter(c)),
        }
    }

    Ok(tokens)
}
