/*
    This module parses grammar rule files
*/

mod lexer;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::error_handling::*;
use crate::grammar::*;
use lexer::*;

#[derive(Debug, Error)]
pub enum CompileErrorType {
    // There is an unclosed quote
    #[error("Unmatched quotes")]
    UnmatchedQuote,
    // A backslash is followed by something that is not an escape
    #[error("Unknown escape sequence `\\{0}`")]
    UnknownEscape(char),
    // A character that starts no token
    #[error("Unexpected character `{0}`")]
    UnexpectedCharacter(char),
    // The user starts a rule line with something other than a nonterminal
    #[error("Tried to define something other than a nonterminal")]
    MissingNonterminal,
    // A line which should contain a rule does not
    #[error("Expected `->` or `*>` after nonterminal")]
    MissingArrow,
    // An arrow shows up inside an alternative
    #[error("Unexpected `{0}` in alternative")]
    UnexpectedToken(String),
    // The epsilon symbol is mixed with other symbols
    #[error("`€` must stand alone in its alternative")]
    MisplacedEpsilon,
    // `&` or `%` in front of a referenced nonterminal
    #[error("Marker on referenced nonterminal `{0}`")]
    MarkerOnReference(String),
    // Somehow a full rewrite was parsed as a base alternative
    // This is a problem with cfparse, not the grammar
    #[error("Rewrite was not fully split (this is a problem with cfparse, not the grammar)")]
    UnsplitRewrite,
    // A blank line got too deep into the parser
    // This is a problem with cfparse, not the grammar
    #[error("Blank line encountered in rule parser (this is a problem with cfparse, not the grammar)")]
    UnexpectedBlankLine,
    // There was an issue with reading a file
    #[error("File error: {0}")]
    FileError(#[from] std::io::Error),
}

impl ErrorType for CompileErrorType {}

impl PartialEq for CompileErrorType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CompileErrorType::FileError(a), CompileErrorType::FileError(b)) => a.kind() == b.kind(),
            (CompileErrorType::UnknownEscape(a), CompileErrorType::UnknownEscape(b)) => a == b,
            (CompileErrorType::UnexpectedCharacter(a), CompileErrorType::UnexpectedCharacter(b)) => a == b,
            (CompileErrorType::UnexpectedToken(a), CompileErrorType::UnexpectedToken(b)) => a == b,
            (CompileErrorType::MarkerOnReference(a), CompileErrorType::MarkerOnReference(b)) => a == b,
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

pub type CompileError = Error<CompileErrorType>;

fn io_error(error: std::io::Error, file: PathBuf) -> CompileError {
    CompileError {
        location: Location {
            file,
            line: 0
        },
        error: CompileErrorType::FileError(error)
    }
}

pub type Result<T> = std::result::Result<T, CompileErrorType>;
pub type LineResult<T> = std::result::Result<T, CompileError>;
pub type FileResult<T> = std::result::Result<T, CompileError>;

fn parse_alternative(tokens: &[Token], names: &mut NameTable) -> Result<Rule> {
    if let [Token::Epsilon] = tokens {
        return Ok(Rule::new());
    }

    let mut rule = Rule::new();
    for token in tokens {
        match token {
            Token::Arrow | Token::StarArrow => return Err(CompileErrorType::UnexpectedToken(token.to_string())),
            Token::Or => return Err(CompileErrorType::UnsplitRewrite),
            Token::Epsilon => return Err(CompileErrorType::MisplacedEpsilon),
            Token::Nonterminal(name, Some(_)) => return Err(CompileErrorType::MarkerOnReference(name.clone())),
            Token::Nonterminal(name, None) => rule.push(Symbol::Nonterminal(names.intern(name))),
            // Every character of a string is its own terminal
            Token::Terminal(text) => rule.extend(text.chars().map(Symbol::Terminal)),
        }
    }
    Ok(rule)
}

fn parse_line(tokens: &[Token], names: &mut NameTable) -> Result<Vec<Production>> {
    // Try to get the token the rule is for. The match returns a result which
    // is then unwrapped with the ? operator
    let (name, marker) = match tokens.first() {
        Some(Token::Nonterminal(name, marker)) => Ok((name, *marker)),
        Some(_) => Err(CompileErrorType::MissingNonterminal),
        None => Err(CompileErrorType::UnexpectedBlankLine)
    }?;

    let resolve = match tokens.get(1) {
        Some(Token::Arrow) => false,
        Some(Token::StarArrow) => true,
        _ => return Err(CompileErrorType::MissingArrow)
    };

    let from = names.intern(name);
    tokens[2..]
        .split(|t| *t == Token::Or)
        .map(|alternative| {
            parse_alternative(alternative, names).map(|rule| Production {
                from,
                rule,
                resolve,
                marker
            })
        })
        .collect()
}

fn parse_lex_line(line: &str, location: Location, names: &mut NameTable) -> LineResult<Vec<Production>> {
    lexer::lex_line(line)
        .and_then(|lexed_line| parse_line(&lexed_line, names))
        .map_err(|error| CompileError { location, error })
}

fn is_rule_line(line: &str) -> bool {
    let line = line.trim_start();
    !line.is_empty() && !line.starts_with('#')
}

// The lines of a source that hold rules, numbered from 1
fn rule_lines(source: &str) -> impl Iterator<Item = (usize, &str)> {
    source
        .lines()
        .enumerate()
        .filter(|(_, line)| is_rule_line(line))
        .map(|(num, line)| (num + 1, line))
}

/// Parses every rule line of `source`, one result per line, so the caller
/// can decide whether a bad line is fatal.
pub fn parse_source(source: &str, file: &Path, names: &mut NameTable) -> Vec<LineResult<Vec<Production>>> {
    rule_lines(source)
        .map(|(num, line)| {
            parse_lex_line(line, Location {
                file: file.to_path_buf(),
                line: num
            }, names)
        })
        .collect()
}

pub fn parse_file(path: &Path, names: &mut NameTable) -> FileResult<Vec<LineResult<Vec<Production>>>> {
    let source = std::fs::read_to_string(path).map_err(|e| io_error(e, path.to_path_buf()))?;
    Ok(parse_source(&source, path, names))
}
