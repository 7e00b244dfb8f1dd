//! Syntax support for grammar files.
//!
//! ```text
//! // line comment
//! @terminal c, d;
//! @nonterminal S, C;
//! @start S;
//! @rule S := C C;
//! @rule C := c C | d | @empty;
//! ```

use crate::grammar::{Grammar, GrammarDef, GrammarDefError, SymbolID};
use logos::Logos;
use std::ops::Range;

#[derive(Debug, Copy, Clone, PartialEq, Logos)]
#[logos(skip r"([ \t\r\n\f]+|//[^\n]*)")]
enum Token<'source> {
    #[token("@terminal")]
    Terminal,

    #[token("@nonterminal")]
    Nonterminal,

    #[token("@start")]
    Start,

    #[token("@rule")]
    Rule,

    #[token("@empty")]
    Empty,

    #[token(":=")]
    ColonEq,

    #[token("|")]
    VertBar,

    #[token(",")]
    Comma,

    #[token(";")]
    Semicolon,

    #[regex(r"[_\p{XID_Start}][\p{XID_Continue}']*")]
    Ident(&'source str),
}

impl Token<'_> {
    fn describe(&self) -> String {
        match self {
            Token::Terminal => "`@terminal'".into(),
            Token::Nonterminal => "`@nonterminal'".into(),
            Token::Start => "`@start'".into(),
            Token::Rule => "`@rule'".into(),
            Token::Empty => "`@empty'".into(),
            Token::ColonEq => "`:='".into(),
            Token::VertBar => "`|'".into(),
            Token::Comma => "`,'".into(),
            Token::Semicolon => "`;'".into(),
            Token::Ident(name) => format!("identifier `{}'", name),
        }
    }
}

mod ast {
    #[derive(Debug)]
    pub struct Grammar<'s> {
        pub stmts: Vec<Stmt<'s>>,
    }

    #[derive(Debug)]
    pub enum Stmt<'s> {
        TerminalDesc(Vec<Ident<'s>>),
        NonterminalDesc(Vec<Ident<'s>>),
        StartDesc(Ident<'s>),
        RuleDesc(RuleDesc<'s>),
    }

    #[derive(Debug)]
    pub struct RuleDesc<'s> {
        pub left: Ident<'s>,
        pub productions: Vec<Vec<Ident<'s>>>,
    }

    #[derive(Debug, Copy, Clone)]
    pub struct Ident<'s> {
        pub name: &'s str,
        pub offset: usize,
    }
}

/// Parse a grammar file and define the grammar it describes.
pub fn parse(source: &str) -> Result<Grammar, GrammarDefError> {
    let span = tracing::trace_span!("parse");
    let _entered = span.enter();

    let tokens = tokenize(source)?;
    let grammar = Parser {
        source,
        tokens,
        pos: 0,
    }
    .grammar()?;
    tracing::trace!("{} statements", grammar.stmts.len());

    Grammar::define(|g| define_grammar_from_syntax(g, source, &grammar))
}

fn tokenize(source: &str) -> Result<Vec<(Token<'_>, Range<usize>)>, GrammarDefError> {
    let mut lexer = Token::lexer(source);
    let mut tokens = vec![];
    while let Some(token) = lexer.next() {
        match token {
            Ok(token) => tokens.push((token, lexer.span())),
            Err(()) => {
                return Err(syntax_error(
                    source,
                    lexer.span().start,
                    format!("unexpected character(s) `{}'", lexer.slice()),
                ))
            }
        }
    }
    Ok(tokens)
}

/// Convert a byte offset into 1-based line and column numbers.
fn position(source: &str, offset: usize) -> (usize, usize) {
    let before = &source[..offset.min(source.len())];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let column = before[line_start..].chars().count() + 1;
    (line, column)
}

fn syntax_error(source: &str, offset: usize, msg: String) -> GrammarDefError {
    let (line, column) = position(source, offset);
    GrammarDefError::Syntax { line, column, msg }
}

struct Parser<'s> {
    source: &'s str,
    tokens: Vec<(Token<'s>, Range<usize>)>,
    pos: usize,
}

impl<'s> Parser<'s> {
    fn peek(&self) -> Option<Token<'s>> {
        self.tokens.get(self.pos).map(|(token, _)| *token)
    }

    fn bump(&mut self) -> Option<Token<'s>> {
        let token = self.peek()?;
        self.pos += 1;
        Some(token)
    }

    fn offset(&self) -> usize {
        match self.tokens.get(self.pos) {
            Some((_, span)) => span.start,
            None => self.source.len(),
        }
    }

    fn error(&self, expected: &str) -> GrammarDefError {
        let found = match self.peek() {
            Some(token) => token.describe(),
            None => "end of file".into(),
        };
        syntax_error(
            self.source,
            self.offset(),
            format!("expected {}, found {}", expected, found),
        )
    }

    fn expect(&mut self, expected: Token<'static>) -> Result<(), GrammarDefError> {
        if self.peek() == Some(expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&expected.describe()))
        }
    }

    fn ident(&mut self) -> Result<ast::Ident<'s>, GrammarDefError> {
        let offset = self.offset();
        match self.peek() {
            Some(Token::Ident(name)) => {
                self.pos += 1;
                Ok(ast::Ident { name, offset })
            }
            _ => Err(self.error("an identifier")),
        }
    }

    fn grammar(&mut self) -> Result<ast::Grammar<'s>, GrammarDefError> {
        let mut stmts = vec![];
        while self.peek().is_some() {
            stmts.push(self.stmt()?);
        }
        Ok(ast::Grammar { stmts })
    }

    fn stmt(&mut self) -> Result<ast::Stmt<'s>, GrammarDefError> {
        let stmt = match self.peek() {
            Some(Token::Terminal) => {
                self.bump();
                ast::Stmt::TerminalDesc(self.idents()?)
            }
            Some(Token::Nonterminal) => {
                self.bump();
                ast::Stmt::NonterminalDesc(self.idents()?)
            }
            Some(Token::Start) => {
                self.bump();
                ast::Stmt::StartDesc(self.ident()?)
            }
            Some(Token::Rule) => {
                self.bump();
                ast::Stmt::RuleDesc(self.rule_desc()?)
            }
            _ => return Err(self.error("`@terminal', `@nonterminal', `@start' or `@rule'")),
        };
        self.expect(Token::Semicolon)?;
        Ok(stmt)
    }

    fn idents(&mut self) -> Result<Vec<ast::Ident<'s>>, GrammarDefError> {
        let mut idents = vec![self.ident()?];
        while self.peek() == Some(Token::Comma) {
            self.bump();
            idents.push(self.ident()?);
        }
        Ok(idents)
    }

    fn rule_desc(&mut self) -> Result<ast::RuleDesc<'s>, GrammarDefError> {
        let left = self.ident()?;
        self.expect(Token::ColonEq)?;

        // A leading `|` is allowed.
        if self.peek() == Some(Token::VertBar) {
            self.bump();
        }

        let mut productions = vec![self.production()?];
        while self.peek() == Some(Token::VertBar) {
            self.bump();
            productions.push(self.production()?);
        }

        Ok(ast::RuleDesc { left, productions })
    }

    fn production(&mut self) -> Result<Vec<ast::Ident<'s>>, GrammarDefError> {
        if self.peek() == Some(Token::Empty) {
            self.bump();
            return Ok(vec![]);
        }

        let mut elems = vec![self.ident()?];
        while let Some(Token::Ident(..)) = self.peek() {
            elems.push(self.ident()?);
        }
        Ok(elems)
    }
}

fn define_grammar_from_syntax(
    g: &mut GrammarDef<'_>,
    source: &str,
    grammar: &ast::Grammar<'_>,
) -> Result<(), GrammarDefError> {
    // Declarations first, so that rules may refer to symbols declared later.
    for stmt in &grammar.stmts {
        match stmt {
            ast::Stmt::TerminalDesc(idents) => {
                for ident in idents {
                    g.terminal(ident.name)?;
                }
            }
            ast::Stmt::NonterminalDesc(idents) => {
                for ident in idents {
                    g.nonterminal(ident.name)?;
                }
            }
            _ => (),
        }
    }

    // Symbols that have not appeared yet are interpreted as nonterminals
    // when they occur on the left-hand side of a rule.
    let mut first_head = None;
    for stmt in &grammar.stmts {
        if let ast::Stmt::RuleDesc(ast::RuleDesc { left, .. }) = stmt {
            let id = match g.symbol(left.name) {
                Ok(SymbolID::N(id)) => id,
                Ok(SymbolID::T(..)) => {
                    return Err(syntax_error(
                        source,
                        left.offset,
                        format!("the terminal symbol `{}' cannot have rules", left.name),
                    ))
                }
                Err(..) => g.nonterminal(left.name)?,
            };
            first_head.get_or_insert(id);
        }
    }

    let mut start = None;
    for stmt in &grammar.stmts {
        match stmt {
            ast::Stmt::RuleDesc(ast::RuleDesc { left, productions }) => {
                let left = match g.symbol(left.name)? {
                    SymbolID::N(id) => id,
                    SymbolID::T(..) => unreachable!(),
                };
                for production in productions {
                    let right = production
                        .iter()
                        .map(|elem| g.symbol(elem.name))
                        .collect::<Result<Vec<_>, _>>()?;
                    g.rule(left, right)?;
                }
            }
            ast::Stmt::StartDesc(ident) => match g.symbol(ident.name)? {
                SymbolID::N(id) => start = Some(id),
                SymbolID::T(..) => {
                    return Err(syntax_error(
                        source,
                        ident.offset,
                        format!("the start symbol `{}' must be a nonterminal", ident.name),
                    ))
                }
            },
            _ => (),
        }
    }

    if let Some(start) = start.or(first_head) {
        g.start_symbol(start)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_cc_grammar() {
        let g = parse(
            r#"
            // The classic example.
            @terminal c, d;
            @nonterminal S, C;
            @start S;
            @rule S := C C;
            @rule C := c C | d;
            "#,
        )
        .unwrap();
        eprintln!("{}", g);

        assert_eq!(g.terminals.len(), 3);
        assert_eq!(g.nonterminals.len(), 3);
        assert_eq!(g.rules.len(), 4);
        assert_eq!(g.nonterminals[&g.start_symbol].name(), "S");
    }

    #[test]
    fn rule_heads_are_nonterminals() {
        let g = parse(
            r#"
            @terminal a, b;
            @rule S := A B | b;
            @rule A := a A | @empty;
            @rule B := | A b S | @empty;
            "#,
        )
        .unwrap();

        assert!(g.nonterminal("A").is_some());
        assert!(g.nonterminal("B").is_some());
        assert_eq!(g.nonterminals[&g.start_symbol].name(), "S");
        let empty = g
            .rules_of(g.nonterminal("A").unwrap())
            .filter(|rule| rule.right().is_empty())
            .count();
        assert_eq!(empty, 1);
    }

    #[test]
    fn explicit_start_symbol() {
        let g = parse(
            r#"
            @terminal x;
            @rule A := B x;
            @rule B := x;
            @start B;
            "#,
        )
        .unwrap();
        assert_eq!(g.start_symbol, g.nonterminal("B").unwrap());
    }

    #[test]
    fn undefined_symbol_in_rule() {
        let err = parse("@terminal a; @rule S := a X;").unwrap_err();
        assert!(matches!(err, GrammarDefError::UndefinedSymbol { ref name } if name == "X"));
    }

    #[test]
    fn syntax_error_position() {
        let err = parse("@terminal a;\n@rule S = a;").unwrap_err();
        match err {
            GrammarDefError::Syntax { line, column, .. } => {
                assert_eq!((line, column), (2, 9));
            }
            err => panic!("unexpected error: {}", err),
        }

        let err = parse("@terminal a").unwrap_err();
        assert!(matches!(err, GrammarDefError::Syntax { line: 1, .. }));

        let err = parse("@terminal a;\n  # oops").unwrap_err();
        assert!(matches!(err, GrammarDefError::Syntax { line: 2, column: 3, .. }));
    }

    #[test]
    fn terminal_cannot_be_rule_head() {
        let err = parse("@terminal a; @rule a := a;").unwrap_err();
        assert!(matches!(err, GrammarDefError::Syntax { .. }));
    }

    #[test]
    fn unicode_names() {
        let g = parse("@terminal café, 数; @rule 式' := café 数 | @empty;").unwrap();
        assert!(g.terminal("café").is_some());
        assert!(g.terminal("数").is_some());
        assert!(g.nonterminal("式'").is_some());

        let err = parse("@terminal a;\n@rule S := a §;").unwrap_err();
        assert!(matches!(err, GrammarDefError::Syntax { line: 2, .. }));
    }

    #[test]
    fn duplicate_declaration() {
        let err = parse("@terminal a, a;").unwrap_err();
        assert!(matches!(err, GrammarDefError::DuplicateSymbol { .. }));
    }
}
