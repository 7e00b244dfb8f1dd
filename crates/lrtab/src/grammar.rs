//! Grammar types.

use crate::{types::Map, util::display_fn};
use std::{fmt, fs, io, marker::PhantomData, path::Path};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TerminalID {
    raw: u16,
}

impl TerminalID {
    /// Reserved symbol used as a terminal symbol that means the end of input.
    pub const EOI: Self = Self::from_raw(0);

    const OFFSET: u16 = 1;

    #[inline]
    pub const fn from_raw(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn into_raw(self) -> u16 {
        self.raw
    }
}

#[derive(Debug)]
pub struct Terminal {
    id: TerminalID,
    name: String,
}

impl Terminal {
    pub fn id(&self) -> TerminalID {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NonterminalID {
    raw: u16,
}

impl NonterminalID {
    /// Reserved symbol used as the left-hand side of the augmented start rule.
    pub const START: Self = Self::from_raw(0);

    const OFFSET: u16 = 1;

    #[inline]
    pub const fn from_raw(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn into_raw(self) -> u16 {
        self.raw
    }
}

#[derive(Debug)]
pub struct Nonterminal {
    id: NonterminalID,
    name: String,
}

impl Nonterminal {
    pub fn id(&self) -> NonterminalID {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Nonterminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymbolID {
    T(TerminalID),
    N(NonterminalID),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct RuleID {
    raw: u16,
}

impl RuleID {
    /// The augmented rule `$start := S`.
    pub const ACCEPT: Self = Self::from_raw(0);

    const OFFSET: u16 = 1;

    #[inline]
    pub const fn from_raw(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn into_raw(self) -> u16 {
        self.raw
    }
}

impl fmt::Display for RuleID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.raw, f)
    }
}

/// The type that represents a production rule in grammar.
#[derive(Debug)]
pub struct Rule {
    id: RuleID,
    left: NonterminalID,
    right: Vec<SymbolID>,
}

impl Rule {
    pub fn id(&self) -> RuleID {
        self.id
    }

    /// Return the left-hand side of this production.
    pub fn left(&self) -> NonterminalID {
        self.left
    }

    /// Return the right-hand side of this production.
    pub fn right(&self) -> &[SymbolID] {
        &self.right[..]
    }

    // `"LHS := R1 R2 R3"`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            write!(f, "{} :=", g.nonterminals[&self.left])?;
            if self.right.is_empty() {
                f.write_str(" @empty")?;
            }
            for symbol in &self.right {
                write!(f, " {}", g.symbol_name(*symbol))?;
            }
            Ok(())
        })
    }
}

/// The grammar definition used to derive the parser tables.
#[derive(Debug)]
#[non_exhaustive]
pub struct Grammar {
    pub terminals: Map<TerminalID, Terminal>,
    pub nonterminals: Map<NonterminalID, Nonterminal>,
    pub rules: Map<RuleID, Rule>,
    pub start_symbol: NonterminalID,
    names: Map<String, SymbolID>,
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## terminals:")?;
        for terminal in self.terminals.values() {
            writeln!(f, "{}", terminal)?;
        }

        writeln!(f, "\n## nonterminals:")?;
        for nonterminal in self.nonterminals.values() {
            write!(f, "{}", nonterminal)?;
            if nonterminal.id() == self.start_symbol {
                write!(f, " (start)")?;
            }
            writeln!(f)?;
        }

        writeln!(f, "\n## rules:")?;
        for rule in self.rules.values() {
            writeln!(f, "{:>3}: {}", rule.id(), rule.display(self))?;
        }

        Ok(())
    }
}

impl Grammar {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Grammar, GrammarDefError> {
        let source = fs::read_to_string(path).map_err(GrammarDefError::IO)?;
        Self::from_str(&source)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(source: &str) -> Result<Grammar, GrammarDefError> {
        crate::syntax::parse(source)
    }

    /// Define a grammar using the specified function.
    pub fn define<F>(f: F) -> Result<Self, GrammarDefError>
    where
        F: FnOnce(&mut GrammarDef) -> Result<(), GrammarDefError>,
    {
        let mut def = GrammarDef {
            terminals: Map::default(),
            nonterminals: Map::default(),
            rules: Map::default(),
            names: Map::default(),
            start: None,
            next_terminal_id: TerminalID::OFFSET,
            next_nonterminal_id: NonterminalID::OFFSET,
            next_rule_id: RuleID::OFFSET,
            _marker: PhantomData,
        };

        def.terminals.insert(
            TerminalID::EOI,
            Terminal {
                id: TerminalID::EOI,
                name: "$end".into(),
            },
        );
        def.nonterminals.insert(
            NonterminalID::START,
            Nonterminal {
                id: NonterminalID::START,
                name: "$start".into(),
            },
        );

        f(&mut def)?;

        def.end()
    }

    pub fn rule(&self, id: RuleID) -> &Rule {
        &self.rules[&id]
    }

    /// Return the production rules whose left-hand side is `left`.
    pub fn rules_of(&self, left: NonterminalID) -> impl Iterator<Item = &Rule> + '_ {
        self.rules.values().filter(move |rule| rule.left() == left)
    }

    pub fn symbol_name(&self, symbol: SymbolID) -> &str {
        match symbol {
            SymbolID::T(t) => self.terminals[&t].name(),
            SymbolID::N(n) => self.nonterminals[&n].name(),
        }
    }

    /// Look up a user-declared symbol by its name.
    pub fn symbol(&self, name: &str) -> Option<SymbolID> {
        self.names.get(name).copied()
    }

    pub fn terminal(&self, name: &str) -> Option<TerminalID> {
        match self.symbol(name)? {
            SymbolID::T(t) => Some(t),
            SymbolID::N(..) => None,
        }
    }

    pub fn nonterminal(&self, name: &str) -> Option<NonterminalID> {
        match self.symbol(name)? {
            SymbolID::N(n) => Some(n),
            SymbolID::T(..) => None,
        }
    }

    /// Convert whitespace-separated terminal names into a terminal sequence.
    ///
    /// `$end` is accepted as the explicit end-of-input marker, as the last
    /// name only.
    pub fn terminal_sequence(&self, input: &str) -> Result<Vec<TerminalID>, GrammarDefError> {
        let terminals = input
            .split_whitespace()
            .map(|name| match name {
                "$end" => Ok(TerminalID::EOI),
                name => self
                    .terminal(name)
                    .ok_or_else(|| GrammarDefError::UndefinedSymbol {
                        name: name.to_owned(),
                    }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        if let Some((_, init)) = terminals.split_last() {
            if init.contains(&TerminalID::EOI) {
                return Err(GrammarDefError::MisplacedEndMarker);
            }
        }
        Ok(terminals)
    }

    /// Enumerate the symbols that can appear after the marker of an item,
    /// ordered by their names.
    ///
    /// The reserved symbols `$end` and `$start` never occur in a right-hand
    /// side and are therefore excluded.
    pub fn symbols(&self) -> Vec<SymbolID> {
        let mut symbols: Vec<(&str, SymbolID)> = self
            .names
            .iter()
            .map(|(name, symbol)| (name.as_str(), *symbol))
            .collect();
        symbols.sort_by(|(a, _), (b, _)| a.as_bytes().cmp(b.as_bytes()));
        symbols.into_iter().map(|(_, symbol)| symbol).collect()
    }
}

/// The contextural values for building a `Grammar`.
#[derive(Debug)]
pub struct GrammarDef<'def> {
    terminals: Map<TerminalID, Terminal>,
    nonterminals: Map<NonterminalID, Nonterminal>,
    rules: Map<RuleID, Rule>,
    names: Map<String, SymbolID>,
    start: Option<NonterminalID>,
    next_terminal_id: u16,
    next_nonterminal_id: u16,
    next_rule_id: u16,
    _marker: PhantomData<&'def mut ()>,
}

impl<'def> GrammarDef<'def> {
    /// Declare a terminal symbol used in this grammar.
    pub fn terminal(&mut self, name: &str) -> Result<TerminalID, GrammarDefError> {
        self.check_new_name(name)?;

        let id = TerminalID::from_raw(self.next_terminal_id);
        self.next_terminal_id += 1;

        self.terminals.insert(
            id,
            Terminal {
                id,
                name: name.to_owned(),
            },
        );
        self.names.insert(name.to_owned(), SymbolID::T(id));

        Ok(id)
    }

    /// Declare a nonterminal symbol used in this grammar.
    pub fn nonterminal(&mut self, name: &str) -> Result<NonterminalID, GrammarDefError> {
        self.check_new_name(name)?;

        let id = NonterminalID::from_raw(self.next_nonterminal_id);
        self.next_nonterminal_id += 1;

        self.nonterminals.insert(
            id,
            Nonterminal {
                id,
                name: name.to_owned(),
            },
        );
        self.names.insert(name.to_owned(), SymbolID::N(id));

        Ok(id)
    }

    /// Look up a symbol that has already been declared.
    pub fn symbol(&self, name: &str) -> Result<SymbolID, GrammarDefError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| GrammarDefError::UndefinedSymbol {
                name: name.to_owned(),
            })
    }

    /// Specify a production rule into this grammer.
    pub fn rule<I>(&mut self, left: NonterminalID, right: I) -> Result<RuleID, GrammarDefError>
    where
        I: IntoIterator<Item = SymbolID>,
    {
        let right: Vec<SymbolID> = right.into_iter().collect();

        if left == NonterminalID::START {
            return Err(GrammarDefError::ReservedSymbol);
        }
        self.check_registered(SymbolID::N(left))?;
        for symbol in &right {
            if matches!(
                symbol,
                SymbolID::T(TerminalID::EOI) | SymbolID::N(NonterminalID::START)
            ) {
                return Err(GrammarDefError::ReservedSymbol);
            }
            self.check_registered(*symbol)?;
        }

        if self
            .rules
            .values()
            .any(|rule| rule.left == left && rule.right == right)
        {
            let mut rendered = format!("{} :=", self.nonterminals[&left]);
            for symbol in &right {
                rendered.push(' ');
                rendered.push_str(self.name_of(*symbol));
            }
            return Err(GrammarDefError::DuplicateRule { rule: rendered });
        }

        let id = RuleID::from_raw(self.next_rule_id);
        self.next_rule_id += 1;
        self.rules.insert(id, Rule { id, left, right });

        Ok(id)
    }

    /// Specify the start symbol for this grammar.
    pub fn start_symbol(&mut self, symbol: NonterminalID) -> Result<(), GrammarDefError> {
        if symbol == NonterminalID::START {
            return Err(GrammarDefError::ReservedSymbol);
        }
        self.check_registered(SymbolID::N(symbol))?;
        self.start.replace(symbol);
        Ok(())
    }

    fn check_new_name(&self, name: &str) -> Result<(), GrammarDefError> {
        if !verify_ident(name) {
            return Err(GrammarDefError::InvalidName {
                name: name.to_owned(),
            });
        }
        if self.names.contains_key(name) {
            return Err(GrammarDefError::DuplicateSymbol {
                name: name.to_owned(),
            });
        }
        Ok(())
    }

    fn check_registered(&self, symbol: SymbolID) -> Result<(), GrammarDefError> {
        let registered = match symbol {
            SymbolID::T(t) => self.terminals.contains_key(&t),
            SymbolID::N(n) => self.nonterminals.contains_key(&n),
        };
        if registered {
            Ok(())
        } else {
            Err(GrammarDefError::UndefinedSymbol {
                name: match symbol {
                    SymbolID::T(t) => format!("<terminal #{}>", t.into_raw()),
                    SymbolID::N(n) => format!("<nonterminal #{}>", n.into_raw()),
                },
            })
        }
    }

    fn name_of(&self, symbol: SymbolID) -> &str {
        match symbol {
            SymbolID::T(t) => self.terminals[&t].name(),
            SymbolID::N(n) => self.nonterminals[&n].name(),
        }
    }

    fn end(mut self) -> Result<Grammar, GrammarDefError> {
        // When no start symbol is specified, the first declared nonterminal is used.
        let start = match self.start.take() {
            Some(start) => start,
            None => self
                .nonterminals
                .keys()
                .find(|id| **id != NonterminalID::START)
                .copied()
                .ok_or(GrammarDefError::MissingStart)?,
        };

        for nonterminal in self.nonterminals.values() {
            if nonterminal.id != NonterminalID::START
                && self.rules.values().all(|rule| rule.left != nonterminal.id)
            {
                tracing::warn!(
                    "the nonterminal `{}' has no associated production rule",
                    nonterminal
                );
            }
        }

        // Rule 0 is the augmented rule; keep it first in iteration order.
        let mut rules = Map::default();
        rules.insert(
            RuleID::ACCEPT,
            Rule {
                id: RuleID::ACCEPT,
                left: NonterminalID::START,
                right: vec![SymbolID::N(start)],
            },
        );
        rules.extend(self.rules);

        Ok(Grammar {
            terminals: self.terminals,
            nonterminals: self.nonterminals,
            rules,
            start_symbol: start,
            names: self.names,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GrammarDefError {
    #[error("IO error: {}", _0)]
    IO(#[source] io::Error),

    #[error("syntax error at {}:{}: {}", line, column, msg)]
    Syntax {
        line: usize,
        column: usize,
        msg: String,
    },

    #[error("undefined symbol: `{}'", name)]
    UndefinedSymbol { name: String },

    #[error("the symbol `{}' has already been declared", name)]
    DuplicateSymbol { name: String },

    #[error("duplicate production rule detected: {}", rule)]
    DuplicateRule { rule: String },

    #[error("incorrect symbol name: `{}'", name)]
    InvalidName { name: String },

    #[error("reserved symbols cannot be used in production rules")]
    ReservedSymbol,

    #[error("the grammar has no nonterminal symbols")]
    MissingStart,

    #[error("the end-of-input marker must be the last input symbol")]
    MisplacedEndMarker,
}

fn verify_ident(s: &str) -> bool {
    let mut chars = s.chars();
    let first = match chars.next() {
        Some(ch) => ch,
        // The identifier must not be empty.
        None => return false,
    };
    if first != '_' && !unicode_ident::is_xid_start(first) {
        return false;
    }
    // Trailing primes are allowed, as in `E'`.
    chars.all(|ch| ch == '\'' || unicode_ident::is_xid_continue(ch))
}

#[cfg(test)]
mod tests {
    use super::*;
    use SymbolID::*;

    #[test]
    fn augmented_rule_comes_first() {
        let g = Grammar::define(|g| {
            let a = g.terminal("a")?;
            let s = g.nonterminal("S")?;
            g.rule(s, [T(a), N(s)])?;
            g.rule(s, [T(a)])?;
            Ok(())
        })
        .unwrap();

        let (id, rule) = g.rules.first().unwrap();
        assert_eq!(*id, RuleID::ACCEPT);
        assert_eq!(rule.left(), NonterminalID::START);
        assert_eq!(rule.right(), &[N(g.start_symbol)]);
        assert_eq!(g.rules_of(NonterminalID::START).count(), 1);
        assert_eq!(g.rules.len(), 3);
    }

    #[test]
    fn undefined_symbol() {
        let err = Grammar::define(|g| {
            let s = g.nonterminal("S")?;
            let x = g.symbol("x")?;
            g.rule(s, [x])?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarDefError::UndefinedSymbol { ref name } if name == "x"));
    }

    #[test]
    fn name_classified_once() {
        let err = Grammar::define(|g| {
            g.terminal("x")?;
            g.nonterminal("x")?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarDefError::DuplicateSymbol { .. }));
    }

    #[test]
    fn duplicate_rule() {
        let err = Grammar::define(|g| {
            let a = g.terminal("a")?;
            let s = g.nonterminal("S")?;
            g.rule(s, [T(a)])?;
            g.rule(s, [T(a)])?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarDefError::DuplicateRule { .. }));
    }

    #[test]
    fn reserved_symbols_rejected() {
        let err = Grammar::define(|g| {
            let s = g.nonterminal("S")?;
            g.rule(s, [T(TerminalID::EOI)])?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarDefError::ReservedSymbol));
    }

    #[test]
    fn invalid_names() {
        assert!(verify_ident("E'"));
        assert!(verify_ident("_x1"));
        assert!(!verify_ident(""));
        assert!(!verify_ident("1x"));
        assert!(!verify_ident("$end"));
    }

    #[test]
    fn terminal_sequence_from_names() {
        let g = Grammar::define(|g| {
            let a = g.terminal("a")?;
            let s = g.nonterminal("S")?;
            g.rule(s, [T(a)])?;
            Ok(())
        })
        .unwrap();
        let a = g.terminal("a").unwrap();
        assert_eq!(g.terminal_sequence(" a  a $end").unwrap(), [a, a, TerminalID::EOI]);
        assert!(g.terminal_sequence("").unwrap().is_empty());
        assert!(matches!(
            g.terminal_sequence("a S"),
            Err(GrammarDefError::UndefinedSymbol { ref name }) if name == "S"
        ));
        assert!(matches!(
            g.terminal_sequence("a $end a"),
            Err(GrammarDefError::MisplacedEndMarker)
        ));
        assert!(matches!(
            g.terminal_sequence("$end $end"),
            Err(GrammarDefError::MisplacedEndMarker)
        ));
        assert_eq!(g.terminal_sequence("$end").unwrap(), [TerminalID::EOI]);
    }

    #[test]
    fn symbols_are_ordered_by_name() {
        let g = Grammar::define(|g| {
            let c = g.terminal("c")?;
            let d = g.terminal("d")?;
            let s = g.nonterminal("S")?;
            let cc = g.nonterminal("C")?;
            g.rule(s, [N(cc), N(cc)])?;
            g.rule(cc, [T(c), N(cc)])?;
            g.rule(cc, [T(d)])?;
            Ok(())
        })
        .unwrap();
        let names: Vec<_> = g.symbols().into_iter().map(|s| g.symbol_name(s)).collect();
        assert_eq!(names, ["C", "S", "c", "d"]);
    }
}
