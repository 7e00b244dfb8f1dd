//! Parse table definition.

/// The trait for abstracting the generated LR parse table.
pub trait ParseTable {
    /// The number to identify the state of LR automaton.
    type State: Copy + Eq;

    /// The number to identify the terminal symbols.
    type Terminal: Copy + Eq;

    /// The number to identify the nonterminal symbols.
    type Nonterminal: Copy;

    /// The number to identify the production rules.
    type Rule: Copy;

    /// Return the initial state number.
    fn initial_state(&self) -> Self::State;

    /// Return the terminal symbol that marks the end of input.
    fn end_of_input(&self) -> Self::Terminal;

    /// Return the action corresponding to the specified state number and
    /// lookahead symbol, or `None` if the table has no entry for them.
    fn action(
        &self,
        current: Self::State,
        lookahead: Self::Terminal,
    ) -> Option<ParseAction<Self::State, Self::Rule, Self::Nonterminal>>;

    /// Return the state to move to after a reduction to `symbol`.
    fn goto(&self, current: Self::State, symbol: Self::Nonterminal) -> Option<Self::State>;
}

macro_rules! impl_parse_table_for_pointer {
    ($($Ptr:ty),*) => {$(
        impl<T: ?Sized> ParseTable for $Ptr
        where
            T: ParseTable,
        {
            type State = T::State;
            type Terminal = T::Terminal;
            type Nonterminal = T::Nonterminal;
            type Rule = T::Rule;

            #[inline]
            fn initial_state(&self) -> Self::State {
                (**self).initial_state()
            }

            #[inline]
            fn end_of_input(&self) -> Self::Terminal {
                (**self).end_of_input()
            }

            #[inline]
            fn action(
                &self,
                current: Self::State,
                lookahead: Self::Terminal,
            ) -> Option<ParseAction<Self::State, Self::Rule, Self::Nonterminal>> {
                (**self).action(current, lookahead)
            }

            #[inline]
            fn goto(&self, current: Self::State, symbol: Self::Nonterminal) -> Option<Self::State> {
                (**self).goto(current, symbol)
            }
        }
    )*};
}

impl_parse_table_for_pointer!(&T, std::rc::Rc<T>, std::sync::Arc<T>);

/// The action that the parser performs on a particular lookahead symbol.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseAction<TState, TRule, TNonterminal> {
    /// Push the lookahead symbol and move to the specified state.
    Shift(TState),

    /// Reduce by `rule`, whose left-hand side is `lhs` and whose right-hand
    /// side has `len` symbols.
    Reduce {
        rule: TRule,
        lhs: TNonterminal,
        len: usize,
    },

    /// Accept the input.
    Accept,
}
