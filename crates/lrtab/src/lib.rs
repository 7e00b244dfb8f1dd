//! LR(0), SLR(1), LALR(1) and canonical LR(1) table generator.
//!
//! ```
//! use lrtab::{grammar::Grammar, table::{compute, Config}};
//! use lrtab_runtime::engine::parse;
//!
//! let g = Grammar::from_str("@terminal c, d; @rule S := C C; @rule C := c C | d;").unwrap();
//! let generated = compute(&g, Config::new().use_lalr());
//! assert!(generated.table.is_conflict_free());
//!
//! let input = g.terminal_sequence("c c d d").unwrap();
//! assert!(parse(&generated.table, &input).is_accepted());
//! ```

pub mod collection;
pub mod first_sets;
pub mod follow_sets;
pub mod grammar;
pub mod item;
pub mod merge;
pub mod syntax;
pub mod table;
pub mod trace;
pub mod types;
pub mod util;
