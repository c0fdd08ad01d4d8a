//! Human-readable rendering of a DFA.
//!
//! Debug aid for inspecting what prediction has learned so far: one line
//! per cached edge, for example
//!
//! ```text
//! s0-'a'->s1
//! s1-'b'->:s2=>1
//! ```
//!
//! Accept states render as `:sN=>alt`; states marked for full-context
//! escalation carry a `^` suffix. Symbol spelling is delegated to a
//! [`Vocabulary`] so the same serializer covers token streams and code
//! points.

use std::fmt;

use compact_str::{format_compact, CompactString};

use super::{Dfa, DfaStateView};
use crate::atn::{Symbol, EOF};

/// Maps raw symbols to display names.
pub trait Vocabulary {
    fn symbol_name(&self, symbol: Symbol) -> CompactString;
}

/// Spells symbols as bare numbers; `EOF` as `EOF`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumericVocabulary;

impl Vocabulary for NumericVocabulary {
    fn symbol_name(&self, symbol: Symbol) -> CompactString {
        if symbol == EOF {
            CompactString::const_new("EOF")
        } else {
            format_compact!("{symbol}")
        }
    }
}

/// Spells symbols as quoted characters, non-characters as `U+XXXX`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodePointVocabulary;

impl Vocabulary for CodePointVocabulary {
    fn symbol_name(&self, symbol: Symbol) -> CompactString {
        if symbol == EOF {
            return CompactString::const_new("EOF");
        }
        match char::from_u32(symbol) {
            Some(c) if !c.is_control() => format_compact!("'{c}'"),
            _ => format_compact!("U+{symbol:04X}"),
        }
    }
}

/// Named token types, indexed by symbol; out-of-range symbols fall back to
/// numbers.
#[derive(Debug, Clone, Copy)]
pub struct TokenVocabulary<'a> {
    names: &'a [&'a str],
}

impl<'a> TokenVocabulary<'a> {
    #[must_use]
    pub const fn new(names: &'a [&'a str]) -> Self {
        Self { names }
    }
}

impl Vocabulary for TokenVocabulary<'_> {
    fn symbol_name(&self, symbol: Symbol) -> CompactString {
        match self.names.get(symbol as usize) {
            Some(name) => CompactString::from(*name),
            None => NumericVocabulary.symbol_name(symbol),
        }
    }
}

/// Borrows a DFA and renders a point-in-time snapshot through [`fmt::Display`].
pub struct DfaSerializer<'a> {
    dfa: &'a Dfa,
    vocabulary: &'a dyn Vocabulary,
}

impl<'a> DfaSerializer<'a> {
    #[must_use]
    pub fn new(dfa: &'a Dfa, vocabulary: &'a dyn Vocabulary) -> Self {
        Self { dfa, vocabulary }
    }
}

impl fmt::Display for DfaSerializer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let states = self.dfa.snapshot();
        for state in &states {
            for &(symbol, to) in &state.edges {
                write_state(f, state)?;
                write!(f, "-{}->", self.vocabulary.symbol_name(symbol))?;
                write_state(f, &states[to.index()])?;
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

fn write_state(f: &mut fmt::Formatter<'_>, state: &DfaStateView) -> fmt::Result {
    if let Some(alt) = state.accept {
        write!(f, ":s{}=>{alt}", state.id.0)
    } else if state.requires_full_context {
        write!(f, "s{}^", state.id.0)
    } else {
        write!(f, "s{}", state.id.0)
    }
}
