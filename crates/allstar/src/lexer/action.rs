//! Actions attached to lexer rules.
//!
//! A lexer rule can carry a list of actions that run after the rule wins a
//! match: routing the token to a channel, switching modes, skipping the
//! text, or invoking user code. Actions are data in the ATN so that a
//! serialized grammar round-trips them; only [`LexerAction::Custom`] needs
//! a callback at simulation time.

use crate::atn::RuleId;

/// One post-match command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LexerAction {
    /// Discard the matched text; no token is produced.
    Skip,
    /// Keep the matched text and continue it with the next match; the token
    /// is emitted by a later rule without `More`.
    More,
    /// Override the token type (the default is the matching rule's index).
    TokenType(u32),
    /// Route the token to a channel other than the default channel 0.
    Channel(u32),
    /// Switch to the given mode.
    Mode(usize),
    /// Push the current mode and switch to the given one.
    PushMode(usize),
    /// Return to the mode active before the matching [`PushMode`].
    ///
    /// [`PushMode`]: LexerAction::PushMode
    PopMode,
    /// Invoke user code identified by an opaque index via [`LexerActionSink`].
    Custom(u32),
}

/// Receiver for [`LexerAction::Custom`] dispatches.
pub trait LexerActionSink {
    fn custom_action(&mut self, rule: RuleId, index: u32);
}

/// Sink that ignores custom actions; for grammars that have none.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCustomActions;

impl LexerActionSink for NoCustomActions {
    fn custom_action(&mut self, _rule: RuleId, _index: u32) {}
}
