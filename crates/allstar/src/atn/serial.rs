//! Compact wire form of an [`Atn`].
//!
//! A grammar is analyzed once, offline; recognizers ship the resulting
//! graph as a flat `u32` stream and rebuild it at startup. The stream is
//! versioned, fully validated on decode, and canonical: encoding a decoded
//! graph reproduces the exact same words.
//!
//! Layout, all values `u32`:
//!
//! ```text
//! version  grammar_kind  max_symbol
//! rule_count  { start  stop  name_len  name_byte... }...
//! state_count { kind  rule  transition_count  { tag  payload... }... }...
//! decision_count  { state }...
//! mode_count      { state }...
//! { action_count  { tag  operand }... }...        (one list per rule)
//! ```

use compact_str::CompactString;
use smallvec::SmallVec;

use super::builder::validate_graph;
use super::{
    Atn, AtnState, DecisionId, GrammarKind, RuleId, RuleSpan, StateId, StateKind, Symbol,
    SymbolSet, Transition,
};
use crate::error::AtnFormatError;
use crate::lexer::LexerAction;

/// Version written by [`encode`]; [`decode`] accepts nothing else.
pub const FORMAT_VERSION: u32 = 1;

/// Serialize the graph into a flat word stream.
#[must_use]
pub fn encode(atn: &Atn) -> Vec<u32> {
    let mut out = Vec::with_capacity(16 + atn.state_count() * 4);
    out.push(FORMAT_VERSION);
    out.push(match atn.grammar_kind {
        GrammarKind::Parser => 0,
        GrammarKind::Lexer => 1,
    });
    out.push(atn.max_symbol);

    out.push(atn.rules.len() as u32);
    for rule in &atn.rules {
        out.push(rule.start.0);
        out.push(rule.stop.0);
        out.push(rule.name.len() as u32);
        out.extend(rule.name.as_bytes().iter().map(|&b| u32::from(b)));
    }

    out.push(atn.states.len() as u32);
    for state in &atn.states {
        out.push(state_kind_tag(state.kind));
        out.push(state.rule.0);
        out.push(state.transitions.len() as u32);
        for transition in &state.transitions {
            encode_transition(&mut out, transition);
        }
    }

    out.push(atn.decisions.len() as u32);
    out.extend(atn.decisions.iter().map(|s| s.0));
    out.push(atn.mode_starts.len() as u32);
    out.extend(atn.mode_starts.iter().map(|s| s.0));

    for actions in &atn.rule_actions {
        out.push(actions.len() as u32);
        for action in actions {
            let (tag, operand) = encode_action(*action);
            out.push(tag);
            out.push(operand);
        }
    }
    out
}

/// Rebuild a graph from its wire form, validating version, tags, and
/// structure.
///
/// # Errors
///
/// Any [`AtnFormatError`]; a stream produced by [`encode`] from a valid
/// [`Atn`] always decodes.
pub fn decode(data: &[u32]) -> Result<Atn, AtnFormatError> {
    let mut r = Reader { data, pos: 0 };

    let version = r.take("header")?;
    if version != FORMAT_VERSION {
        return Err(AtnFormatError::UnsupportedVersion {
            found: version,
            expected: FORMAT_VERSION,
        });
    }
    let grammar_kind = match r.take("header")? {
        0 => GrammarKind::Parser,
        _ => GrammarKind::Lexer,
    };
    let max_symbol: Symbol = r.take("header")?;

    let rule_count = r.take("rules")? as usize;
    let mut rules = Vec::with_capacity(rule_count);
    for _ in 0..rule_count {
        let start = StateId(r.take("rules")?);
        let stop = StateId(r.take("rules")?);
        let name_len = r.take("rules")? as usize;
        let mut bytes = Vec::with_capacity(name_len);
        for _ in 0..name_len {
            bytes.push(r.take("rules")? as u8);
        }
        rules.push(RuleSpan {
            name: CompactString::from(String::from_utf8_lossy(&bytes)),
            start,
            stop,
        });
    }

    let state_count = r.take("states")? as usize;
    let mut states = Vec::with_capacity(state_count);
    for index in 0..state_count {
        let kind = state_kind_from_tag(index, r.take("states")?)?;
        let rule = RuleId(r.take("states")?);
        let transition_count = r.take("states")? as usize;
        let id = StateId(index as u32);
        let mut transitions = SmallVec::with_capacity(transition_count);
        for _ in 0..transition_count {
            transitions.push(decode_transition(&mut r, id)?);
        }
        states.push(AtnState {
            id,
            kind,
            rule,
            decision: None,
            transitions,
        });
    }

    let decision_count = r.take("decisions")? as usize;
    let mut decisions = Vec::with_capacity(decision_count);
    for i in 0..decision_count {
        let state = StateId(r.take("decisions")?);
        if state.index() >= states.len() {
            return Err(AtnFormatError::IndexOutOfRange {
                section: "decisions",
                value: state.0,
            });
        }
        states[state.index()].decision = Some(DecisionId(i as u32));
        decisions.push(state);
    }

    let mode_count = r.take("modes")? as usize;
    let mut mode_starts = Vec::with_capacity(mode_count);
    for _ in 0..mode_count {
        mode_starts.push(StateId(r.take("modes")?));
    }

    let mut rule_actions = Vec::with_capacity(rule_count);
    for rule in 0..rule_count {
        let action_count = r.take("actions")? as usize;
        let mut actions = SmallVec::with_capacity(action_count);
        for _ in 0..action_count {
            let tag = r.take("actions")?;
            let operand = r.take("actions")?;
            actions.push(decode_action(rule, tag, operand)?);
        }
        rule_actions.push(actions);
    }

    validate_tables(&states, &rules, &mode_starts, &rule_actions)?;
    validate_graph(&states)?;

    Ok(Atn {
        grammar_kind,
        states,
        decisions,
        rules,
        max_symbol,
        mode_starts,
        rule_actions,
    })
}

/// Cross-table index checks: every rule, state, transition, mode, and action
/// reference must land inside the decoded tables, and each mode start must
/// carry a decision. Catches streams that decode cleanly but would index out
/// of bounds at the first prediction.
fn validate_tables(
    states: &[AtnState],
    rules: &[RuleSpan],
    mode_starts: &[StateId],
    rule_actions: &[SmallVec<[LexerAction; 1]>],
) -> Result<(), AtnFormatError> {
    let out_of_range = |section, value| AtnFormatError::IndexOutOfRange { section, value };

    for state in states {
        if state.rule.index() >= rules.len() {
            return Err(out_of_range("states", state.rule.0));
        }
        for transition in &state.transitions {
            if let Transition::Rule { rule, .. } | Transition::Predicate { rule, .. } = transition {
                if rule.index() >= rules.len() {
                    return Err(out_of_range("transitions", rule.0));
                }
            }
        }
    }
    for rule in rules {
        if rule.start.index() >= states.len() {
            return Err(out_of_range("rules", rule.start.0));
        }
        if rule.stop.index() >= states.len() {
            return Err(out_of_range("rules", rule.stop.0));
        }
    }
    for (mode, &start) in mode_starts.iter().enumerate() {
        let Some(state) = states.get(start.index()) else {
            return Err(out_of_range("modes", start.0));
        };
        if state.decision.is_none() {
            return Err(AtnFormatError::ModeWithoutDecision { mode, state: start });
        }
    }
    for actions in rule_actions {
        for action in actions {
            if let LexerAction::Mode(mode) | LexerAction::PushMode(mode) = *action {
                if mode >= mode_starts.len() {
                    return Err(out_of_range(
                        "actions",
                        u32::try_from(mode).unwrap_or(u32::MAX),
                    ));
                }
            }
        }
    }
    Ok(())
}

struct Reader<'a> {
    data: &'a [u32],
    pos: usize,
}

impl Reader<'_> {
    fn take(&mut self, section: &'static str) -> Result<u32, AtnFormatError> {
        let word = self
            .data
            .get(self.pos)
            .copied()
            .ok_or(AtnFormatError::Truncated { section })?;
        self.pos += 1;
        Ok(word)
    }
}

const fn state_kind_tag(kind: StateKind) -> u32 {
    match kind {
        StateKind::Basic => 0,
        StateKind::RuleStart => 1,
        StateKind::RuleStop => 2,
        StateKind::BlockStart => 3,
        StateKind::BlockEnd => 4,
        StateKind::PlusLoopEntry => 5,
        StateKind::PlusLoopBack => 6,
        StateKind::StarLoopEntry => 7,
        StateKind::StarLoopBack => 8,
        StateKind::Decision => 9,
    }
}

fn state_kind_from_tag(index: usize, tag: u32) -> Result<StateKind, AtnFormatError> {
    Ok(match tag {
        0 => StateKind::Basic,
        1 => StateKind::RuleStart,
        2 => StateKind::RuleStop,
        3 => StateKind::BlockStart,
        4 => StateKind::BlockEnd,
        5 => StateKind::PlusLoopEntry,
        6 => StateKind::PlusLoopBack,
        7 => StateKind::StarLoopEntry,
        8 => StateKind::StarLoopBack,
        9 => StateKind::Decision,
        _ => return Err(AtnFormatError::InvalidStateKind { index, tag }),
    })
}

fn encode_transition(out: &mut Vec<u32>, transition: &Transition) {
    match *transition {
        Transition::Epsilon { target } => out.extend([0, target.0]),
        Transition::Atom { target, symbol } => out.extend([1, target.0, symbol]),
        Transition::Range { target, from, to } => out.extend([2, target.0, from, to]),
        Transition::Set { target, ref set } => {
            out.extend([3, target.0, set.ranges().len() as u32]);
            for &(lo, hi) in set.ranges() {
                out.extend([lo, hi]);
            }
        }
        Transition::Wildcard { target } => out.extend([4, target.0]),
        Transition::Rule {
            target,
            rule,
            follow,
        } => out.extend([5, target.0, rule.0, follow.0]),
        Transition::Predicate {
            target,
            rule,
            index,
            ctx_dependent,
        } => out.extend([6, target.0, rule.0, index, u32::from(ctx_dependent)]),
        Transition::Action { target, index } => out.extend([7, target.0, index]),
        Transition::Precedence { target, precedence } => out.extend([8, target.0, precedence]),
    }
}

fn decode_transition(r: &mut Reader<'_>, state: StateId) -> Result<Transition, AtnFormatError> {
    let tag = r.take("transitions")?;
    Ok(match tag {
        0 => Transition::Epsilon {
            target: StateId(r.take("transitions")?),
        },
        1 => Transition::Atom {
            target: StateId(r.take("transitions")?),
            symbol: r.take("transitions")?,
        },
        2 => Transition::Range {
            target: StateId(r.take("transitions")?),
            from: r.take("transitions")?,
            to: r.take("transitions")?,
        },
        3 => {
            let target = StateId(r.take("transitions")?);
            let range_count = r.take("transitions")? as usize;
            let mut ranges = Vec::with_capacity(range_count);
            for _ in 0..range_count {
                ranges.push((r.take("transitions")?, r.take("transitions")?));
            }
            Transition::Set {
                target,
                set: SymbolSet::from_ranges(ranges),
            }
        }
        4 => Transition::Wildcard {
            target: StateId(r.take("transitions")?),
        },
        5 => Transition::Rule {
            target: StateId(r.take("transitions")?),
            rule: RuleId(r.take("transitions")?),
            follow: StateId(r.take("transitions")?),
        },
        6 => Transition::Predicate {
            target: StateId(r.take("transitions")?),
            rule: RuleId(r.take("transitions")?),
            index: r.take("transitions")?,
            ctx_dependent: r.take("transitions")? != 0,
        },
        7 => Transition::Action {
            target: StateId(r.take("transitions")?),
            index: r.take("transitions")?,
        },
        8 => Transition::Precedence {
            target: StateId(r.take("transitions")?),
            precedence: r.take("transitions")?,
        },
        _ => return Err(AtnFormatError::InvalidTransitionKind { state, tag }),
    })
}

const fn encode_action(action: LexerAction) -> (u32, u32) {
    match action {
        LexerAction::Skip => (0, 0),
        LexerAction::More => (1, 0),
        LexerAction::TokenType(t) => (2, t),
        LexerAction::Channel(c) => (3, c),
        LexerAction::Mode(m) => (4, m as u32),
        LexerAction::PushMode(m) => (5, m as u32),
        LexerAction::PopMode => (6, 0),
        LexerAction::Custom(i) => (7, i),
    }
}

fn decode_action(rule: usize, tag: u32, operand: u32) -> Result<LexerAction, AtnFormatError> {
    Ok(match tag {
        0 => LexerAction::Skip,
        1 => LexerAction::More,
        2 => LexerAction::TokenType(operand),
        3 => LexerAction::Channel(operand),
        4 => LexerAction::Mode(operand as usize),
        5 => LexerAction::PushMode(operand as usize),
        6 => LexerAction::PopMode,
        7 => LexerAction::Custom(operand),
        _ => return Err(AtnFormatError::InvalidLexerAction { rule, tag }),
    })
}
