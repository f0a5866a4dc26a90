//! Modal command parsing for normal mode.
//!
//! Two tries are keyed by [`KeyPress`] sequences: the operator trie carries
//! actions (optionally requiring a trailing motion), the motion trie carries
//! motions. A command is `[count] operator-path [count] motion-path`; counts
//! are decimal runs starting with `1..=9`. The parser is a resumable state
//! machine: keys are buffered until a full command (or an unknown prefix)
//! can be consumed, so feeding keys one at a time and in bursts is
//! equivalent. Resolution is pure; the caller dispatches the returned
//! commands.
//!
//! Aliases are operators whose dispatch re-injects a key sequence at the
//! front of the buffer. When a count precedes an alias, the count's digits
//! are injected first and a literal leading number in the alias body is
//! dropped in its favor; a body starting with `0` instead extends the
//! injected count, since `0` never starts one.

use std::collections::{HashMap, VecDeque};

use core_events::{Key, KeyPress};
use smallvec::SmallVec;
use tracing::{debug, warn};

/// Counts saturate here rather than wrapping.
pub const COUNT_MAX: usize = 999_999;

/// Actions an operator leaf can carry. `Alias` is internal to the parser;
/// it never reaches the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalAction {
    Quit,
    SaveAndQuit,
    EnterInsert,
    DeleteSel,
    DeleteRune,
    Undo,
    Redo,
    PageUp,
    PageDown,
    Alias(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalMotion {
    Left,
    Right,
    Up,
    Down,
    GotoLine,
    GotoColumn,
    LineEnd,
}

/// A fully parsed command. A count of 0 means "no count given"; dispatchers
/// treat it as 1 unless the command gives 0 a meaning (like `G`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedCommand {
    Action {
        action: NormalAction,
        count: usize,
    },
    Motion {
        motion: NormalMotion,
        count: usize,
        /// The pending operator to run after the motion, with its own count.
        op: Option<(NormalAction, usize)>,
    },
    /// An unmatched key sequence, reported for diagnostics.
    Unknown {
        keys: Vec<KeyPress>,
    },
}

#[derive(Default)]
struct OpNode {
    action: Option<NormalAction>,
    requires_motion: bool,
    children: HashMap<KeyPress, usize>,
}

#[derive(Default)]
struct MotionNode {
    motion: Option<NormalMotion>,
    children: HashMap<KeyPress, usize>,
}

enum Step {
    /// The buffered keys are a prefix of some command; wait for more input.
    NeedMore,
    Done {
        consumed: usize,
        cmd: ParsedCommand,
    },
}

pub struct Parser {
    ops: Vec<OpNode>,
    motions: Vec<MotionNode>,
    aliases: Vec<Vec<KeyPress>>,
    queue: VecDeque<KeyPress>,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    pub fn new() -> Self {
        let root = OpNode {
            action: None,
            // The bare motion path goes through the root: a motion with no
            // operator prefix is a command on its own.
            requires_motion: true,
            children: HashMap::new(),
        };
        Parser {
            ops: vec![root],
            motions: vec![MotionNode::default()],
            aliases: Vec::new(),
            queue: VecDeque::new(),
        }
    }

    /// Bind `seq` to `action`. With `requires_motion`, the action only fires
    /// after a following motion and receives its own count.
    pub fn add_operator(&mut self, seq: &[KeyPress], action: NormalAction, requires_motion: bool) {
        let mut n = 0;
        for k in seq {
            n = match self.ops[n].children.get(k) {
                Some(&c) => c,
                None => {
                    self.ops.push(OpNode::default());
                    let c = self.ops.len() - 1;
                    self.ops[n].children.insert(*k, c);
                    c
                }
            };
        }
        self.ops[n].action = Some(action);
        self.ops[n].requires_motion = requires_motion;
    }

    pub fn add_motion(&mut self, seq: &[KeyPress], motion: NormalMotion) {
        let mut n = 0;
        for k in seq {
            n = match self.motions[n].children.get(k) {
                Some(&c) => c,
                None => {
                    self.motions.push(MotionNode::default());
                    let c = self.motions.len() - 1;
                    self.motions[n].children.insert(*k, c);
                    c
                }
            };
        }
        self.motions[n].motion = Some(motion);
    }

    /// Bind `alias` to expand into `seq` (with count substitution).
    pub fn add_alias(&mut self, alias: &[KeyPress], seq: &[KeyPress]) {
        let id = self.aliases.len() as u16;
        self.aliases.push(seq.to_vec());
        self.add_operator(alias, NormalAction::Alias(id), false);
    }

    /// Feed one key; returns every command completed by it. Alias
    /// expansions are resolved internally.
    pub fn feed(&mut self, k: KeyPress) -> SmallVec<[ParsedCommand; 2]> {
        self.queue.push_back(k);
        let mut out = SmallVec::new();
        loop {
            match self.try_parse() {
                Step::NeedMore => break,
                Step::Done { consumed, cmd } => {
                    self.queue.drain(..consumed);
                    match cmd {
                        ParsedCommand::Action {
                            action: NormalAction::Alias(id),
                            count,
                        } => self.expand_alias(id, count),
                        ParsedCommand::Unknown { keys } => {
                            warn!(target: "keymap.parse", seq = %format_keys(&keys), "unknown command");
                            out.push(ParsedCommand::Unknown { keys });
                        }
                        cmd => {
                            debug!(target: "keymap.parse", ?cmd, "parsed");
                            out.push(cmd);
                        }
                    }
                }
            }
        }
        out
    }

    /// Attempt to parse one command from the front of the buffer without
    /// consuming anything.
    fn try_parse(&self) -> Step {
        let mut i = 0;

        let Some(k0) = self.queue.front() else {
            return Step::NeedMore;
        };
        let mut cnum = 0usize;
        if is_count_start(k0) {
            match self.scan_num(&mut i) {
                Some(n) => cnum = n,
                None => return Step::NeedMore,
            }
        }

        // Walk the operator trie. Stop on a leaf without a motion
        // requirement, or at the deepest matching node.
        let mut op = 0usize;
        loop {
            let Some(&k) = self.queue.get(i) else {
                return Step::NeedMore;
            };
            let Some(&child) = self.ops[op].children.get(&k) else {
                break;
            };
            i += 1;
            let node = &self.ops[child];
            if !node.requires_motion
                && let Some(action) = node.action
            {
                return Step::Done {
                    consumed: i,
                    cmd: ParsedCommand::Action {
                        action,
                        count: cnum,
                    },
                };
            }
            op = child;
        }

        if !self.ops[op].requires_motion {
            // Dead end inside the operator trie: consume through the
            // offending key.
            return self.unknown(i + 1);
        }

        // Optional second count for the motion. With no operator prefix the
        // leading count belongs to the motion itself.
        let mut mnum = cnum;
        if op != 0 {
            let Some(k) = self.queue.get(i) else {
                return Step::NeedMore;
            };
            mnum = 0;
            if is_count_start(k) {
                match self.scan_num(&mut i) {
                    Some(n) => mnum = n,
                    None => return Step::NeedMore,
                }
            }
        }

        // Walk the motion trie.
        let mut m = 0usize;
        loop {
            let Some(&k) = self.queue.get(i) else {
                return Step::NeedMore;
            };
            i += 1;
            let Some(&child) = self.motions[m].children.get(&k) else {
                return self.unknown(i);
            };
            if let Some(motion) = self.motions[child].motion {
                let op_part = if op != 0 {
                    self.ops[op].action.map(|a| (a, cnum))
                } else {
                    None
                };
                return Step::Done {
                    consumed: i,
                    cmd: ParsedCommand::Motion {
                        motion,
                        count: mnum,
                        op: op_part,
                    },
                };
            }
            m = child;
        }
    }

    fn unknown(&self, consumed: usize) -> Step {
        Step::Done {
            consumed,
            cmd: ParsedCommand::Unknown {
                keys: self.queue.iter().take(consumed).copied().collect(),
            },
        }
    }

    /// Scan a decimal count at `*i`. The caller has checked the first key is
    /// `1..=9`; further digits include `0`. `None` when the buffer ends
    /// before a non-digit key settles the count.
    fn scan_num(&self, i: &mut usize) -> Option<usize> {
        let mut n = 0usize;
        loop {
            let k = self.queue.get(*i)?;
            match k.digit() {
                Some(d) if !(n == 0 && d == 0) => {
                    n = n.saturating_mul(10).saturating_add(d as usize).min(COUNT_MAX);
                    *i += 1;
                }
                _ => return Some(n),
            }
        }
    }

    /// Re-inject an alias body at the front of the buffer. A non-zero count
    /// is injected as digit keys; a literal leading number in the body is
    /// dropped so the injected count replaces it, while a leading `0`
    /// survives and extends the injected count.
    fn expand_alias(&mut self, id: u16, count: usize) {
        let body = self.aliases[id as usize].clone();
        let mut seq: &[KeyPress] = &body;
        let mut injected: Vec<KeyPress> = Vec::new();
        if count != 0 {
            for d in count.to_string().chars() {
                injected.push(KeyPress::plain(d));
            }
            let mut min = '1';
            for (idx, k) in seq.iter().enumerate() {
                let digit = matches!(k.key, Key::Char(c) if c >= min && c <= '9') && k.mods.is_empty();
                if digit {
                    min = '0';
                    continue;
                }
                seq = &seq[idx..];
                break;
            }
        }
        for k in injected.iter().chain(seq.iter()).rev() {
            self.queue.push_front(*k);
        }
    }
}

fn is_count_start(k: &KeyPress) -> bool {
    matches!(k.digit(), Some(d) if d >= 1)
}

fn format_keys(keys: &[KeyPress]) -> String {
    keys.iter().map(|k| k.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn keys(s: &str) -> Vec<KeyPress> {
        s.chars().map(KeyPress::plain).collect()
    }

    fn default_parser() -> Parser {
        let mut p = Parser::new();
        p.add_operator(&keys("q"), NormalAction::Quit, false);
        p.add_operator(&keys("i"), NormalAction::EnterInsert, false);
        p.add_operator(&keys("x"), NormalAction::DeleteRune, false);
        p.add_operator(&keys("u"), NormalAction::Undo, false);
        p.add_operator(&[KeyPress::ctrl('r')], NormalAction::Redo, false);
        p.add_operator(&keys("ZQ"), NormalAction::Quit, false);
        p.add_operator(&keys("ZZ"), NormalAction::SaveAndQuit, false);
        p.add_motion(&keys("h"), NormalMotion::Left);
        p.add_motion(&keys("l"), NormalMotion::Right);
        p.add_motion(&keys("j"), NormalMotion::Down);
        p.add_motion(&keys("k"), NormalMotion::Up);
        p.add_motion(&keys("G"), NormalMotion::GotoLine);
        p.add_motion(&keys("|"), NormalMotion::GotoColumn);
        p.add_alias(&keys("gg"), &keys("1G"));
        p.add_alias(&keys("X"), &keys("hx"));
        p.add_alias(&keys("0"), &keys("|"));
        p
    }

    fn feed_all(p: &mut Parser, s: &str) -> Vec<ParsedCommand> {
        let mut out = Vec::new();
        for c in s.chars() {
            out.extend(p.feed(KeyPress::plain(c)));
        }
        out
    }

    fn motion(motion: NormalMotion, count: usize) -> ParsedCommand {
        ParsedCommand::Motion {
            motion,
            count,
            op: None,
        }
    }

    #[test]
    fn bare_motion_and_action() {
        let mut p = default_parser();
        assert_eq!(feed_all(&mut p, "j"), vec![motion(NormalMotion::Down, 0)]);
        assert_eq!(
            feed_all(&mut p, "q"),
            vec![ParsedCommand::Action {
                action: NormalAction::Quit,
                count: 0
            }]
        );
    }

    #[test]
    fn counts_apply_to_motions() {
        let mut p = default_parser();
        assert_eq!(feed_all(&mut p, "12j"), vec![motion(NormalMotion::Down, 12)]);
        assert_eq!(feed_all(&mut p, "3G"), vec![motion(NormalMotion::GotoLine, 3)]);
    }

    #[test]
    fn multi_key_operators() {
        let mut p = default_parser();
        assert_eq!(
            feed_all(&mut p, "ZZ"),
            vec![ParsedCommand::Action {
                action: NormalAction::SaveAndQuit,
                count: 0
            }]
        );
        assert_eq!(
            feed_all(&mut p, "ZQ"),
            vec![ParsedCommand::Action {
                action: NormalAction::Quit,
                count: 0
            }]
        );
    }

    #[test]
    fn operator_with_motion_composes() {
        let mut p = default_parser();
        p.add_operator(&keys("d"), NormalAction::DeleteSel, true);
        assert_eq!(
            feed_all(&mut p, "2d3j"),
            vec![ParsedCommand::Motion {
                motion: NormalMotion::Down,
                count: 3,
                op: Some((NormalAction::DeleteSel, 2)),
            }]
        );
        // Without the inner count the motion count is absent, not inherited.
        assert_eq!(
            feed_all(&mut p, "2dj"),
            vec![ParsedCommand::Motion {
                motion: NormalMotion::Down,
                count: 0,
                op: Some((NormalAction::DeleteSel, 2)),
            }]
        );
    }

    #[test]
    fn keys_arrive_one_at_a_time() {
        let mut p = default_parser();
        assert!(p.feed(KeyPress::plain('1')).is_empty());
        assert!(p.feed(KeyPress::plain('2')).is_empty());
        assert!(p.feed(KeyPress::plain('Z')).is_empty());
        let out = p.feed(KeyPress::plain('Z'));
        assert_eq!(
            out.as_slice(),
            &[ParsedCommand::Action {
                action: NormalAction::SaveAndQuit,
                count: 12
            }]
        );
    }

    #[test]
    fn burst_parses_multiple_commands() {
        let mut p = default_parser();
        assert_eq!(
            feed_all(&mut p, "jjx"),
            vec![
                motion(NormalMotion::Down, 0),
                motion(NormalMotion::Down, 0),
                ParsedCommand::Action {
                    action: NormalAction::DeleteRune,
                    count: 0
                },
            ]
        );
    }

    #[test]
    fn alias_without_count_is_fed_verbatim() {
        let mut p = default_parser();
        assert_eq!(feed_all(&mut p, "gg"), vec![motion(NormalMotion::GotoLine, 1)]);
        assert_eq!(feed_all(&mut p, "0"), vec![motion(NormalMotion::GotoColumn, 0)]);
    }

    #[test]
    fn alias_count_replaces_leading_number() {
        let mut p = default_parser();
        // 5gg -> 5G: the alias body's literal "1" yields to the count.
        assert_eq!(feed_all(&mut p, "5gg"), vec![motion(NormalMotion::GotoLine, 5)]);
    }

    #[test]
    fn alias_expansion_composes_commands() {
        let mut p = default_parser();
        // X -> hx: move left, then delete the rune.
        assert_eq!(
            feed_all(&mut p, "X"),
            vec![
                motion(NormalMotion::Left, 0),
                ParsedCommand::Action {
                    action: NormalAction::DeleteRune,
                    count: 0
                },
            ]
        );
        // A count distributes onto the first command of the body.
        assert_eq!(
            feed_all(&mut p, "3X"),
            vec![
                motion(NormalMotion::Left, 3),
                ParsedCommand::Action {
                    action: NormalAction::DeleteRune,
                    count: 0
                },
            ]
        );
    }

    #[test]
    fn count_then_alias_zero_body_extends_count() {
        let mut p = Parser::new();
        p.add_motion(&keys("|"), NormalMotion::GotoColumn);
        p.add_alias(&keys("z"), &keys("0|"));
        // "3z" -> inject "3", body "0|" keeps its zero -> count 30.
        let mut out = Vec::new();
        out.extend(p.feed(KeyPress::plain('3')));
        out.extend(p.feed(KeyPress::plain('z')));
        assert_eq!(out, vec![motion(NormalMotion::GotoColumn, 30)]);
    }

    #[test]
    fn unknown_sequences_are_reported_and_skipped() {
        let mut p = default_parser();
        let out = feed_all(&mut p, "5wj");
        assert_eq!(out.len(), 2);
        assert!(matches!(out[0], ParsedCommand::Unknown { .. }));
        assert_eq!(out[1], motion(NormalMotion::Down, 0));
    }

    #[test]
    fn ctrl_keys_are_distinct() {
        let mut p = default_parser();
        assert_eq!(
            p.feed(KeyPress::ctrl('r')).as_slice(),
            &[ParsedCommand::Action {
                action: NormalAction::Redo,
                count: 0
            }]
        );
        // Plain 'r' is unknown.
        let out = p.feed(KeyPress::plain('r'));
        assert!(matches!(out.as_slice(), [ParsedCommand::Unknown { .. }]));
    }
}
