//! The default normal-mode map.

use core_events::{Key, KeyPress};
use core_keymap::{NormalAction, NormalMotion, Parser};

fn keys(s: &str) -> Vec<KeyPress> {
    s.chars().map(KeyPress::plain).collect()
}

/// Install the stock bindings: vi-flavored motions with counts, the
/// editing operators, and the classic aliases.
pub fn install_default_bindings(p: &mut Parser) {
    p.add_operator(&keys("q"), NormalAction::Quit, false);
    p.add_operator(&keys("ZQ"), NormalAction::Quit, false);
    p.add_operator(&keys("ZZ"), NormalAction::SaveAndQuit, false);
    p.add_operator(&keys("i"), NormalAction::EnterInsert, false);
    p.add_operator(&keys("d"), NormalAction::DeleteSel, false);
    p.add_operator(&keys("x"), NormalAction::DeleteRune, false);
    p.add_operator(&keys("u"), NormalAction::Undo, false);
    p.add_operator(&[KeyPress::ctrl('r')], NormalAction::Redo, false);
    p.add_operator(&[KeyPress::ctrl('f')], NormalAction::PageDown, false);
    p.add_operator(&[KeyPress::ctrl('b')], NormalAction::PageUp, false);

    p.add_motion(&keys("h"), NormalMotion::Left);
    p.add_motion(&keys("l"), NormalMotion::Right);
    p.add_motion(&keys("j"), NormalMotion::Down);
    p.add_motion(&keys("k"), NormalMotion::Up);
    p.add_motion(&keys("G"), NormalMotion::GotoLine);
    p.add_motion(&keys("|"), NormalMotion::GotoColumn);
    p.add_motion(&keys("$"), NormalMotion::LineEnd);

    // The abstract keys behave like their vi counterparts.
    p.add_motion(&[KeyPress::special(Key::Left)], NormalMotion::Left);
    p.add_motion(&[KeyPress::special(Key::Right)], NormalMotion::Right);
    p.add_motion(&[KeyPress::special(Key::Up)], NormalMotion::Up);
    p.add_motion(&[KeyPress::special(Key::Down)], NormalMotion::Down);
    p.add_operator(
        &[KeyPress::special(Key::PageUp)],
        NormalAction::PageUp,
        false,
    );
    p.add_operator(
        &[KeyPress::special(Key::PageDown)],
        NormalAction::PageDown,
        false,
    );

    p.add_alias(&keys("gg"), &keys("1G"));
    p.add_alias(&keys("X"), &keys("hx"));
    p.add_alias(&keys("0"), &keys("|"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_keymap::ParsedCommand;

    fn feed(p: &mut Parser, s: &str) -> Vec<ParsedCommand> {
        let mut out = Vec::new();
        for c in s.chars() {
            out.extend(p.feed(KeyPress::plain(c)));
        }
        out
    }

    #[test]
    fn stock_map_parses_the_classics() {
        let mut p = Parser::new();
        install_default_bindings(&mut p);

        assert_eq!(
            feed(&mut p, "3j"),
            vec![ParsedCommand::Motion {
                motion: NormalMotion::Down,
                count: 3,
                op: None
            }]
        );
        assert_eq!(
            feed(&mut p, "gg"),
            vec![ParsedCommand::Motion {
                motion: NormalMotion::GotoLine,
                count: 1,
                op: None
            }]
        );
        assert_eq!(
            feed(&mut p, "ZZ"),
            vec![ParsedCommand::Action {
                action: NormalAction::SaveAndQuit,
                count: 0
            }]
        );
        assert_eq!(
            feed(&mut p, "0"),
            vec![ParsedCommand::Motion {
                motion: NormalMotion::GotoColumn,
                count: 0,
                op: None
            }]
        );
    }

    #[test]
    fn ctrl_bindings_resolve() {
        let mut p = Parser::new();
        install_default_bindings(&mut p);
        assert_eq!(
            p.feed(KeyPress::ctrl('f')).as_slice(),
            &[ParsedCommand::Action {
                action: NormalAction::PageDown,
                count: 0
            }]
        );
    }

    #[test]
    fn abstract_keys_mirror_vi_motions() {
        let mut p = Parser::new();
        install_default_bindings(&mut p);
        assert_eq!(
            p.feed(KeyPress::special(Key::Down)).as_slice(),
            &[ParsedCommand::Motion {
                motion: NormalMotion::Down,
                count: 0,
                op: None
            }]
        );
        // Counts compose with them too.
        let mut out = Vec::new();
        out.extend(p.feed(KeyPress::plain('4')));
        out.extend(p.feed(KeyPress::special(Key::Right)));
        assert_eq!(
            out,
            vec![ParsedCommand::Motion {
                motion: NormalMotion::Right,
                count: 4,
                op: None
            }]
        );
        assert_eq!(
            p.feed(KeyPress::special(Key::PageDown)).as_slice(),
            &[ParsedCommand::Action {
                action: NormalAction::PageDown,
                count: 0
            }]
        );
    }
}
