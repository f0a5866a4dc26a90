//! Shell pipelines invoked from tags.
//!
//! Grammar: an optional leading `<`, `>`, or `|` marks how the pipeline is
//! wired to the selection, followed by `cmd ( '|' cmd )*`. A leading `<`
//! captures stdout only, `>` feeds the selection to stdin only, `|` does
//! both; with no sign the output goes to the error window.
//!
//! Execution chains the stages with OS pipes. The selection is written to
//! the first stage from a helper thread (the child may never read it), each
//! stage's stderr is drained by its own thread, and the final stdout is
//! read on the caller's thread before the children are reaped.

use std::fmt;
use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty command")]
    EmptyCommand,
    #[error("missing command")]
    MissingCommand,
}

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("{0}: command not found")]
    NotFound(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cmd {
    pub name: String,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    /// Feed the selection to the first stage's stdin.
    pub pipe_input: bool,
    /// Capture the last stage's stdout in place of the selection.
    pub pipe_output: bool,
    pub cmds: Vec<Cmd>,
}

/// Result of running a pipeline to completion.
#[derive(Debug, Default)]
pub struct ExecOutcome {
    pub stdout: Vec<u8>,
    /// Collected stderr of every stage, plus a note per non-zero exit.
    pub stderr: String,
    pub success: bool,
}

/// Parse a pipeline string.
pub fn parse(s: &str) -> Result<Pipeline, ParseError> {
    let mut rest = s.trim();
    let mut pipe_input = false;
    let mut pipe_output = false;
    match rest.chars().next() {
        Some('<') => {
            pipe_output = true;
            rest = &rest[1..];
        }
        Some('>') => {
            pipe_input = true;
            rest = &rest[1..];
        }
        Some('|') => {
            pipe_input = true;
            pipe_output = true;
            rest = &rest[1..];
        }
        _ => {}
    }
    if rest.trim().is_empty() {
        return Err(ParseError::EmptyCommand);
    }
    let mut cmds = Vec::new();
    for segment in rest.split('|') {
        let mut words = segment.split_whitespace();
        let Some(name) = words.next() else {
            return Err(ParseError::MissingCommand);
        };
        cmds.push(Cmd {
            name: name.to_string(),
            args: words.map(String::from).collect(),
        });
    }
    Ok(Pipeline {
        pipe_input,
        pipe_output,
        cmds,
    })
}

impl fmt::Display for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" [", self.name)?;
        for (i, a) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "\"{}\"", a)?;
        }
        f.write_str("]")
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = match (self.pipe_input, self.pipe_output) {
            (true, true) => "| ",
            (true, false) => "> ",
            (false, true) => "< ",
            (false, false) => "",
        };
        f.write_str(sign)?;
        for (i, c) in self.cmds.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

/// Run the pipeline, feeding `input` (if any) to the first stage and
/// returning the final stdout plus collected stderr. A non-zero exit does
/// not fail the call; it is noted in `stderr` and clears `success`.
pub fn exec(p: &Pipeline, input: Option<Vec<u8>>) -> Result<ExecOutcome, ExecError> {
    debug!(target: "actions.shell", pipeline = %p, "exec");
    let mut children: Vec<std::process::Child> = Vec::with_capacity(p.cmds.len());
    let mut stderr_readers = Vec::with_capacity(p.cmds.len());
    let mut prev_stdout = None;
    let mut writer = None;

    for (i, cmd) in p.cmds.iter().enumerate() {
        let mut c = Command::new(&cmd.name);
        c.args(&cmd.args);
        c.stdin(match prev_stdout.take() {
            Some(out) => Stdio::from(out),
            None if i == 0 && input.is_some() => Stdio::piped(),
            None => Stdio::null(),
        });
        c.stdout(Stdio::piped());
        c.stderr(Stdio::piped());

        let mut child = match c.spawn() {
            Ok(ch) => ch,
            Err(e) => {
                for mut ch in children {
                    let _ = ch.kill();
                    let _ = ch.wait();
                }
                return Err(if e.kind() == std::io::ErrorKind::NotFound {
                    ExecError::NotFound(cmd.name.clone())
                } else {
                    ExecError::Io(e)
                });
            }
        };

        if i == 0
            && let Some(data) = input.clone()
            && let Some(mut stdin) = child.stdin.take()
        {
            // The child may exit without reading; ignore the broken pipe.
            writer = Some(thread::spawn(move || {
                use std::io::Write;
                let _ = stdin.write_all(&data);
            }));
        }

        prev_stdout = child.stdout.take();
        // Drain stderr concurrently so a chatty stage cannot stall the
        // pipeline on a full pipe buffer.
        if let Some(mut err) = child.stderr.take() {
            stderr_readers.push(thread::spawn(move || {
                let mut s = String::new();
                let _ = err.read_to_string(&mut s);
                s
            }));
        }
        children.push(child);
    }

    let mut out = ExecOutcome {
        success: true,
        ..Default::default()
    };
    if let Some(mut stdout) = prev_stdout {
        stdout.read_to_end(&mut out.stdout)?;
    }
    if let Some(w) = writer {
        let _ = w.join();
    }
    for reader in stderr_readers {
        if let Ok(s) = reader.join() {
            out.stderr.push_str(&s);
        }
    }
    for (i, mut child) in children.into_iter().enumerate() {
        let status = child.wait()?;
        if !status.success() {
            out.success = false;
            out.stderr
                .push_str(&format!("{}: {}\n", p.cmds[i].name, status));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_signs_and_stages() {
        let cases: &[(&str, &str)] = &[
            ("   pwd   ", r#""pwd" []"#),
            ("|sort | cat", r#"| "sort" [] | "cat" []"#),
            (">   sort| cat  ", r#"> "sort" [] | "cat" []"#),
            ("<cat file|sort", r#"< "cat" ["file"] | "sort" []"#),
            ("ls |grep -v a", r#""ls" [] | "grep" ["-v" "a"]"#),
        ];
        for (input, want) in cases {
            let p = parse(input).unwrap_or_else(|e| panic!("{}: {}", input, e));
            assert_eq!(&p.to_string(), want, "{}", input);
        }
    }

    #[test]
    fn syntax_errors() {
        assert_eq!(parse("    "), Err(ParseError::EmptyCommand));
        assert_eq!(parse(" cat | | cat"), Err(ParseError::MissingCommand));
        assert_eq!(parse("cat |"), Err(ParseError::MissingCommand));
        assert_eq!(parse("<"), Err(ParseError::EmptyCommand));
    }

    #[test]
    fn sign_wiring() {
        assert!(parse("<date").unwrap().pipe_output);
        assert!(!parse("<date").unwrap().pipe_input);
        assert!(parse(">wc").unwrap().pipe_input);
        assert!(!parse(">wc").unwrap().pipe_output);
        let both = parse("|sort").unwrap();
        assert!(both.pipe_input && both.pipe_output);
        let neither = parse("make").unwrap();
        assert!(!neither.pipe_input && !neither.pipe_output);
    }

    #[cfg(unix)]
    #[test]
    fn exec_feeds_stdin_and_captures_stdout() {
        let p = parse("|sort").unwrap();
        let out = exec(&p, Some(b"b\na\nc\n".to_vec())).unwrap();
        assert!(out.success);
        assert_eq!(out.stdout, b"a\nb\nc\n");
    }

    #[cfg(unix)]
    #[test]
    fn exec_chains_stages() {
        let p = parse("|sort | uniq -c").unwrap();
        let out = exec(&p, Some(b"x\nx\ny\n".to_vec())).unwrap();
        assert!(out.success);
        let text = String::from_utf8(out.stdout).unwrap();
        assert!(text.contains("2 x"));
        assert!(text.contains("1 y"));
    }

    #[cfg(unix)]
    #[test]
    fn exec_reports_unknown_command() {
        let p = parse("definitely-not-a-real-command-xyz").unwrap();
        match exec(&p, None) {
            Err(ExecError::NotFound(name)) => {
                assert_eq!(name, "definitely-not-a-real-command-xyz");
            }
            other => panic!("expected NotFound, got {:?}", other.map(|o| o.stdout)),
        }
    }

    #[cfg(unix)]
    #[test]
    fn exec_surfaces_nonzero_exit() {
        let p = parse("false").unwrap();
        let out = exec(&p, None).unwrap();
        assert!(!out.success);
        assert!(out.stderr.contains("false"));
    }
}
