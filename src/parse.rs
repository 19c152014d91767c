//! Parser for build.rules files.
//!
//! A rules file is a sequence of non-blank lines whose leading space count,
//! divided by two, is its nesting depth.  Each line is one of three
//! productions:
//!
//! ```text
//! key:          opens a sequence, nested one level deeper
//! key = value   a key/value pair
//! token         a bare leaf
//! ```
//!
//! The parser produces a generic entity tree; giving the entities build
//! semantics is the loader's job, see load.rs.

/// One node of a parsed rules file.  Every shape a rules file can produce is
/// known up front, so this is a closed enum and consumers match exhaustively.
#[derive(Debug, PartialEq, Eq)]
pub enum Entity {
    /// A `key:` line together with the more-deeply-nested lines below it.
    Sequence { key: String, children: Vec<Entity> },
    /// A `key = value` line.
    KeyVal { key: String, value: String },
    /// A bare token.
    Leaf(String),
}

#[derive(Debug)]
pub struct ParseError {
    msg: String,
    /// 1-based line number of the offending line.
    line: usize,
    /// The offending line's text.
    text: String,
}

pub type ParseResult<T> = Result<T, ParseError>;

impl ParseError {
    /// Renders the error with the source file name, for surfacing to the
    /// user.  The line text is included so the declaration can be found
    /// without opening the file.
    pub fn format(&self, filename: &std::path::Path) -> String {
        format!(
            "parse error: {}\n{}:{}: {:?}",
            self.msg,
            filename.display(),
            self.line,
            self.text
        )
    }
}

/// A sequence whose children are still being collected.
struct OpenSeq {
    key: String,
    /// Depth its children must have: one deeper than the `key:` line itself.
    child_depth: usize,
    children: Vec<Entity>,
    /// Where the sequence was opened, for empty-sequence errors.
    line: usize,
    text: String,
}

fn error<T>(msg: impl Into<String>, line: usize, text: &str) -> ParseResult<T> {
    Err(ParseError {
        msg: msg.into(),
        line,
        text: text.to_string(),
    })
}

/// Parses one rules file into an entity tree rooted at a synthetic sequence
/// named after the file.
pub fn parse(name: &str, text: &str) -> ParseResult<Entity> {
    let mut stack = vec![OpenSeq {
        key: name.to_string(),
        child_depth: 0,
        children: Vec::new(),
        line: 0,
        text: String::new(),
    }];

    for (idx, raw) in text.lines().enumerate() {
        let lineno = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }

        let spaces = raw.len() - raw.trim_start_matches(' ').len();
        if spaces % 2 != 0 {
            return error("odd indentation", lineno, raw);
        }
        let depth = spaces / 2;

        // A line at or above an open sequence's own depth closes it.
        while depth < stack.last().unwrap().child_depth {
            close_seq(&mut stack)?;
        }
        if depth > stack.last().unwrap().child_depth {
            return error("indentation skips a level", lineno, raw);
        }

        match classify(trimmed) {
            Line::Sequence(key) => stack.push(OpenSeq {
                key: key.to_string(),
                child_depth: depth + 1,
                children: Vec::new(),
                line: lineno,
                text: raw.to_string(),
            }),
            Line::KeyVal(key, value) => stack.last_mut().unwrap().children.push(Entity::KeyVal {
                key: key.to_string(),
                value: value.to_string(),
            }),
            Line::Leaf(token) => stack
                .last_mut()
                .unwrap()
                .children
                .push(Entity::Leaf(token.to_string())),
            Line::Malformed(msg) => return error(msg, lineno, raw),
        }
    }

    while stack.len() > 1 {
        close_seq(&mut stack)?;
    }
    let root = stack.pop().unwrap();
    Ok(Entity::Sequence {
        key: root.key,
        children: root.children,
    })
}

/// Pops the innermost open sequence into its parent's children.
fn close_seq(stack: &mut Vec<OpenSeq>) -> ParseResult<()> {
    let seq = stack.pop().unwrap();
    if seq.children.is_empty() {
        return error("empty sequence", seq.line, &seq.text);
    }
    stack.last_mut().unwrap().children.push(Entity::Sequence {
        key: seq.key,
        children: seq.children,
    });
    Ok(())
}

enum Line<'a> {
    Sequence(&'a str),
    KeyVal(&'a str, &'a str),
    Leaf(&'a str),
    Malformed(&'static str),
}

fn classify(trimmed: &str) -> Line {
    if let Some(key) = trimmed.strip_suffix(':') {
        if !key.is_empty() && !key.contains(char::is_whitespace) {
            return Line::Sequence(key);
        }
    }
    if let Some((key, value)) = trimmed.split_once(" = ") {
        if key.is_empty()
            || value.is_empty()
            || key.contains(char::is_whitespace)
            || value.contains(char::is_whitespace)
        {
            return Line::Malformed("malformed key/value");
        }
        return Line::KeyVal(key, value);
    }
    if trimmed.contains(char::is_whitespace) {
        return Line::Malformed("expected a single token");
    }
    Line::Leaf(trimmed)
}
