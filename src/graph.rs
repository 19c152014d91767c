//! The rule model: buildable rules, their identities, and the source tree
//! they are declared in.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::Path;
use std::time::SystemTime;

/// The name of the implicit base rule, declared in the repository root and
/// depended on by every rule.
pub const BASE_RULE: &str = "base";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Library,
    Program,
    Test,
}

/// The `(directory, name)` identity of a rule.  Totally ordered so it can
/// serve as a map key and give deterministic iteration everywhere.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleRef {
    /// Repository-relative directory, `""` for the root.
    pub dir: String,
    pub name: String,
}

impl RuleRef {
    pub fn new(dir: impl Into<String>, name: impl Into<String>) -> RuleRef {
        RuleRef {
            dir: dir.into(),
            name: name.into(),
        }
    }

    /// The implicit base rule shared by every closure.
    pub fn base() -> RuleRef {
        RuleRef::new("", BASE_RULE)
    }

    /// Resolves a dependency token as written in a rules file: `/d/n` names
    /// a rule absolutely (`/n` for the root directory), a bare token names a
    /// rule in the declaring directory.
    pub fn from_token(token: &str, own_dir: &str) -> RuleRef {
        match token.strip_prefix('/') {
            Some(abs) => match abs.rsplit_once('/') {
                Some((dir, name)) => RuleRef::new(dir, name),
                None => RuleRef::new("", abs),
            },
            None => RuleRef::new(own_dir, token),
        }
    }
}

impl fmt::Display for RuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dir.is_empty() {
            write!(f, "/{}", self.name)
        } else {
            write!(f, "/{}/{}", self.dir, self.name)
        }
    }
}

/// One declared buildable unit.
#[derive(Debug)]
pub struct Rule {
    pub kind: RuleKind,
    /// Header filenames, relative to the declaring directory.
    pub headers: Vec<String>,
    /// Source filenames, relative to the declaring directory.
    pub sources: Vec<String>,
    pub deps: Vec<RuleRef>,
    /// Platform names this rule builds on; empty means all platforms.
    pub platforms: Vec<String>,
}

impl Rule {
    pub fn new(kind: RuleKind) -> Rule {
        Rule {
            kind,
            headers: Vec::new(),
            sources: Vec::new(),
            deps: Vec::new(),
            platforms: Vec::new(),
        }
    }

    pub fn builds_on(&self, platform: &str) -> bool {
        self.platforms.is_empty() || self.platforms.iter().any(|p| p == platform)
    }
}

/// A plain (non-declaration) file, recorded once during the tree walk.
#[derive(Debug, Clone, Copy)]
pub struct SourceFile {
    pub mtime: MTime,
}

/// One directory's rules and plain files.
#[derive(Debug, Default)]
pub struct SourceDirectory {
    pub rules: BTreeMap<String, Rule>,
    pub files: BTreeMap<String, SourceFile>,
}

/// The whole repository, keyed by repository-relative directory path.
/// Rebuilt from scratch by a full walk on every invocation.
#[derive(Debug, Default)]
pub struct SourceTree {
    pub dirs: BTreeMap<String, SourceDirectory>,
}

impl SourceTree {
    pub fn rule(&self, rref: &RuleRef) -> Option<&Rule> {
        self.dirs.get(&rref.dir)?.rules.get(&rref.name)
    }

    pub fn file_mtime(&self, dir: &str, name: &str) -> Option<MTime> {
        Some(self.dirs.get(dir)?.files.get(name)?.mtime)
    }

    /// All declared rules, in directory-then-name order.
    pub fn rule_refs(&self) -> impl Iterator<Item = RuleRef> + '_ {
        self.dirs.iter().flat_map(|(dir, sdir)| {
            sdir.rules
                .keys()
                .map(move |name| RuleRef::new(dir.clone(), name.clone()))
        })
    }
}

/// A file timestamp.  Missing orders before every stamp, so "rebuild if the
/// artifact is ≤ its newest input" covers absent artifacts too.  Stamps keep
/// full nanosecond precision: an artifact written in the same second as its
/// input must still compare strictly newer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MTime {
    Missing,
    Stamp(SystemTime),
}

pub fn stat(path: &Path) -> io::Result<MTime> {
    match std::fs::metadata(path) {
        Ok(meta) => Ok(MTime::Stamp(meta.modified()?)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(MTime::Missing),
        Err(err) => Err(err),
    }
}
