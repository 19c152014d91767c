//! Tree loading: walks the repository, parses each directory's rules file,
//! and builds the typed rule model from the parsed entity trees.

use crate::graph::{MTime, Rule, RuleKind, RuleRef, SourceDirectory, SourceFile, SourceTree};
use crate::parse::{self, Entity};
use crate::repo::Repo;
use anyhow::{anyhow, bail};
use std::path::Path;

/// The per-directory rule-declaration filename.
pub const RULES_FILENAME: &str = "build.rules";

/// Walks the whole repository and returns the freshly built source tree.
pub fn read(repo: &Repo) -> anyhow::Result<SourceTree> {
    let mut tree = SourceTree::default();
    walk(repo, "", &mut tree)?;
    Ok(tree)
}

fn walk(repo: &Repo, dir: &str, tree: &mut SourceTree) -> anyhow::Result<()> {
    let abs = repo.root.join(dir);
    let entries =
        std::fs::read_dir(&abs).map_err(|err| anyhow!("read dir {:?}: {}", abs, err))?;

    let mut sdir = SourceDirectory::default();
    let mut subdirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| anyhow!("read dir {:?}: {}", abs, err))?;
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(name) => bail!("non-utf8 filename {:?} in {:?}", name, abs),
        };
        if entry
            .file_type()
            .map_err(|err| anyhow!("stat {:?}: {}", entry.path(), err))?
            .is_dir()
        {
            // Dot directories hold no sources; skipping them also keeps the
            // walk out of the marker directory's own outputs.
            if !name.starts_with('.') {
                subdirs.push(name);
            }
        } else if name == RULES_FILENAME {
            load_rules_file(dir, &entry.path(), &mut sdir)?;
        } else {
            let meta = entry
                .metadata()
                .map_err(|err| anyhow!("stat {:?}: {}", entry.path(), err))?;
            let mtime = MTime::Stamp(
                meta.modified()
                    .map_err(|err| anyhow!("stat {:?}: {}", entry.path(), err))?,
            );
            sdir.files.insert(name, SourceFile { mtime });
        }
    }

    validate(dir, &sdir)?;
    tree.dirs.insert(dir.to_string(), sdir);

    subdirs.sort();
    for sub in subdirs {
        let rel = if dir.is_empty() {
            sub
        } else {
            format!("{}/{}", dir, sub)
        };
        walk(repo, &rel, tree)?;
    }
    Ok(())
}

/// Shape checks that need the directory's rule and file maps side by side.
fn validate(dir: &str, sdir: &SourceDirectory) -> anyhow::Result<()> {
    for (name, rule) in &sdir.rules {
        if sdir.files.contains_key(name) {
            bail!(
                "rule {} collides with a file of the same name",
                RuleRef::new(dir, name.as_str())
            );
        }
        for filename in rule.headers.iter().chain(rule.sources.iter()) {
            if !sdir.files.contains_key(filename) {
                bail!(
                    "rule {} declares missing file {:?}",
                    RuleRef::new(dir, name.as_str()),
                    filename
                );
            }
        }
    }
    Ok(())
}

fn load_rules_file(dir: &str, path: &Path, sdir: &mut SourceDirectory) -> anyhow::Result<()> {
    let text =
        std::fs::read_to_string(path).map_err(|err| anyhow!("read {:?}: {}", path, err))?;
    load_rules(dir, path, &text, sdir)
}

/// Parses one rules file's text and inserts the rules it declares.
fn load_rules(
    dir: &str,
    path: &Path,
    text: &str,
    sdir: &mut SourceDirectory,
) -> anyhow::Result<()> {
    let root = parse::parse(RULES_FILENAME, text).map_err(|err| anyhow!(err.format(path)))?;
    let children = match root {
        Entity::Sequence { children, .. } => children,
        _ => unreachable!("parse root is always a sequence"),
    };

    for entity in children {
        let (kind_key, body) = match entity {
            Entity::Sequence { key, children } => (key, children),
            _ => bail!("{}: top-level entries must be rule sequences", path.display()),
        };
        let kind = match kind_key.as_str() {
            "library" => RuleKind::Library,
            "program" => RuleKind::Program,
            "test" => RuleKind::Test,
            other => bail!("{}: unknown rule kind {:?}", path.display(), other),
        };

        let mut name = None;
        let mut rule = Rule::new(kind);
        for child in body {
            match child {
                Entity::KeyVal { key, value } if key == "name" => {
                    if name.is_some() {
                        bail!("{}: rule name set twice", path.display());
                    }
                    name = Some(value);
                }
                Entity::Sequence { key, children } => {
                    let tokens = leaf_tokens(path, &key, children)?;
                    match key.as_str() {
                        "headers" => fill(path, &key, &mut rule.headers, tokens)?,
                        "sources" => fill(path, &key, &mut rule.sources, tokens)?,
                        "platforms" => fill(path, &key, &mut rule.platforms, tokens)?,
                        "dependencies" => {
                            if !rule.deps.is_empty() {
                                bail!("{}: section {:?} appears twice", path.display(), key);
                            }
                            rule.deps = tokens
                                .iter()
                                .map(|t| RuleRef::from_token(t, dir))
                                .collect();
                        }
                        other => bail!("{}: unknown section {:?}", path.display(), other),
                    }
                }
                Entity::KeyVal { key, .. } => {
                    bail!("{}: unknown attribute {:?}", path.display(), key)
                }
                Entity::Leaf(token) => {
                    bail!("{}: stray token {:?} in rule", path.display(), token)
                }
            }
        }

        let name = match name {
            Some(name) => name,
            None => bail!("{}: {} rule without a name", path.display(), kind_key),
        };
        if sdir.rules.contains_key(&name) {
            bail!(
                "duplicate rule {} in {}",
                RuleRef::new(dir, name.as_str()),
                path.display()
            );
        }
        sdir.rules.insert(name, rule);
    }
    Ok(())
}

/// A section sequence may contain only bare leaves.
fn leaf_tokens(path: &Path, key: &str, children: Vec<Entity>) -> anyhow::Result<Vec<String>> {
    let mut tokens = Vec::with_capacity(children.len());
    for child in children {
        match child {
            Entity::Leaf(token) => tokens.push(token),
            _ => bail!(
                "{}: section {:?} may only contain bare tokens",
                path.display(),
                key
            ),
        }
    }
    Ok(tokens)
}

fn fill(
    path: &Path,
    key: &str,
    slot: &mut Vec<String>,
    tokens: Vec<String>,
) -> anyhow::Result<()> {
    // The parser rejects empty sequences, so a populated slot means the
    // section already appeared.
    if !slot.is_empty() {
        bail!("{}: section {:?} appears twice", path.display(), key);
    }
    *slot = tokens;
    Ok(())
}

/// Parse a single directory's rules text.
#[cfg(test)]
pub fn parse_dir(dir: &str, text: &str) -> anyhow::Result<SourceDirectory> {
    let mut sdir = SourceDirectory::default();
    load_rules(dir, Path::new(RULES_FILENAME), text, &mut sdir)?;
    Ok(sdir)
}
