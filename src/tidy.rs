//! In-place source reformatter.  Deliberately small: a fixed set of
//! whitespace rules applied to every header/source file under the root.

use crate::repo::Repo;
use anyhow::anyhow;
use std::path::Path;

const SOURCE_EXTENSIONS: &[&str] = &["h", "hh", "hpp", "c", "cc", "cpp"];

/// Reformats every header/source file under the repository root.  Returns
/// the number of files rewritten.
pub fn tidy(repo: &Repo) -> anyhow::Result<usize> {
    let mut rewritten = 0;
    walk(&repo.root, &mut rewritten)?;
    Ok(rewritten)
}

fn walk(dir: &Path, rewritten: &mut usize) -> anyhow::Result<()> {
    let entries = std::fs::read_dir(dir).map_err(|err| anyhow!("read dir {:?}: {}", dir, err))?;
    for entry in entries {
        let entry = entry.map_err(|err| anyhow!("read dir {:?}: {}", dir, err))?;
        let path = entry.path();
        if entry
            .file_type()
            .map_err(|err| anyhow!("stat {:?}: {}", path, err))?
            .is_dir()
        {
            if !entry.file_name().to_string_lossy().starts_with('.') {
                walk(&path, rewritten)?;
            }
            continue;
        }
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if SOURCE_EXTENSIONS.contains(&ext) => {}
            _ => continue,
        }
        let text =
            std::fs::read_to_string(&path).map_err(|err| anyhow!("read {:?}: {}", path, err))?;
        let formatted = reformat(&text);
        if formatted != text {
            std::fs::write(&path, formatted)
                .map_err(|err| anyhow!("write {:?}: {}", path, err))?;
            *rewritten += 1;
        }
    }
    Ok(())
}

/// The whole rule set: tabs become four spaces, trailing whitespace goes,
/// blank runs collapse to at most two lines, the file ends with exactly one
/// newline.
pub fn reformat(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blanks = 0;
    for line in text.lines() {
        let line = line.replace('\t', "    ");
        let line = line.trim_end();
        if line.is_empty() {
            blanks += 1;
            if blanks > 2 {
                continue;
            }
        } else {
            blanks = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    while out.ends_with('\n') {
        out.pop();
    }
    if !out.is_empty() {
        out.push('\n');
    }
    out
}
