//! Per-rule source isolation: a headers-visible and a sources-visible tree
//! of hard links, exposing to each compiled unit exactly the files its rule
//! declares while sharing the one canonical repository tree.
//!
//! Both trees end in a sentinel path segment; the suffix after the sentinel
//! is the repository-relative path of the canonical file, so diagnostics and
//! include paths can always be mapped back to their true location.

use crate::graph::{RuleRef, SourceTree};
use crate::repo::{Repo, SENTINEL};
use anyhow::anyhow;
use std::path::Path;

/// Rebuilds every rule's isolation trees from scratch.  The trees are owned
/// by this step alone: existing roots are deleted in full, never patched.
pub fn materialize(repo: &Repo, tree: &SourceTree) -> anyhow::Result<()> {
    for (dir, sdir) in &tree.dirs {
        for (name, rule) in &sdir.rules {
            let rref = RuleRef::new(dir.clone(), name.clone());

            let iso = repo.isolate_dir(&rref);
            match std::fs::remove_dir_all(&iso) {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(anyhow!("remove {:?}: {}", iso, err)),
            }

            link_into(repo, &repo.headers_root(&rref), dir, &rule.headers)?;
            link_into(repo, &repo.sources_root(&rref), dir, &rule.sources)?;
        }
    }
    Ok(())
}

/// Hard-links the declared files under `root/<dir>/`.  The sentinel
/// directory is created even when the list is empty so the root can always
/// be used as an include path.
fn link_into(repo: &Repo, root: &Path, dir: &str, files: &[String]) -> anyhow::Result<()> {
    let dst_dir = root.join(dir);
    std::fs::create_dir_all(&dst_dir).map_err(|err| anyhow!("create {:?}: {}", dst_dir, err))?;
    for filename in files {
        let src = repo.root.join(dir).join(filename);
        let dst = dst_dir.join(filename);
        std::fs::hard_link(&src, &dst)
            .map_err(|err| anyhow!("link {:?} -> {:?}: {}", src, dst, err))?;
    }
    Ok(())
}

/// Recovers the repository-relative path of an isolated file: everything
/// after the sentinel segment.
pub fn canonical_path(isolated: &Path) -> Option<&Path> {
    let mut components = isolated.iter();
    while let Some(component) = components.next() {
        if component == SENTINEL {
            let rest = components.as_path();
            if rest.as_os_str().is_empty() {
                return None;
            }
            return Some(rest);
        }
    }
    None
}
