//! Repository context: the root marker, and every output path derived from
//! it.  Constructed once at startup and threaded through all components.

use crate::graph::RuleRef;
use anyhow::{anyhow, bail};
use std::path::{Path, PathBuf};

/// The marker folder that makes a directory a repository root.
pub const MARKER_DIR: &str = ".mason";

/// Path segment separating an isolation tree's scaffolding from the
/// repository-relative path it mirrors.  Everything after the sentinel in an
/// isolated file's path is the canonical location of the original.
pub const SENTINEL: &str = "__root__";

#[derive(Debug)]
pub struct Repo {
    /// Absolute path of the repository root.
    pub root: PathBuf,
    /// Absolute path of the marker directory; all build outputs live here.
    pub marker: PathBuf,
}

impl Repo {
    /// Finds the repository containing `start` by walking parent
    /// directories until one holds the marker folder.
    pub fn discover(start: &Path) -> anyhow::Result<Repo> {
        let start = start
            .canonicalize()
            .map_err(|err| anyhow!("resolve {:?}: {}", start, err))?;
        let mut dir = start.clone();
        loop {
            let marker = dir.join(MARKER_DIR);
            if marker.is_dir() {
                return Ok(Repo { root: dir, marker });
            }
            if !dir.pop() {
                bail!("no {} repository found above {:?}", MARKER_DIR, start);
            }
        }
    }

    pub fn from_cwd() -> anyhow::Result<Repo> {
        Repo::discover(&std::env::current_dir()?)
    }

    /// The rule's isolation area; deleted wholesale before materialization.
    pub fn isolate_dir(&self, rref: &RuleRef) -> PathBuf {
        self.marker
            .join("isolate")
            .join(&rref.dir)
            .join(&rref.name)
    }

    /// Root of the headers-visible tree, ending at the sentinel.  Used
    /// directly as an include search path.
    pub fn headers_root(&self, rref: &RuleRef) -> PathBuf {
        self.isolate_dir(rref).join("headers").join(SENTINEL)
    }

    /// Root of the sources-visible tree, ending at the sentinel.
    pub fn sources_root(&self, rref: &RuleRef) -> PathBuf {
        self.isolate_dir(rref).join("sources").join(SENTINEL)
    }

    fn out_dir(&self, platform: &str) -> PathBuf {
        self.marker.join("out").join(platform)
    }

    /// Object file for one of a rule's sources.
    pub fn object_path(&self, platform: &str, rref: &RuleRef, source: &str) -> PathBuf {
        let mut name = source.to_string();
        name.push_str(".o");
        self.out_dir(platform)
            .join("obj")
            .join(&rref.dir)
            .join(&rref.name)
            .join(name)
    }

    /// The rule's static library.
    pub fn library_path(&self, platform: &str, rref: &RuleRef) -> PathBuf {
        let mut name = rref.name.clone();
        name.push_str(".a");
        self.out_dir(platform).join("lib").join(&rref.dir).join(name)
    }

    /// The rule's linked program.
    pub fn program_path(&self, platform: &str, rref: &RuleRef) -> PathBuf {
        self.out_dir(platform)
            .join("bin")
            .join(&rref.dir)
            .join(&rref.name)
    }

    /// The optional platform-list configuration file.
    pub fn platforms_file(&self) -> PathBuf {
        self.marker.join("platforms")
    }
}

/// Marks `dir` as a repository root.  Fails if `dir` is not a directory or
/// already sits inside a repository.
pub fn init(dir: &Path) -> anyhow::Result<()> {
    if !dir.is_dir() {
        bail!("{:?} is not a directory", dir);
    }
    if let Ok(repo) = Repo::discover(dir) {
        bail!(
            "{:?} is already inside the repository at {:?}",
            dir,
            repo.root
        );
    }
    let marker = dir.join(MARKER_DIR);
    std::fs::create_dir(&marker).map_err(|err| anyhow!("create {:?}: {}", marker, err))?;
    Ok(())
}
