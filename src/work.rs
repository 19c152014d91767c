//! The incremental build engine.  Per platform it makes two passes over the
//! rule model: compile-and-archive everything first, so the library map is
//! complete, then link-and-test.  That pass ordering is the only scheduler;
//! everything runs sequentially and any failing command aborts the run.
//!
//! Staleness is timestamp-only: an artifact is rebuilt when it is missing or
//! not newer than the newest input that can affect it.  There is no rollback
//! on failure; the next run re-derives everything from on-disk timestamps.

use crate::deps::RuleDeps;
use crate::graph::{stat, MTime, Rule, RuleKind, RuleRef, SourceTree};
use crate::platform::Platform;
use crate::repo::Repo;
use crate::task::Runner;
use anyhow::{anyhow, bail};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct Work<'a> {
    repo: &'a Repo,
    tree: &'a SourceTree,
    deps: &'a RuleDeps,
    runner: &'a mut dyn Runner,
    /// Toolchain commands executed across all platforms.
    pub commands: usize,
    /// Test programs executed.
    pub tests: usize,
}

impl<'a> Work<'a> {
    pub fn new(
        repo: &'a Repo,
        tree: &'a SourceTree,
        deps: &'a RuleDeps,
        runner: &'a mut dyn Runner,
    ) -> Self {
        Work {
            repo,
            tree,
            deps,
            runner,
            commands: 0,
            tests: 0,
        }
    }

    pub fn run(&mut self, platforms: &[Platform]) -> anyhow::Result<()> {
        for platform in platforms {
            self.build_platform(platform)?;
        }
        Ok(())
    }

    fn build_platform(&mut self, platform: &Platform) -> anyhow::Result<()> {
        // Libraries current on this platform, keyed by the rule that owns
        // them.  Fully populated before any link step reads it.
        let mut libraries: BTreeMap<RuleRef, PathBuf> = BTreeMap::new();

        let tree = self.tree;
        for (dir, sdir) in &tree.dirs {
            for (name, rule) in &sdir.rules {
                if !rule.builds_on(&platform.name) {
                    continue;
                }
                let rref = RuleRef::new(dir.clone(), name.clone());
                self.compile_and_archive(platform, &rref, rule, &mut libraries)?;
            }
        }

        for (dir, sdir) in &tree.dirs {
            for (name, rule) in &sdir.rules {
                if !matches!(rule.kind, RuleKind::Program | RuleKind::Test) {
                    continue;
                }
                if !rule.builds_on(&platform.name) {
                    continue;
                }
                let rref = RuleRef::new(dir.clone(), name.clone());
                self.link_and_test(platform, &rref, rule, &libraries)?;
            }
        }
        Ok(())
    }

    fn closure(&self, rref: &RuleRef) -> anyhow::Result<&'a BTreeSet<RuleRef>> {
        self.deps
            .get(rref)
            .ok_or_else(|| anyhow!("bad rule reference {}", rref))
    }

    /// Newest mtime of any header belonging to any rule in `rref`'s closure.
    /// A header change anywhere in the closure invalidates every object.
    fn newest_closure_header(&self, rref: &RuleRef) -> anyhow::Result<MTime> {
        let mut newest = MTime::Missing;
        for dep in self.closure(rref)? {
            let rule = self
                .tree
                .rule(dep)
                .ok_or_else(|| anyhow!("bad rule reference {}", dep))?;
            for header in &rule.headers {
                let mtime = self
                    .tree
                    .file_mtime(&dep.dir, header)
                    .ok_or_else(|| anyhow!("missing file {:?} in {}", header, dep))?;
                newest = newest.max(mtime);
            }
        }
        Ok(newest)
    }

    fn compile_and_archive(
        &mut self,
        platform: &Platform,
        rref: &RuleRef,
        rule: &Rule,
        libraries: &mut BTreeMap<RuleRef, PathBuf>,
    ) -> anyhow::Result<()> {
        let includes: Vec<PathBuf> = self
            .closure(rref)?
            .iter()
            .map(|dep| self.repo.headers_root(dep))
            .collect();
        let newest_header = self.newest_closure_header(rref)?;

        let mut objects = Vec::new();
        let mut newest_object = MTime::Missing;
        for source in &rule.sources {
            let src = self.repo.sources_root(rref).join(&rref.dir).join(source);
            let object = self.repo.object_path(&platform.name, rref, source);
            let src_mtime = self
                .tree
                .file_mtime(&rref.dir, source)
                .ok_or_else(|| anyhow!("missing file {:?} in {}", source, rref))?;
            let newest_input = src_mtime.max(newest_header);

            if stat(&object)? <= newest_input {
                let canonical = source_display(&rref.dir, source);
                let cmdline = platform.compile_command(&src, &object, &includes);
                self.execute(platform, "compile", &canonical, &cmdline, &object)?;
            }
            match stat(&object)? {
                MTime::Missing => bail!("compile produced no output {:?}", object),
                mtime => newest_object = newest_object.max(mtime),
            }
            objects.push(object);
        }

        if objects.is_empty() {
            return Ok(());
        }
        let library = self.repo.library_path(&platform.name, rref);
        if stat(&library)? <= newest_object {
            let cmdline = platform.archive_command(&objects, &library);
            self.execute(platform, "archive", &rref.to_string(), &cmdline, &library)?;
        }
        libraries.insert(rref.clone(), library);
        Ok(())
    }

    fn link_and_test(
        &mut self,
        platform: &Platform,
        rref: &RuleRef,
        rule: &Rule,
        libraries: &BTreeMap<RuleRef, PathBuf>,
    ) -> anyhow::Result<()> {
        // Rules without sources (pure interface rules) contribute no
        // library and simply do not appear in the map.
        let mut libs = Vec::new();
        let mut newest_library = MTime::Missing;
        for dep in self.closure(rref)? {
            if let Some(library) = libraries.get(dep) {
                newest_library = newest_library.max(stat(library)?);
                libs.push(library.clone());
            }
        }

        let program = self.repo.program_path(&platform.name, rref);
        if stat(&program)? <= newest_library {
            let cmdline = platform.link_command(&libs, &program);
            self.execute(platform, "link", &rref.to_string(), &cmdline, &program)?;
        }

        if rule.kind == RuleKind::Test && platform.is_native() {
            self.run_test(platform, rref, &program)?;
        }
        Ok(())
    }

    /// Tests run on every invocation, rebuilt or current.
    fn run_test(
        &mut self,
        platform: &Platform,
        rref: &RuleRef,
        program: &Path,
    ) -> anyhow::Result<()> {
        println!("[{}] test {}", platform.name, rref);
        let cmdline = program.display().to_string();
        let result = self.runner.run(&cmdline, program)?;
        echo(&result.output);
        if !result.success {
            bail!("test {} failed", rref);
        }
        self.tests += 1;
        Ok(())
    }

    fn execute(
        &mut self,
        platform: &Platform,
        verb: &str,
        subject: &str,
        cmdline: &str,
        produces: &Path,
    ) -> anyhow::Result<()> {
        if let Some(parent) = produces.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|err| anyhow!("create {:?}: {}", parent, err))?;
        }
        println!("[{}] {} {}", platform.name, verb, subject);
        let result = self.runner.run(cmdline, produces)?;
        echo(&result.output);
        if !result.success {
            bail!("command failed: {}", cmdline);
        }
        self.commands += 1;
        Ok(())
    }
}

/// Echoes captured subprocess output; non-empty output is surfaced even for
/// successful commands.
fn echo(output: &[u8]) {
    if !output.is_empty() {
        // Raw write keeps compiler diagnostics byte-for-byte.
        let _ = std::io::stdout().write_all(output);
    }
}

fn source_display(dir: &str, source: &str) -> String {
    if dir.is_empty() {
        source.to_string()
    } else {
        format!("{}/{}", dir, source)
    }
}
