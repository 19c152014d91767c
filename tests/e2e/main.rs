//! Support code for e2e tests, which run mason as a binary against a temp
//! directory.  The toolchain is faked with shell scripts installed as a
//! platform prefix, so no real compiler is needed.

mod basic;
mod staleness;
mod tidy;

use std::path::PathBuf;

pub fn mason_binary() -> PathBuf {
    std::env::current_exe()
        .expect("test binary path")
        .parent()
        .expect("test binary directory")
        .parent()
        .expect("binary directory")
        .join("mason")
}

pub fn mason_command(args: Vec<&str>) -> std::process::Command {
    let mut cmd = std::process::Command::new(mason_binary());
    cmd.args(args);
    cmd
}

fn print_output(out: &std::process::Output) {
    // Gross: use print! instead of writing to stdout so Rust test
    // framework can capture it.
    print!("{}", String::from_utf8_lossy(&out.stdout));
    print!("{}", String::from_utf8_lossy(&out.stderr));
}

pub fn assert_output_contains(out: &std::process::Output, text: &str) {
    let stdout = String::from_utf8_lossy(&out.stdout);
    if !stdout.contains(text) {
        panic!(
            "assertion failed; expected output to contain {:?} but got:\n{}",
            text, stdout
        );
    }
}

pub fn assert_error_contains(out: &std::process::Output, text: &str) {
    assert!(!out.status.success(), "expected the command to fail");
    let stderr = String::from_utf8_lossy(&out.stderr);
    if !stderr.contains(text) {
        panic!(
            "assertion failed; expected stderr to contain {:?} but got:\n{}",
            text, stderr
        );
    }
}

/// A fake compiler/linker: creates whatever `-o` names.  Linked "programs"
/// are runnable shell scripts so TEST rules can execute them.
const FAKE_GXX: &str = r#"#!/bin/sh
out=
link=1
prev=
for a in "$@"; do
  if [ "$prev" = "-o" ]; then out="$a"; fi
  if [ "$a" = "-c" ]; then link=0; fi
  prev="$a"
done
if [ -z "$out" ]; then echo "fake g++: missing -o" >&2; exit 1; fi
if [ "$link" = 1 ]; then
  printf '#!/bin/sh\nexit 0\n' > "$out"
  chmod +x "$out"
else
  : > "$out"
fi
"#;

/// A fake archiver: `ar rcs <lib> <objects...>`.
const FAKE_AR: &str = r#"#!/bin/sh
: > "$2"
"#;

/// Manages a temporary repository for invoking mason.
pub struct TestSpace {
    dir: tempfile::TempDir,
}

impl TestSpace {
    /// An initialized repository with a base rule and a fake toolchain.
    pub fn new() -> anyhow::Result<Self> {
        let space = TestSpace::bare()?;
        std::fs::create_dir(space.dir.path().join(".mason"))?;
        space.install_fake_toolchain()?;
        space.write("build.rules", "library:\n  name = base\n")?;
        Ok(space)
    }

    /// An empty temp directory, not yet a repository.
    pub fn bare() -> anyhow::Result<Self> {
        let dir = tempfile::tempdir()?;
        Ok(TestSpace { dir })
    }

    pub fn path(&self) -> &std::path::Path {
        self.dir.path()
    }

    /// Write a file into the working space, creating parent directories.
    pub fn write(&self, path: &str, content: &str) -> std::io::Result<()> {
        let path = self.dir.path().join(path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)
    }

    pub fn read(&self, path: &str) -> std::io::Result<Vec<u8>> {
        std::fs::read(self.dir.path().join(path))
    }

    /// Bump a file's mtime to now.
    pub fn touch(&self, path: &str) {
        filetime::set_file_mtime(self.dir.path().join(path), filetime::FileTime::now()).unwrap();
    }

    fn install_fake_toolchain(&self) -> anyhow::Result<()> {
        self.install_toolchain_scripts(FAKE_GXX, FAKE_AR)
    }

    /// Install custom toolchain scripts and point the platform list's
    /// prefix at them.
    pub fn install_toolchain_scripts(&self, gxx: &str, ar: &str) -> anyhow::Result<()> {
        use std::os::unix::fs::PermissionsExt;
        let tools = self.dir.path().join("tools");
        std::fs::create_dir_all(&tools)?;
        for (name, content) in [("g++", gxx), ("ar", ar)] {
            let path = tools.join(name);
            std::fs::write(&path, content)?;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
        }
        self.write(
            ".mason/platforms",
            &format!("linux {}/\n", tools.display()),
        )?;
        Ok(())
    }

    /// Invoke mason, returning process output.
    pub fn run(&self, cmd: &mut std::process::Command) -> std::io::Result<std::process::Output> {
        cmd.current_dir(self.dir.path()).output()
    }

    /// Like run, but also print output if the build failed.
    pub fn run_expect(
        &self,
        cmd: &mut std::process::Command,
    ) -> anyhow::Result<std::process::Output> {
        let out = self.run(cmd)?;
        if !out.status.success() {
            print_output(&out);
            anyhow::bail!("mason failed, status {}", out.status);
        }
        Ok(out)
    }
}

/// The scenario repository: a library, a program depending on it, and an
/// unrelated library.
pub fn write_scenario(space: &TestSpace) -> anyhow::Result<()> {
    space.write("liba/x.h", "int x();\n")?;
    space.write("liba/x.cc", "int x() { return 1; }\n")?;
    space.write(
        "liba/build.rules",
        "library:
  name = a
  headers:
    x.h
  sources:
    x.cc
",
    )?;
    space.write("app/main.cc", "int main() {}\n")?;
    space.write(
        "app/build.rules",
        "program:
  name = b
  sources:
    main.cc
  dependencies:
    /liba/a
",
    )?;
    space.write("other/c.cc", "int c;\n")?;
    space.write(
        "other/build.rules",
        "library:\n  name = c\n  sources:\n    c.cc\n",
    )?;
    Ok(())
}
