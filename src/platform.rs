//! Target platforms and toolchain command generation.
//!
//! A platform is a name plus a toolchain command prefix; command generation
//! is pure string templating over concrete paths.  The only conditional
//! logic is platform-name-gated flags: the `windows` platform links
//! statically and never runs binaries, the native `linux` platform does.

use crate::repo::Repo;
use anyhow::bail;
use std::path::{Path, PathBuf};

/// The fixed flag set every compile gets.
const COMPILE_FLAGS: &str = "-std=c++17 -Wall -Wextra -Werror -O2";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub name: String,
    /// Prepended verbatim to every toolchain command, e.g.
    /// `x86_64-w64-mingw32-` for a cross toolchain.
    pub prefix: String,
}

impl Platform {
    pub fn native() -> Platform {
        Platform {
            name: "linux".to_string(),
            prefix: String::new(),
        }
    }

    /// Whether binaries produced for this platform run on the build host.
    /// Tests execute only here.
    pub fn is_native(&self) -> bool {
        self.name == "linux"
    }

    fn static_link(&self) -> bool {
        self.name == "windows"
    }

    /// Compiles one isolated source to one object.
    pub fn compile_command(&self, source: &Path, object: &Path, includes: &[PathBuf]) -> String {
        let mut cmd = format!("{}g++ {}", self.prefix, COMPILE_FLAGS);
        for include in includes {
            cmd.push_str(&format!(" -I{}", include.display()));
        }
        cmd.push_str(&format!(
            " -c -o {} {}",
            object.display(),
            source.display()
        ));
        cmd
    }

    /// Archives a rule's objects into its static library.
    pub fn archive_command(&self, objects: &[PathBuf], library: &Path) -> String {
        let mut cmd = format!("{}ar rcs {}", self.prefix, library.display());
        for object in objects {
            cmd.push_str(&format!(" {}", object.display()));
        }
        cmd
    }

    /// Links a closure's libraries into a program.
    pub fn link_command(&self, libraries: &[PathBuf], program: &Path) -> String {
        let mut cmd = format!("{}g++", self.prefix);
        if self.static_link() {
            cmd.push_str(" -static");
        }
        cmd.push_str(&format!(" -o {}", program.display()));
        for library in libraries {
            cmd.push_str(&format!(" {}", library.display()));
        }
        cmd.push_str(" -lpthread");
        cmd
    }
}

/// Loads the platform list: `.mason/platforms` if present, otherwise just
/// the native platform.  One platform per line, `name [toolchain-prefix]`,
/// `#` starts a comment.
pub fn load(repo: &Repo) -> anyhow::Result<Vec<Platform>> {
    let path = repo.platforms_file();
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(vec![Platform::native()])
        }
        Err(err) => bail!("read {:?}: {}", path, err),
    };
    parse(&path, &text)
}

fn parse(path: &Path, text: &str) -> anyhow::Result<Vec<Platform>> {
    let mut platforms = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        let name = parts.next().unwrap().to_string();
        let prefix = parts.next().unwrap_or("").to_string();
        if parts.next().is_some() {
            bail!(
                "{}:{}: expected `name [toolchain-prefix]`",
                path.display(),
                idx + 1
            );
        }
        platforms.push(Platform { name, prefix });
    }
    if platforms.is_empty() {
        bail!("{}: no platforms configured", path.display());
    }
    Ok(platforms)
}
