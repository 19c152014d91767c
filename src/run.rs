//! Command-line entry point and the build pipeline it drives.

use crate::repo::Repo;
use crate::task::Subprocess;
use crate::work::Work;
use crate::{deps, isolate, load, platform, repo, tidy, trace};
use anyhow::bail;
use argh::FromArgs;
use std::path::PathBuf;

#[derive(FromArgs)]
/// an incremental build orchestrator for monorepos of compiled rules
struct Args {
    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    Help(HelpArgs),
    Init(InitArgs),
    Tidy(TidyArgs),
    Build(BuildArgs),
}

#[derive(FromArgs)]
#[argh(subcommand, name = "help")]
/// print usage information
struct HelpArgs {
    #[argh(positional)]
    /// subcommand to describe
    subcommand: Option<String>,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "init")]
/// mark a directory as a repository root
struct InitArgs {
    #[argh(positional)]
    /// directory to initialize
    dir: PathBuf,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "tidy")]
/// reformat all header/source files in place
struct TidyArgs {}

#[derive(FromArgs)]
#[argh(subcommand, name = "build")]
/// build all rules for all configured platforms and run tests
struct BuildArgs {
    #[argh(switch)]
    /// write a chrome trace of the run to trace.json
    trace: bool,
}

const USAGE: &str = "usage: mason <command>

commands:
  help [command]  print usage information
  init <dir>      mark a directory as a repository root
  tidy            reformat all header/source files in place
  build           build all rules for all configured platforms and run tests";

const USAGE_HELP: &str = "usage: mason help [command]

Prints usage information for one command, or for mason itself.";

const USAGE_INIT: &str = "usage: mason init <dir>

Marks <dir> as a repository root by creating its marker folder.
Fails if <dir> is not a directory or is already inside a repository.";

const USAGE_TIDY: &str = "usage: mason tidy

Reformats every header/source file under the repository root in place.";

const USAGE_BUILD: &str = "usage: mason build [--trace]

Walks the repository, resolves every rule's dependency closure, rebuilds
whatever is stale for each configured platform, and runs tests on the
native platform.  Configure cross platforms in .mason/platforms, one
`name [toolchain-prefix]` per line.";

fn help(topic: Option<&str>) -> anyhow::Result<i32> {
    let text = match topic {
        None => USAGE,
        Some("help") => USAGE_HELP,
        Some("init") => USAGE_INIT,
        Some("tidy") => USAGE_TIDY,
        Some("build") => USAGE_BUILD,
        Some(other) => bail!("unknown subcommand {:?}; try `mason help`", other),
    };
    println!("{}", text);
    Ok(0)
}

fn build(args: &BuildArgs) -> anyhow::Result<i32> {
    if args.trace {
        trace::open("trace.json")?;
    }

    let repo = Repo::from_cwd()?;
    let tree = trace::scope("load", || load::read(&repo))?;
    let deps = trace::scope("resolve", || deps::resolve(&tree))?;
    trace::scope("isolate", || isolate::materialize(&repo, &tree))?;
    let platforms = platform::load(&repo)?;

    let mut runner = Subprocess;
    let mut work = Work::new(&repo, &tree, &deps, &mut runner);
    trace::scope("build", || work.run(&platforms))?;

    if work.commands == 0 {
        println!("mason: no work to do");
    } else {
        println!("mason: ran {} commands, now up to date", work.commands);
    }
    if work.tests > 0 {
        println!("mason: {} tests passed", work.tests);
    }
    Ok(0)
}

fn run_impl() -> anyhow::Result<i32> {
    let args: Args = argh::from_env();
    match &args.command {
        Command::Help(help_args) => help(help_args.subcommand.as_deref()),
        Command::Init(init_args) => {
            repo::init(&init_args.dir)?;
            Ok(0)
        }
        Command::Tidy(_) => {
            let repo = Repo::from_cwd()?;
            let rewritten = tidy::tidy(&repo)?;
            println!("mason: tidied {} files", rewritten);
            Ok(0)
        }
        Command::Build(build_args) => build(build_args),
    }
}

pub fn run() -> anyhow::Result<i32> {
    let res = run_impl();
    trace::close();
    res
}
