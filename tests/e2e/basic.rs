use crate::*;

#[test]
fn empty_repository() -> anyhow::Result<()> {
    let space = TestSpace::bare()?;
    std::fs::create_dir(space.path().join(".mason"))?;
    let out = space.run_expect(&mut mason_command(vec!["build"]))?;
    assert_output_contains(&out, "mason: no work to do");
    Ok(())
}

#[test]
fn build_then_rebuild() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    write_scenario(&space)?;

    let out = space.run_expect(&mut mason_command(vec!["build"]))?;
    assert_output_contains(&out, "compile liba/x.cc");
    assert_output_contains(&out, "link /app/b");
    assert_output_contains(&out, "mason: ran 7 commands, now up to date");
    assert!(space.read(".mason/out/linux/bin/app/b").is_ok());
    assert!(space.read(".mason/out/linux/lib/liba/a.a").is_ok());

    let out = space.run_expect(&mut mason_command(vec!["build"]))?;
    assert_output_contains(&out, "mason: no work to do");
    Ok(())
}

#[test]
fn tests_execute_on_the_native_platform() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("t/smoke.cc", "int main() {}\n")?;
    space.write(
        "t/build.rules",
        "test:\n  name = smoke\n  sources:\n    smoke.cc\n",
    )?;

    let out = space.run_expect(&mut mason_command(vec!["build"]))?;
    assert_output_contains(&out, "test /t/smoke");
    assert_output_contains(&out, "mason: 1 tests passed");

    // Still executed when everything is current.
    let out = space.run_expect(&mut mason_command(vec!["build"]))?;
    assert_output_contains(&out, "mason: no work to do");
    assert_output_contains(&out, "mason: 1 tests passed");
    Ok(())
}

#[test]
fn init_creates_a_repository() -> anyhow::Result<()> {
    let space = TestSpace::bare()?;
    space.run_expect(&mut mason_command(vec!["init", "."]))?;
    assert!(space.path().join(".mason").is_dir());

    // A nested init must refuse.
    space.write("sub/keep", "")?;
    let out = space.run(&mut mason_command(vec!["init", "sub"]))?;
    assert_error_contains(&out, "already inside");
    Ok(())
}

#[test]
fn help_text() -> anyhow::Result<()> {
    let space = TestSpace::bare()?;
    let out = space.run_expect(&mut mason_command(vec!["help"]))?;
    assert_output_contains(&out, "usage: mason <command>");
    let out = space.run_expect(&mut mason_command(vec!["help", "build"]))?;
    assert_output_contains(&out, "usage: mason build");
    let out = space.run(&mut mason_command(vec!["help", "frobnicate"]))?;
    assert_error_contains(&out, "unknown subcommand");
    Ok(())
}
