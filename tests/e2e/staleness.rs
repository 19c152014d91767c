use crate::*;

#[test]
fn touched_header_rebuilds_the_dependent_chain() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    write_scenario(&space)?;
    space.run_expect(&mut mason_command(vec!["build"]))?;

    space.touch("liba/x.h");
    let out = space.run_expect(&mut mason_command(vec!["build"]))?;
    // The header is in both closures: a recompiles and rearchives, b
    // recompiles, rearchives, and relinks.
    assert_output_contains(&out, "compile liba/x.cc");
    assert_output_contains(&out, "archive /liba/a");
    assert_output_contains(&out, "compile app/main.cc");
    assert_output_contains(&out, "link /app/b");
    assert_output_contains(&out, "mason: ran 5 commands, now up to date");
    Ok(())
}

#[test]
fn rewritten_source_rebuilds_one_rule() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    write_scenario(&space)?;
    space.run_expect(&mut mason_command(vec!["build"]))?;

    space.write("other/c.cc", "int c = 2;\n")?;
    let out = space.run_expect(&mut mason_command(vec!["build"]))?;
    assert_output_contains(&out, "compile other/c.cc");
    assert_output_contains(&out, "mason: ran 2 commands, now up to date");
    Ok(())
}

#[test]
fn unrelated_file_leaves_everything_current() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    write_scenario(&space)?;
    space.write("liba/notes.txt", "scratch\n")?;
    space.run_expect(&mut mason_command(vec!["build"]))?;

    space.touch("liba/notes.txt");
    let out = space.run_expect(&mut mason_command(vec!["build"]))?;
    assert_output_contains(&out, "mason: no work to do");
    Ok(())
}
