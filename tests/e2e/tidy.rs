use crate::*;

#[test]
fn tidy_rewrites_messy_sources() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("u/messy.cc", "int x;   \n\tint y;\n\n\n\n\nint z;\n")?;
    space.write("u/clean.h", "int f();\n")?;
    space.write("u/notes.txt", "untouched  \n")?;

    let out = space.run_expect(&mut mason_command(vec!["tidy"]))?;
    assert_output_contains(&out, "mason: tidied 1 files");
    assert_eq!(
        space.read("u/messy.cc")?,
        b"int x;\n    int y;\n\n\nint z;\n"
    );
    assert_eq!(space.read("u/notes.txt")?, b"untouched  \n");

    let out = space.run_expect(&mut mason_command(vec!["tidy"]))?;
    assert_output_contains(&out, "mason: tidied 0 files");
    Ok(())
}
