use std::path::PathBuf;
use std::process::Command;
use std::{env, fs};

use anyhow::{bail, Context};

fn main() {
	env_logger::builder().format_timestamp(None).init();

	if let Err(err) = run() {
		eprintln!("simplc: {err:#}");
		std::process::exit(1);
	}
}

fn run() -> anyhow::Result<()> {
	let mut args = env::args();
	let path = match (args.nth(1), args.next()) {
		(Some(path), None) => PathBuf::from(path),
		_ => bail!("usage: simplc <source-file>"),
	};

	// the assembler must be reachable before any compilation work starts
	let jasmin_jar =
		env::var("JASMIN_JAR").context("JASMIN_JAR environment variable not set")?;

	let source = fs::read_to_string(&path)
		.with_context(|| format!("file '{}' could not be opened", path.display()))?;

	let assembly = match simplc::compile(&source) {
		Ok(assembly) => assembly,
		Err(err) => {
			eprintln!("{}:{}: {}", path.display(), err.pos, err.kind);
			std::process::exit(1);
		}
	};

	let out_path = assembly.file_name();
	fs::write(&out_path, assembly.to_string())
		.with_context(|| format!("could not write '{out_path}'"))?;

	assemble(&jasmin_jar, &out_path)
}

/// Run the external assembler over the emitted text; its output is
/// passed through untouched.
fn assemble(jasmin_jar: &str, file: &str) -> anyhow::Result<()> {
	let status = Command::new("java")
		.arg("-jar")
		.arg(jasmin_jar)
		.arg(file)
		.status()
		.context("failed to run the jasmin assembler")?;

	if !status.success() {
		bail!("jasmin exited with {status}");
	}
	Ok(())
}
