use clap::Parser;

use yantra::cli::{run, YantraArgs};

fn main() -> miette::Result<()> {
    env_logger::init();
    let args = YantraArgs::parse();
    run(args)?;
    Ok(())
}
