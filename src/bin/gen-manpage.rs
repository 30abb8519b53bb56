//! Render spixfer man pages
//!
//! Writes `spixfer.1` plus one `spixfer-<command>.1` page per subcommand into
//! the directory given as the first argument (`man/` by default).

use clap::CommandFactory;
use std::fs;
use std::path::{Path, PathBuf};

#[path = "../cli.rs"]
mod cli;
#[path = "../programmers.rs"]
#[allow(dead_code)]
mod programmers;

fn render(cmd: clap::Command, dir: &Path, file: &str) -> std::io::Result<PathBuf> {
    let mut page = Vec::new();
    clap_mangen::Man::new(cmd).render(&mut page)?;
    let path = dir.join(file);
    fs::write(&path, page)?;
    Ok(path)
}

fn main() -> std::io::Result<()> {
    let dir = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("man"));
    fs::create_dir_all(&dir)?;

    let cmd = cli::Cli::command();
    let mut pages = vec![render(cmd.clone(), &dir, "spixfer.1")?];

    for sub in cmd.get_subcommands() {
        let name = format!("spixfer-{}", sub.get_name());
        let sub = sub.clone().name(name.clone());
        pages.push(render(sub, &dir, &format!("{}.1", name))?);
    }

    for page in &pages {
        println!("{}", page.display());
    }
    Ok(())
}
