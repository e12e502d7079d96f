//! `parlance` — runs a single source file against the default prelude.
//!
//! Import/dialect paths are resolved relative to the entry file's directory;
//! this is the one piece of filesystem glue the core itself deliberately
//! leaves out (see `src/loader.rs`).

mod cli;

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use cli::*;
use log::{debug, error};

use parlance::loader::ModuleLoader;
use parlance::module::ModuleTable;
use parlance::prelude;

/// Resolves an `import`/`dialect` path against the directory the entry file
/// lives in, appending `.prl` if the path names no extension.
struct FsLoader {
    root: PathBuf,
}

impl ModuleLoader for FsLoader {
    fn load(&self, path: &str) -> Option<String> {
        let mut candidate = self.root.join(path);
        if candidate.extension().is_none() {
            candidate.set_extension("prl");
        }
        debug!("loading module '{path}' from {}", candidate.display());
        fs::read_to_string(candidate).ok()
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Cli::init();
    simple_logger::init_with_level((&args.verbosity).into())?;

    let Commands::Run(run_args) = args.command;
    let file = fs::canonicalize(&run_args.file)?;
    let source = fs::read_to_string(&file)?;
    let root = file.parent().map(Path::to_path_buf).unwrap_or_default();

    let table = ModuleTable::new(FsLoader { root }, prelude::build(), prelude::prototypes());
    match table.evaluate_entry(&file.to_string_lossy(), &source) {
        Ok(_) => Ok(()),
        Err(packet) => {
            error!("{packet}");
            std::process::exit(1);
        }
    }
}
