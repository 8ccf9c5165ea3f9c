use std::{env, fs::File, path::PathBuf, process};

use brew_rename::{strip_marker_file, RenameError, DEFAULT_MARKER};
use memmap::Mmap;

fn main() {
    pretty_env_logger::init();

    let mut args = env::args().skip(1);
    let Some(out_dir) = args.next().map(PathBuf::from) else {
        eprintln!("usage: rename <out-dir> <class-file>...");
        process::exit(2);
    };
    let marker = env::var("RENAME_MARKER").unwrap_or_else(|_| DEFAULT_MARKER.to_owned());

    let mut failed = false;
    for input in args {
        let file = match File::open(&input) {
            Ok(file) => file,
            Err(e) => {
                log::warn!("{}: {}", input, e);
                failed = true;
                continue;
            }
        };
        let mmap = match unsafe { Mmap::map(&file) } {
            Ok(mmap) => mmap,
            Err(e) => {
                log::warn!("{}: {}", input, e);
                failed = true;
                continue;
            }
        };

        match strip_marker_file(&mmap, &out_dir, &marker) {
            Ok(path) => println!("{} -> {}", input, path.display()),
            Err(RenameError::MarkerNotFound { name, .. }) => {
                log::warn!("{}: {} has no marker, skipped", input, name)
            }
            Err(e) => {
                log::warn!("{}: {}", input, e);
                failed = true;
            }
        }
    }

    if failed {
        process::exit(1);
    }
}
