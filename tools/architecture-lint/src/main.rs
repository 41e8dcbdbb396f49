//! CLI entry point for the layer boundary lint.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

fn main() -> ExitCode {
    let Some(root) = workspace_root() else {
        let _ = writeln!(
            io::stderr().lock(),
            "no workspace root found above the current directory or this crate"
        );
        return ExitCode::FAILURE;
    };
    match architecture_lint::lint_backend_sources(&root.join("backend")) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let _ = write!(io::stderr().lock(), "{err}");
            ExitCode::FAILURE
        }
    }
}

/// First ancestor of `CARGO_WORKSPACE_DIR`, the working directory or this
/// crate whose manifest declares `[workspace]`.
fn workspace_root() -> Option<PathBuf> {
    let candidates = [
        std::env::var_os("CARGO_WORKSPACE_DIR").map(PathBuf::from),
        std::env::current_dir().ok(),
        Some(PathBuf::from(env!("CARGO_MANIFEST_DIR"))),
    ];
    candidates
        .into_iter()
        .flatten()
        .find_map(|start| start.ancestors().find(|dir| declares_workspace(dir)).map(Path::to_path_buf))
}

fn declares_workspace(dir: &Path) -> bool {
    fs::read_to_string(dir.join("Cargo.toml"))
        .is_ok_and(|manifest| manifest.contains("[workspace]"))
}
