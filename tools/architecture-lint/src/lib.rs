//! Layer boundary lint for the `schedule-watch` backend.
//!
//! The backend keeps the update pipeline in `domain`, HTTP handlers in
//! `inbound` and store, page and messaging adapters in `outbound`. This
//! crate parses every source file under those directories and reports
//! imports that cross a boundary:
//!
//! - `domain` may not reach into either adapter layer, nor name web, SQL,
//!   HTTP-client or HTML crates
//! - `inbound` may not reach into `outbound`, nor name SQL, HTTP-client or
//!   HTML crates
//! - `outbound` may not reach into `inbound`, nor name the web framework
//!
//! Run it with `cargo run -p architecture-lint` from anywhere inside the
//! workspace.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use syn::visit::Visit;

/// Name the backend library is imported under from its own binaries.
const LIBRARY_CRATE: &str = "schedule_watch";

const WEB_CRATES: &[&str] = &["actix", "actix_http", "actix_service", "actix_web"];
const SQL_CRATES: &[&str] = &["bb8", "diesel", "diesel_async", "diesel_migrations", "postgres"];
const CLIENT_CRATES: &[&str] = &["reqwest", "scraper"];

/// A single boundary violation discovered by the linter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// File path relative to `backend/src`.
    pub file: PathBuf,
    /// Which rule was broken.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.file.display(), self.message)
    }
}

/// Failure modes returned by the lint.
#[derive(Debug)]
pub enum ArchitectureLintError {
    /// A directory or file could not be read.
    Io(io::Error),
    /// A file did not parse as Rust, or sits outside every layer.
    Parse { file: PathBuf, message: String },
    /// At least one import crossed a boundary.
    Violations(Vec<Violation>),
}

impl fmt::Display for ArchitectureLintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "reading backend sources failed: {err}"),
            Self::Parse { file, message } => {
                write!(f, "cannot lint {}: {message}", file.display())
            }
            Self::Violations(violations) => {
                writeln!(f, "{} layer boundary violation(s):", violations.len())?;
                for violation in violations {
                    writeln!(f, "  {violation}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ArchitectureLintError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for ArchitectureLintError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// A Rust source file to be linted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintSource {
    /// Path relative to `backend/src`.
    pub file: PathBuf,
    pub contents: String,
}

/// Lint the sources under `backend_dir/src`.
pub fn lint_backend_sources(backend_dir: &Path) -> Result<(), ArchitectureLintError> {
    let src_dir = backend_dir.join("src");
    let mut sources = Vec::new();
    for layer in Layer::ALL {
        let dir = src_dir.join(layer.dir_name());
        if dir.is_dir() {
            read_sources(&src_dir, &dir, &mut sources)?;
        }
    }
    lint_sources(&sources)
}

/// Lint in-memory sources.
pub fn lint_sources(sources: &[LintSource]) -> Result<(), ArchitectureLintError> {
    let mut violations = Vec::new();
    for source in sources {
        let layer = Layer::of(&source.file).ok_or_else(|| ArchitectureLintError::Parse {
            file: source.file.clone(),
            message: "file is not under domain/, inbound/ or outbound/".to_owned(),
        })?;
        let parsed =
            syn::parse_file(&source.contents).map_err(|err| ArchitectureLintError::Parse {
                file: source.file.clone(),
                message: err.to_string(),
            })?;
        violations.extend(check_file(&source.file, layer, &parsed));
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ArchitectureLintError::Violations(violations))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layer {
    Domain,
    Inbound,
    Outbound,
}

impl Layer {
    const ALL: [Self; 3] = [Self::Domain, Self::Inbound, Self::Outbound];

    const fn dir_name(self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        }
    }

    fn from_segment(segment: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|layer| layer.dir_name() == segment)
    }

    fn of(relative_path: &Path) -> Option<Self> {
        let first = relative_path.components().next()?;
        Self::from_segment(&first.as_os_str().to_string_lossy())
    }

    fn may_use_layer(self, other: Self) -> bool {
        !matches!(
            (self, other),
            (Self::Domain, Self::Inbound | Self::Outbound)
                | (Self::Inbound, Self::Outbound)
                | (Self::Outbound, Self::Inbound)
        )
    }

    fn forbidden_crates(self) -> impl Iterator<Item = &'static str> {
        let groups: &[&[&'static str]] = match self {
            Self::Domain => &[WEB_CRATES, SQL_CRATES, CLIENT_CRATES],
            Self::Inbound => &[SQL_CRATES, CLIENT_CRATES],
            Self::Outbound => &[WEB_CRATES],
        };
        groups.iter().flat_map(|group| group.iter().copied())
    }
}

/// What the first segments of a path point at.
enum PathTarget<'a> {
    Layer(Layer),
    Crate(&'a str),
    Other,
}

fn classify(segments: &[String]) -> PathTarget<'_> {
    let mut rest = segments
        .iter()
        .map(String::as_str)
        .skip_while(|segment| matches!(*segment, "crate" | "self" | "super"));
    let Some(first) = rest.next() else {
        return PathTarget::Other;
    };
    let relative = segments
        .first()
        .is_some_and(|segment| matches!(segment.as_str(), "crate" | "self" | "super"));

    if first == LIBRARY_CRATE {
        return rest
            .next()
            .and_then(Layer::from_segment)
            .map_or(PathTarget::Other, PathTarget::Layer);
    }
    if let Some(layer) = Layer::from_segment(first) {
        return PathTarget::Layer(layer);
    }
    if relative {
        PathTarget::Other
    } else {
        PathTarget::Crate(first)
    }
}

fn check_file(file: &Path, layer: Layer, parsed: &syn::File) -> Vec<Violation> {
    let mut collector = PathCollector::default();
    collector.visit_file(parsed);

    let forbidden: BTreeSet<&str> = layer.forbidden_crates().collect();
    let mut messages = BTreeSet::new();
    for segments in &collector.paths {
        match classify(segments) {
            PathTarget::Layer(target) if !layer.may_use_layer(target) => {
                messages.insert(format!(
                    "{} code must not use crate::{}",
                    layer.dir_name(),
                    target.dir_name()
                ));
            }
            PathTarget::Crate(name) if forbidden.contains(name) => {
                messages.insert(format!(
                    "{} code must not use external crate `{name}`",
                    layer.dir_name()
                ));
            }
            _ => {}
        }
    }

    messages
        .into_iter()
        .map(|message| Violation {
            file: file.to_path_buf(),
            message,
        })
        .collect()
}

/// Gathers every path mentioned in `use` items, expressions, types and
/// attributes.
#[derive(Default)]
struct PathCollector {
    paths: BTreeSet<Vec<String>>,
}

impl PathCollector {
    fn add_use_tree(&mut self, tree: &syn::UseTree, mut prefix: Vec<String>) {
        match tree {
            syn::UseTree::Path(path) => {
                prefix.push(path.ident.to_string());
                self.add_use_tree(&path.tree, prefix);
            }
            syn::UseTree::Name(name) => {
                prefix.push(name.ident.to_string());
                self.paths.insert(prefix);
            }
            syn::UseTree::Rename(rename) => {
                prefix.push(rename.ident.to_string());
                self.paths.insert(prefix);
            }
            syn::UseTree::Glob(_) => {
                prefix.push("*".to_owned());
                self.paths.insert(prefix);
            }
            syn::UseTree::Group(group) => {
                for item in &group.items {
                    self.add_use_tree(item, prefix.clone());
                }
            }
        }
    }
}

impl<'ast> Visit<'ast> for PathCollector {
    fn visit_path(&mut self, node: &'ast syn::Path) {
        let segments: Vec<String> = node
            .segments
            .iter()
            .map(|segment| segment.ident.to_string())
            .collect();
        if !segments.is_empty() {
            self.paths.insert(segments);
        }
        syn::visit::visit_path(self, node);
    }

    fn visit_item_use(&mut self, node: &'ast syn::ItemUse) {
        self.add_use_tree(&node.tree, Vec::new());
    }
}

fn read_sources(
    src_root: &Path,
    dir: &Path,
    sources: &mut Vec<LintSource>,
) -> Result<(), ArchitectureLintError> {
    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<Result<Vec<_>, io::Error>>()?;
    entries.sort();

    for path in entries {
        if path.is_dir() {
            read_sources(src_root, &path, sources)?;
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            let file = path
                .strip_prefix(src_root)
                .map_err(|err| ArchitectureLintError::Parse {
                    file: path.clone(),
                    message: err.to_string(),
                })?
                .to_path_buf();
            let contents = fs::read_to_string(&path)?;
            sources.push(LintSource { file, contents });
        }
    }
    Ok(())
}
