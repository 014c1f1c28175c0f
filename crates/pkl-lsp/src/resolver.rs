//! Module URI resolution.
//!
//! Maps a module reference as written in source (an `import`, `amends` or
//! `extends` target) to the canonical URI of the module it denotes. The
//! workspace looks canonical URIs up in its set of open modules.
//!
//! Supported forms:
//! - standard library modules: `pkl:base`, `pkl:json`, ...
//! - absolute URIs: `file:///a/b.pkl`, `package://host/path@1.0.0#/b.pkl`,
//!   any other scheme verbatim
//! - relative paths, resolved against the importing module's URI (inside a
//!   package they stay inside the package)
//! - `@name/path`, resolved through the importing project's dependencies

use std::fmt;
use std::path::Path;

use crate::project::{DependencyTarget, PackageUri, ProjectDescriptor};

const FILE_SCHEME: &str = "file://";
const PACKAGE_SCHEME: &str = "package://";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolutionFailure {
    /// `@name/...` with no project, or a project that does not declare `name`.
    UnknownDependency { name: String },
    /// A relative path climbs above the root of its base.
    EscapesRoot { target: String },
    /// A relative path written in a module whose URI has no path to resolve
    /// against (e.g. a `pkl:` module).
    NoBase { target: String, from: String },
    MalformedUri { target: String },
}

impl fmt::Display for ResolutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionFailure::UnknownDependency { name } => {
                write!(f, "unknown dependency `@{name}`")
            }
            ResolutionFailure::EscapesRoot { target } => {
                write!(f, "`{target}` escapes the root directory")
            }
            ResolutionFailure::NoBase { target, from } => {
                write!(f, "cannot resolve `{target}` relative to `{from}`")
            }
            ResolutionFailure::MalformedUri { target } => write!(f, "malformed module URI `{target}`"),
        }
    }
}

impl std::error::Error for ResolutionFailure {}

/// Resolves module references written in one module.
pub struct ModuleResolver<'p> {
    project: Option<&'p ProjectDescriptor>,
}

impl<'p> ModuleResolver<'p> {
    /// `project` is the project the importing module belongs to, if any.
    pub fn new(project: Option<&'p ProjectDescriptor>) -> Self {
        Self { project }
    }

    /// Canonical URI of `target` as written in the module at `from`.
    pub fn resolve(&self, from: &str, target: &str) -> Result<String, ResolutionFailure> {
        if target.starts_with("pkl:") {
            return Ok(target.to_string());
        }
        if let Some(dependency) = target.strip_prefix('@') {
            return self.resolve_dependency(dependency);
        }
        if target.starts_with(FILE_SCHEME) || target.starts_with("file:/") {
            let path = file_path(target).ok_or_else(|| malformed(target))?;
            return join_file(path, "", target);
        }
        if target.starts_with(PACKAGE_SCHEME) {
            let (package, path) = split_package(target).ok_or_else(|| malformed(target))?;
            let path = normalize_path("", path).ok_or_else(|| escapes(target))?;
            return Ok(package.module_uri(&path));
        }
        if has_scheme(target) {
            return Ok(target.to_string());
        }
        self.resolve_relative(from, target)
    }

    fn resolve_relative(&self, from: &str, target: &str) -> Result<String, ResolutionFailure> {
        if let Some(path) = file_path(from) {
            return join_file(parent_dir(path), target, target);
        }
        if from.starts_with(PACKAGE_SCHEME) {
            let (package, path) = split_package(from).ok_or_else(|| malformed(from))?;
            let path = normalize_path(parent_dir(path), target).ok_or_else(|| escapes(target))?;
            return Ok(package.module_uri(&path));
        }
        Err(ResolutionFailure::NoBase {
            target: target.to_string(),
            from: from.to_string(),
        })
    }

    fn resolve_dependency(&self, reference: &str) -> Result<String, ResolutionFailure> {
        let (name, path) = reference.split_once('/').unwrap_or((reference, ""));
        let unknown = || ResolutionFailure::UnknownDependency {
            name: name.to_string(),
        };
        let project = self.project.ok_or_else(unknown)?;
        match project.dependency(name).ok_or_else(unknown)? {
            DependencyTarget::Package { package, .. } => {
                let path = normalize_path("", path).ok_or_else(|| escapes(reference))?;
                Ok(package.module_uri(&path))
            }
            DependencyTarget::Local { dir } => {
                let base = path_to_uri_path(dir);
                join_file(&base, path, reference)
            }
        }
    }
}

/// `file://` URI of a filesystem path, with `.` and `..` segments removed.
pub fn file_uri(path: &Path) -> String {
    let path = path_to_uri_path(path);
    let normalized = normalize_path("", &path).unwrap_or(path);
    format!("{FILE_SCHEME}{normalized}")
}

fn path_to_uri_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Path component of a `file:` URI.
fn file_path(uri: &str) -> Option<&str> {
    let path = uri
        .strip_prefix(FILE_SCHEME)
        .or_else(|| uri.strip_prefix("file:"))?;
    path.starts_with('/').then_some(path)
}

fn join_file(base: &str, relative: &str, target: &str) -> Result<String, ResolutionFailure> {
    let path = normalize_path(base, relative).ok_or_else(|| escapes(target))?;
    Ok(format!("{FILE_SCHEME}{path}"))
}

fn split_package(uri: &str) -> Option<(PackageUri, &str)> {
    let (package, fragment) = uri.split_once('#').unwrap_or((uri, "/"));
    let package = PackageUri::parse(package).ok()?;
    Some((package, fragment))
}

/// Directory part of a path, trailing slash included.
fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(index) => &path[..=index],
        None => "",
    }
}

/// Join `relative` onto `base` and fold `.` and `..` segments. An absolute
/// `relative` replaces `base`. Returns `None` when `..` climbs above the
/// root.
fn normalize_path(base: &str, relative: &str) -> Option<String> {
    let mut segments: Vec<&str> = Vec::new();
    let start = if relative.starts_with('/') { "" } else { base };
    for segment in start.split('/').chain(relative.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            segment => segments.push(segment),
        }
    }
    Some(format!("/{}", segments.join("/")))
}

fn has_scheme(target: &str) -> bool {
    match target.split_once(':') {
        Some((scheme, _)) => {
            !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

fn malformed(target: &str) -> ResolutionFailure {
    ResolutionFailure::MalformedUri {
        target: target.to_string(),
    }
}

fn escapes(target: &str) -> ResolutionFailure {
    ResolutionFailure::EscapesRoot {
        target: target.to_string(),
    }
}

#[cfg(test)]
#[path = "../tests/resolver_tests.rs"]
mod tests;
