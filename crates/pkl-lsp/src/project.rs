//! `PklProject` descriptors.
//!
//! A project directory holds `PklProject.json` (the evaluated project: the
//! dependencies it declares by name) and optionally `PklProject.deps.json`,
//! the lock file produced by resolving those declarations. Lock entries are
//! keyed by the package URI with its version cut down to the major version,
//! so `package://example.com/lib@1.2.3` is looked up as
//! `package://example.com/lib@1`.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use rustc_hash::FxHashMap;
use serde::Deserialize;
use tracing::{debug, warn};

pub const PROJECT_FILE: &str = "PklProject.json";
pub const DEPS_FILE: &str = "PklProject.deps.json";

const SUPPORTED_SCHEMA_VERSION: u32 = 1;
const PACKAGE_SCHEME: &str = "package://";

// =============================================================================
// Package URIs
// =============================================================================

/// `package://<authority>/<path>@<major>.<minor>.<patch>`, without fragment.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PackageUri {
    /// Authority and path, e.g. `example.com/lib`.
    pub name: String,
    pub version: Version,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub fn parse(text: &str) -> Option<Self> {
        // Pre-release and build suffixes do not take part in lookup.
        let core = text.split(['-', '+']).next()?;
        let mut parts = core.split('.').map(|part| part.parse::<u32>().ok());
        let version = Version {
            major: parts.next()??,
            minor: parts.next()??,
            patch: parts.next()??,
        };
        if parts.next().is_some() {
            return None;
        }
        Some(version)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl PackageUri {
    /// Parse a package URI. A `#/path` fragment is ignored.
    pub fn parse(uri: &str) -> Result<Self> {
        let rest = uri
            .strip_prefix(PACKAGE_SCHEME)
            .ok_or_else(|| anyhow!("not a package URI: {uri}"))?;
        let rest = rest.split_once('#').map_or(rest, |(before, _)| before);
        let (name, version) = rest
            .rsplit_once('@')
            .ok_or_else(|| anyhow!("package URI has no version: {uri}"))?;
        if name.is_empty() || !name.contains('/') {
            bail!("package URI has no path: {uri}");
        }
        let version =
            Version::parse(version).ok_or_else(|| anyhow!("malformed package version in {uri}"))?;
        Ok(Self {
            name: name.to_string(),
            version,
        })
    }

    /// Key under which the lock file records this package.
    pub fn lock_key(&self) -> String {
        format!("{PACKAGE_SCHEME}{}@{}", self.name, self.version.major)
    }

    /// URI of a module inside this package.
    pub fn module_uri(&self, path: &str) -> String {
        format!("{self}#/{}", path.trim_start_matches('/'))
    }
}

impl fmt::Display for PackageUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PACKAGE_SCHEME}{}@{}", self.name, self.version)
    }
}

// =============================================================================
// Files on disk
// =============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectFile {
    #[serde(default)]
    dependencies: FxHashMap<String, DeclaredDependency>,
}

#[derive(Deserialize)]
struct DeclaredDependency {
    uri: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DepsFile {
    schema_version: u32,
    #[serde(default)]
    resolved_dependencies: FxHashMap<String, LockedDependency>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum LockedDependency {
    Remote {
        uri: String,
        #[serde(default)]
        checksums: Option<Checksums>,
    },
    Local {
        uri: String,
        path: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Checksums {
    pub sha256: String,
}

// =============================================================================
// Descriptor
// =============================================================================

/// Where an `@name/...` import leads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DependencyTarget {
    /// A remote package, pinned to the locked version.
    Package {
        package: PackageUri,
        checksums: Option<Checksums>,
    },
    /// Another project on disk.
    Local { dir: PathBuf },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectDescriptor {
    pub dir: PathBuf,
    dependencies: FxHashMap<String, DependencyTarget>,
}

impl ProjectDescriptor {
    pub fn new(
        dir: PathBuf,
        dependencies: impl IntoIterator<Item = (String, DependencyTarget)>,
    ) -> Self {
        Self {
            dir,
            dependencies: dependencies.into_iter().collect(),
        }
    }

    /// Load the project in `dir`. The lock file is optional; without it
    /// every declared package resolves to its declared version.
    pub fn load(dir: &Path) -> Result<Self> {
        let project_path = dir.join(PROJECT_FILE);
        let source = std::fs::read_to_string(&project_path)
            .with_context(|| format!("failed to read {}", project_path.display()))?;
        let project: ProjectFile = serde_json::from_str(&source)
            .with_context(|| format!("failed to parse {}", project_path.display()))?;

        let deps_path = dir.join(DEPS_FILE);
        let lock = if deps_path.is_file() {
            let source = std::fs::read_to_string(&deps_path)
                .with_context(|| format!("failed to read {}", deps_path.display()))?;
            let deps: DepsFile = serde_json::from_str(&source)
                .with_context(|| format!("failed to parse {}", deps_path.display()))?;
            if deps.schema_version != SUPPORTED_SCHEMA_VERSION {
                bail!(
                    "unsupported schema version {} in {}",
                    deps.schema_version,
                    deps_path.display()
                );
            }
            Some(deps.resolved_dependencies)
        } else {
            None
        };

        let mut dependencies = FxHashMap::default();
        for (name, declared) in project.dependencies {
            let package = PackageUri::parse(&declared.uri)
                .with_context(|| format!("dependency `{name}` in {}", project_path.display()))?;
            let target = match &lock {
                None => DependencyTarget::Package {
                    package,
                    checksums: None,
                },
                Some(lock) => match lock.get(&package.lock_key()) {
                    Some(locked) => locked_target(dir, locked)
                        .with_context(|| format!("dependency `{name}` in {}", deps_path.display()))?,
                    None => {
                        warn!(dependency = %name, key = %package.lock_key(), "dependency missing from lock file");
                        continue;
                    }
                },
            };
            dependencies.insert(name, target);
        }
        debug!(dir = %dir.display(), count = dependencies.len(), "loaded project");
        Ok(Self {
            dir: dir.to_path_buf(),
            dependencies,
        })
    }

    pub fn dependency(&self, name: &str) -> Option<&DependencyTarget> {
        self.dependencies.get(name)
    }

    /// Declared dependency names, sorted.
    pub fn dependency_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.dependencies.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

fn locked_target(dir: &Path, locked: &LockedDependency) -> Result<DependencyTarget> {
    Ok(match locked {
        LockedDependency::Remote { uri, checksums } => DependencyTarget::Package {
            package: PackageUri::parse(uri)?,
            checksums: checksums.clone(),
        },
        LockedDependency::Local { uri, path } => {
            PackageUri::parse(uri)?;
            DependencyTarget::Local {
                dir: dir.join(path),
            }
        }
    })
}

/// Nearest ancestor directory of `path` (itself included) that holds a
/// project file.
pub fn find_project_dir(path: &Path) -> Option<PathBuf> {
    path.ancestors()
        .find(|dir| dir.join(PROJECT_FILE).is_file())
        .map(Path::to_path_buf)
}
