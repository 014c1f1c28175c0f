//! The set of open modules and the cached analyses over them.
//!
//! A `Workspace` is shared by every request handler. Each open module has a
//! `ModificationTracker` that is bumped whenever its tree is replaced; three
//! workspace-wide trackers cover the set of open modules, project sync and
//! package downloads, and a fourth the server settings. Cached diagnostics
//! depend on the workspace-wide trackers plus the tracker of every module the
//! analysis read.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::{Context, Result, bail};
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use pkl_checker::{CheckerContext, ModuleProvider, analyze_module};
use pkl_common::{CacheStats, CacheStore, CachedValue, Diagnostic, ModificationTracker};
use pkl_solver::Base;
use pkl_syntax::stdlib::base_module_tree;
use pkl_syntax::{ModuleId, NodeIndex, SyntaxTree, TreeBuilder};
use rayon::prelude::*;
use tracing::{debug, debug_span, error, trace, warn};

use crate::project::ProjectDescriptor;
use crate::resolver::ModuleResolver;
use crate::settings::ServerSettings;

struct OpenModule {
    uri: String,
    tree: Arc<SyntaxTree>,
    tracker: Arc<ModificationTracker>,
}

pub struct Workspace {
    base: Base,
    modules: DashMap<ModuleId, OpenModule>,
    /// Every URI ever opened keeps its id, so a reopened module is the same
    /// module.
    ids: DashMap<String, ModuleId>,
    next_id: AtomicU32,
    project_dirs: DashSet<PathBuf>,
    settings: RwLock<ServerSettings>,
    pool: RwLock<Option<Arc<rayon::ThreadPool>>>,
    cache: CacheStore,
    module_set: Arc<ModificationTracker>,
    project_sync: Arc<ModificationTracker>,
    package_download: Arc<ModificationTracker>,
    settings_changed: Arc<ModificationTracker>,
    diagnostics_computed: AtomicUsize,
    projects_loaded: AtomicUsize,
}

impl Workspace {
    pub fn new(settings: ServerSettings) -> Result<Self> {
        let base = Base::new(Arc::new(base_module_tree()))
            .context("bundled standard library model is incomplete")?;
        let workspace = Self {
            base,
            modules: DashMap::new(),
            ids: DashMap::new(),
            next_id: AtomicU32::new(ModuleId::BASE.0 + 1),
            project_dirs: DashSet::new(),
            settings: RwLock::new(ServerSettings::default()),
            pool: RwLock::new(None),
            cache: CacheStore::new(),
            module_set: Arc::new(ModificationTracker::new("module-set")),
            project_sync: Arc::new(ModificationTracker::new("project-sync")),
            package_download: Arc::new(ModificationTracker::new("package-download")),
            settings_changed: Arc::new(ModificationTracker::new("settings")),
            diagnostics_computed: AtomicUsize::new(0),
            projects_loaded: AtomicUsize::new(0),
        };
        workspace.update_settings(settings);
        Ok(workspace)
    }

    pub fn base(&self) -> &Base {
        &self.base
    }

    // =========================================================================
    // Settings
    // =========================================================================

    pub fn settings(&self) -> ServerSettings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Install new settings. Cached diagnostics are recomputed on next use.
    pub fn update_settings(&self, settings: ServerSettings) {
        let pool = settings.parallelism.and_then(|threads| {
            match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
                Ok(pool) => Some(Arc::new(pool)),
                Err(err) => {
                    warn!(threads, error = %err, "falling back to the global thread pool");
                    None
                }
            }
        });
        *self.pool.write().unwrap_or_else(PoisonError::into_inner) = pool;
        *self.settings.write().unwrap_or_else(PoisonError::into_inner) = settings;
        self.settings_changed.increment();
    }

    // =========================================================================
    // Modules
    // =========================================================================

    /// Id for `uri`, allocated on first use. Trees for the module must be
    /// built with this id.
    pub fn module_id(&self, uri: &str) -> ModuleId {
        if let Some(id) = self.ids.get(uri) {
            return *id;
        }
        *self
            .ids
            .entry(uri.to_string())
            .or_insert_with(|| ModuleId(self.next_id.fetch_add(1, Ordering::Relaxed)))
    }

    /// Id of `uri` if the module is currently open.
    pub fn open_module_id(&self, uri: &str) -> Option<ModuleId> {
        let id = *self.ids.get(uri)?;
        self.modules.contains_key(&id).then_some(id)
    }

    /// Open a module or replace its tree.
    pub fn update_module(&self, tree: SyntaxTree) -> Result<ModuleId> {
        let uri = tree.uri().to_string();
        let id = self.module_id(&uri);
        if tree.module_id() != id {
            bail!(
                "tree for {uri} was built as module {} but the workspace knows it as {}",
                tree.module_id().0,
                id.0
            );
        }
        let tree = Arc::new(tree);
        match self.modules.entry(id) {
            Entry::Occupied(mut open) => {
                let open = open.get_mut();
                open.tree = tree;
                let count = open.tracker.increment();
                trace!(uri = %uri, count, "module updated");
            }
            Entry::Vacant(slot) => {
                slot.insert(OpenModule {
                    uri: uri.clone(),
                    tree,
                    tracker: Arc::new(ModificationTracker::new("module")),
                });
                self.module_set.increment();
                debug!(uri = %uri, id = id.0, "module opened");
            }
        }
        Ok(id)
    }

    /// Build a tree for `uri` with `build`, which returns the root, and
    /// install it.
    pub fn open_with(
        &self,
        uri: &str,
        build: impl FnOnce(&mut TreeBuilder) -> NodeIndex,
    ) -> Result<ModuleId> {
        let mut builder = TreeBuilder::new(uri, self.module_id(uri));
        let root = build(&mut builder);
        self.update_module(builder.finish(root))
    }

    /// Close a module. Returns whether it was open.
    pub fn close_module(&self, uri: &str) -> bool {
        let Some(id) = self.open_module_id(uri) else {
            return false;
        };
        self.modules.remove(&id);
        self.cache.remove(&diagnostics_key(uri));
        self.module_set.increment();
        debug!(uri, "module closed");
        true
    }

    pub fn tree(&self, uri: &str) -> Option<Arc<SyntaxTree>> {
        let id = self.open_module_id(uri)?;
        self.modules.get(&id).map(|open| open.tree.clone())
    }

    /// URIs of the open modules, sorted.
    pub fn open_uris(&self) -> Vec<String> {
        let mut uris: Vec<String> = self.modules.iter().map(|open| open.uri.clone()).collect();
        uris.sort_unstable();
        uris
    }

    fn module_uri(&self, id: ModuleId) -> Option<String> {
        self.modules.get(&id).map(|open| open.uri.clone())
    }

    fn module_tracker(&self, id: ModuleId) -> Option<Arc<ModificationTracker>> {
        self.modules.get(&id).map(|open| open.tracker.clone())
    }

    /// A checker context for one request.
    pub fn checker(&self) -> CheckerContext<'_> {
        CheckerContext::new(self, &self.base)
    }

    // =========================================================================
    // Projects
    // =========================================================================

    /// Register a project directory. Modules under it resolve `@name/...`
    /// through its dependencies.
    pub fn add_project(&self, dir: &Path) {
        if self.project_dirs.insert(dir.to_path_buf()) {
            self.project_sync.increment();
        }
    }

    /// The project files changed on disk.
    pub fn sync_projects(&self) {
        self.project_sync.increment();
    }

    /// A package finished downloading.
    pub fn package_downloaded(&self) {
        self.package_download.increment();
    }

    /// The project in `dir`, loaded at most once per project sync or package
    /// download. A project that fails to load is remembered as absent until
    /// then.
    pub fn project(&self, dir: &Path) -> Option<Arc<ProjectDescriptor>> {
        let key = format!("project:{}", dir.display());
        self.cache
            .get_cached_value(&key, || {
                self.projects_loaded.fetch_add(1, Ordering::Relaxed);
                let project = match ProjectDescriptor::load(dir) {
                    Ok(project) => Some(Arc::new(project)),
                    Err(err) => {
                        warn!(dir = %dir.display(), error = %format!("{err:#}"), "failed to load project");
                        None
                    }
                };
                Some(CachedValue::new(
                    project,
                    vec![self.project_sync.clone(), self.package_download.clone()],
                ))
            })
            .flatten()
    }

    /// Project owning the module at `uri`: the innermost registered project
    /// directory containing it.
    pub fn project_for(&self, uri: &str) -> Option<Arc<ProjectDescriptor>> {
        let path = Path::new(uri.strip_prefix("file://")?);
        let dir = self
            .project_dirs
            .iter()
            .filter(|dir| path.starts_with(dir.key()))
            .max_by_key(|dir| dir.key().components().count())
            .map(|dir| dir.key().clone())?;
        self.project(&dir)
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    /// Diagnostics of the open module at `uri`, ordered by position. Empty
    /// when the module is not open.
    pub fn diagnostics(&self, uri: &str) -> Arc<Vec<Diagnostic>> {
        let Some(module) = self.open_module_id(uri) else {
            return Arc::default();
        };
        self.cache
            .get_cached_value(&diagnostics_key(uri), || self.compute_diagnostics(module, uri))
            .unwrap_or_default()
    }

    /// Diagnostics of every open module, analysed in parallel and sorted by
    /// URI.
    pub fn diagnostics_for_all(&self) -> Vec<(String, Arc<Vec<Diagnostic>>)> {
        let uris = self.open_uris();
        let run = || {
            uris.par_iter()
                .map(|uri| (uri.clone(), self.diagnostics(uri)))
                .collect::<Vec<_>>()
        };
        let pool = self
            .pool
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match pool {
            Some(pool) => pool.install(run),
            None => run(),
        }
    }

    fn compute_diagnostics(
        &self,
        module: ModuleId,
        uri: &str,
    ) -> Option<CachedValue<Arc<Vec<Diagnostic>>>> {
        let _span = debug_span!("diagnostics", uri).entered();
        self.diagnostics_computed.fetch_add(1, Ordering::Relaxed);
        let mut dependencies = vec![
            self.module_set.clone(),
            self.project_sync.clone(),
            self.package_download.clone(),
            self.settings_changed.clone(),
        ];
        let options = self.settings().analyzer_options();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let ctx = self.checker();
            let diagnostics = analyze_module(&ctx, module, &options);
            (diagnostics, ctx.loaded_modules())
        }));
        let (diagnostics, loaded) = match outcome {
            Ok(result) => result,
            Err(payload) => {
                error!(uri, message = panic_message(&*payload), "analysis panicked");
                return None;
            }
        };
        dependencies.extend(loaded.into_iter().filter_map(|id| self.module_tracker(id)));
        Some(CachedValue::new(Arc::new(diagnostics), dependencies))
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// How many times diagnostics were computed rather than served from cache.
    pub fn diagnostics_computed(&self) -> usize {
        self.diagnostics_computed.load(Ordering::Relaxed)
    }

    /// How many times a project was read from disk.
    pub fn projects_loaded(&self) -> usize {
        self.projects_loaded.load(Ordering::Relaxed)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

impl ModuleProvider for Workspace {
    fn module_tree(&self, module: ModuleId) -> Option<Arc<SyntaxTree>> {
        self.modules.get(&module).map(|open| open.tree.clone())
    }

    fn resolve_module(&self, from: ModuleId, uri: &str) -> Option<ModuleId> {
        let from_uri = self.module_uri(from)?;
        let project = self.project_for(&from_uri);
        match ModuleResolver::new(project.as_deref()).resolve(&from_uri, uri) {
            Ok(canonical) => {
                let resolved = self.open_module_id(&canonical);
                if resolved.is_none() {
                    trace!(from = %from_uri, target = uri, %canonical, "module is not open");
                }
                resolved
            }
            Err(failure) => {
                debug!(from = %from_uri, target = uri, %failure, "module resolution failed");
                None
            }
        }
    }
}

fn diagnostics_key(uri: &str) -> String {
    format!("diagnostics:{uri}")
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "<non-string panic payload>"
    }
}
