//! Locating, loading and validating the compiled core

use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::fmt;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use std::sync::Arc;

use libloading::{Library, Symbol};
use prospector_core::abi::{
    ABI_VERSION, API_SYMBOL, AbpCoreApi, AbpCoreConfig, ApiFn, VERSION_SYMBOL, VersionFn,
};
use prospector_core::{CoreConfig, ProspectorError, Result};
use tracing::{debug, info};

use crate::env::NativeEnv;

/// Environment variable overriding the library location
pub const LIBRARY_ENV: &str = "PROSPECTOR_NATIVE_LIB";

/// Crate name of the compiled core, before platform decoration
const LIBRARY_STEM: &str = "prospector_native";

enum Origin {
    Linked,
    Loaded {
        path: PathBuf,
        // Keeps the code behind `api` mapped
        _library: Library,
    },
}

struct ModuleInner {
    api: NonNull<AbpCoreApi>,
    origin: Origin,
}

// The table is immutable and its entry points are reentrant across handles.
unsafe impl Send for ModuleInner {}
unsafe impl Sync for ModuleInner {}

/// A validated compiled core
///
/// Cheap to clone; every [`NativeEnv`] keeps a share so the library stays
/// loaded until the last handle is gone.
#[derive(Clone)]
pub struct NativeModule {
    inner: Arc<ModuleInner>,
}

impl fmt::Debug for NativeModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("NativeModule");
        match &self.inner.origin {
            Origin::Linked => s.field("origin", &"linked"),
            Origin::Loaded { path, .. } => s.field("origin", path),
        };
        s.finish()
    }
}

impl NativeModule {
    /// Load the compiled core from a shared library
    ///
    /// Fails when the file is missing, either symbol is absent, the version
    /// differs from [`ABI_VERSION`], or the table layout disagrees.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let load_error = |reason: String| ProspectorError::ModuleLoad {
            path: path.to_path_buf(),
            reason,
        };

        debug!(path = %path.display(), "loading native core");
        let library = unsafe { Library::new(path) }.map_err(|e| load_error(e.to_string()))?;

        let version = unsafe {
            let version_fn: Symbol<VersionFn> = library
                .get(VERSION_SYMBOL)
                .map_err(|e| load_error(e.to_string()))?;
            version_fn()
        };
        if version != ABI_VERSION {
            return Err(ProspectorError::AbiVersionMismatch {
                expected: ABI_VERSION,
                found: version,
            });
        }

        let table = unsafe {
            let api_fn: Symbol<ApiFn> = library
                .get(API_SYMBOL)
                .map_err(|e| load_error(e.to_string()))?;
            api_fn()
        };
        let api = NonNull::new(table.cast_mut())
            .ok_or_else(|| ProspectorError::AbiLayout("null function table".to_string()))?;
        unsafe { api.as_ref() }.check_layout()?;

        info!(path = %path.display(), abi_version = version, "native core loaded");
        Ok(Self {
            inner: Arc::new(ModuleInner {
                api,
                origin: Origin::Loaded {
                    path: path.to_path_buf(),
                    _library: library,
                },
            }),
        })
    }

    /// Load from [`default_library_path`]
    pub fn load_default() -> Result<Self> {
        Self::load(default_library_path())
    }

    /// Wrap a function table linked into this binary
    pub fn linked(api: &'static AbpCoreApi) -> Result<Self> {
        api.check_layout()?;
        info!(abi_version = api.abi_version, "native core linked");
        Ok(Self {
            inner: Arc::new(ModuleInner {
                api: NonNull::from(api),
                origin: Origin::Linked,
            }),
        })
    }

    /// Path the module was loaded from, `None` when linked
    pub fn path(&self) -> Option<&Path> {
        match &self.inner.origin {
            Origin::Linked => None,
            Origin::Loaded { path, .. } => Some(path),
        }
    }

    pub(crate) fn api(&self) -> &AbpCoreApi {
        // Valid for as long as `inner` holds the library.
        unsafe { self.inner.api.as_ref() }
    }

    /// Create a fresh instance
    pub fn create_env(&self, config: &CoreConfig) -> Result<NativeEnv> {
        config.validate()?;
        let abi_config = AbpCoreConfig::from(config);
        let raw = unsafe { (self.api().create)(&abi_config) };
        let handle = NonNull::new(raw).ok_or_else(|| {
            ProspectorError::InvalidConfig("native core rejected the configuration".to_string())
        })?;
        debug!(time_max = config.time_max, "native handle created");
        Ok(NativeEnv::new(self.clone(), handle))
    }
}

/// `$PROSPECTOR_NATIVE_LIB`, else the platform library name next to the
/// running executable
///
/// Test binaries live in `target/<profile>/deps/`, where cargo also places
/// the cdylib, so that directory is searched before its parent. When no
/// candidate exists the path beside the executable is returned so the load
/// error names it.
pub fn default_library_path() -> PathBuf {
    if let Some(path) = std::env::var_os(LIBRARY_ENV) {
        return PathBuf::from(path);
    }
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    library_candidates(&exe_dir)
        .into_iter()
        .find(|path| path.is_file())
        .unwrap_or_else(|| exe_dir.join(library_file_name()))
}

fn library_file_name() -> String {
    format!("{}{}{}", DLL_PREFIX, LIBRARY_STEM, DLL_SUFFIX)
}

/// Search order for the compiled core starting from `exe_dir`
fn library_candidates(exe_dir: &Path) -> Vec<PathBuf> {
    let file_name = library_file_name();
    let mut candidates = vec![exe_dir.join(&file_name)];
    if exe_dir.ends_with("deps") {
        if let Some(profile_dir) = exe_dir.parent() {
            candidates.push(profile_dir.join(&file_name));
        }
    } else {
        candidates.push(exe_dir.join("deps").join(&file_name));
    }
    candidates
}
