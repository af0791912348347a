//! Memoized, re-entrancy-guarded class loading.
//!
//! The registry maps fully qualified class names to their load state. When a
//! name is not loaded yet the host [`ClassLoader`] runs once for it, with the
//! registry lock released. Resolving the same name again from inside that
//! loader fails with [`ResolutionError::Reentrant`] instead of recursing; other
//! threads asking for it meanwhile wait for the load to finish.

use crate::error::{Diagnostic, OrmResult, ResolutionError, ResolutionPhase};
use crate::model::ModelClass;
use std::collections::HashMap;
use std::sync::{Arc, Condvar, LazyLock, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

/// A class known to the registry.
#[derive(Debug, Clone)]
pub enum ClassInfo {
    /// An entity class.
    Model(Arc<ModelClass>),
    /// Any other class. Resolving one as a model is a type mismatch.
    Other { name: String, base: Option<String> },
}

impl ClassInfo {
    pub fn model(class: ModelClass) -> Self {
        ClassInfo::Model(Arc::new(class))
    }

    pub fn name(&self) -> &str {
        match self {
            ClassInfo::Model(class) => class.name(),
            ClassInfo::Other { name, .. } => name,
        }
    }
}

/// Load state of one class name.
#[derive(Debug, Clone, Default)]
pub enum LoadState {
    #[default]
    NotStarted,
    /// Being loaded by the given thread.
    InProgress(ThreadId),
    Loaded(ClassInfo),
    /// The last attempt failed; the next attempt runs the loader again.
    Failed,
}

/// Host mechanism that makes classes known to a registry.
///
/// `load` is called with the registry unlocked and is expected to call
/// [`ClassRegistry::define`] for `name` (and may define others).
pub trait ClassLoader: Send + Sync {
    fn load(&self, name: &str, registry: &ClassRegistry) -> OrmResult<()>;
}

/// A class registration collected with `inventory`.
///
/// # Example
/// ```ignore
/// use bindorm::model::{ClassInfo, ClassRegistration, ModelClass};
///
/// fn user_class() -> ClassInfo {
///     ClassInfo::model(ModelClass::new("app::models::User", "users"))
/// }
///
/// inventory::submit! { ClassRegistration::new("app::models::User", user_class) }
/// ```
pub struct ClassRegistration {
    pub name: &'static str,
    pub define: fn() -> ClassInfo,
}

impl ClassRegistration {
    pub const fn new(name: &'static str, define: fn() -> ClassInfo) -> Self {
        Self { name, define }
    }
}

inventory::collect!(ClassRegistration);

/// Loads classes from `inventory` registrations.
#[derive(Debug, Clone, Copy, Default)]
pub struct InventoryLoader;

impl ClassLoader for InventoryLoader {
    fn load(&self, name: &str, registry: &ClassRegistry) -> OrmResult<()> {
        for reg in inventory::iter::<ClassRegistration> {
            if reg.name == name {
                registry.define((reg.define)());
            }
        }
        Ok(())
    }
}

static GLOBAL_REGISTRY: LazyLock<Arc<ClassRegistry>> =
    LazyLock::new(|| Arc::new(ClassRegistry::with_loader(Arc::new(InventoryLoader))));

/// Name → class table with guarded lazy loading.
pub struct ClassRegistry {
    states: Mutex<HashMap<String, LoadState>>,
    settled: Condvar,
    loader: Option<Arc<dyn ClassLoader>>,
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassRegistry")
            .field("states", &*self.lock())
            .field("loader", &self.loader.is_some())
            .finish()
    }
}

impl ClassRegistry {
    /// A registry without a loader: only explicitly defined classes resolve.
    pub fn new() -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
            settled: Condvar::new(),
            loader: None,
        }
    }

    pub fn with_loader(loader: Arc<dyn ClassLoader>) -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
            settled: Condvar::new(),
            loader: Some(loader),
        }
    }

    /// The process-wide registry, backed by [`InventoryLoader`].
    pub fn global() -> Arc<ClassRegistry> {
        Arc::clone(&GLOBAL_REGISTRY)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, LoadState>> {
        self.states.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make a class known.
    pub fn define(&self, info: ClassInfo) {
        let name = info.name().to_string();
        self.lock().insert(name, LoadState::Loaded(info));
        self.settled.notify_all();
    }

    /// Shorthand for defining an entity class.
    pub fn define_model(&self, class: ModelClass) -> Arc<ModelClass> {
        let class = Arc::new(class);
        self.define(ClassInfo::Model(Arc::clone(&class)));
        class
    }

    pub fn state(&self, name: &str) -> LoadState {
        self.lock().get(name).cloned().unwrap_or_default()
    }

    /// Load `name` (once) and require it to be an entity class.
    ///
    /// `input` is what the caller originally asked for; it is reported in diagnostics.
    pub fn load_model(&self, input: &str, name: &str) -> OrmResult<Arc<ModelClass>> {
        let info = self.load(input, name)?;
        validate_model(input, info)
    }

    fn load(&self, input: &str, name: &str) -> OrmResult<ClassInfo> {
        let me = thread::current().id();
        {
            let mut states = self.lock();
            loop {
                let busy = match states.get(name) {
                    Some(LoadState::Loaded(info)) => return Ok(info.clone()),
                    Some(LoadState::InProgress(owner)) if *owner == me => {
                        tracing::debug!(
                            target: "bindorm.resolver",
                            input,
                            class = name,
                            "re-entrant class resolution"
                        );
                        return Err(ResolutionError::Reentrant(
                            Diagnostic::new(input, ResolutionPhase::Load).resolved(name),
                        )
                        .into());
                    }
                    Some(LoadState::InProgress(_)) => true,
                    _ => false,
                };
                if !busy {
                    break;
                }
                states = self
                    .settled
                    .wait(states)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            if self.loader.is_none() {
                return Err(not_found(input, name));
            }
            states.insert(name.to_string(), LoadState::InProgress(me));
        }

        let attempt = LoadAttempt {
            registry: self,
            name,
        };
        tracing::debug!(target: "bindorm.resolver", input, class = name, "loading class");
        let result = match &self.loader {
            Some(loader) => loader.load(name, self),
            None => Ok(()),
        };

        let mut states = self.lock();
        let loaded = match states.get(name) {
            Some(LoadState::Loaded(info)) => Some(info.clone()),
            _ => None,
        };
        let outcome = match (result, loaded) {
            (Ok(()), Some(info)) => Ok(info),
            (Ok(()), None) => {
                states.insert(name.to_string(), LoadState::Failed);
                Err(not_found(input, name))
            }
            (Err(err), _) => {
                states.insert(name.to_string(), LoadState::Failed);
                Err(err)
            }
        };
        drop(states);
        drop(attempt);
        outcome
    }
}

/// Settles a load on every exit path, including a panicking loader, and wakes
/// the threads waiting on it.
struct LoadAttempt<'a> {
    registry: &'a ClassRegistry,
    name: &'a str,
}

impl Drop for LoadAttempt<'_> {
    fn drop(&mut self) {
        let mut states = self.registry.lock();
        if let Some(state @ LoadState::InProgress(_)) = states.get_mut(self.name) {
            *state = LoadState::Failed;
        }
        drop(states);
        self.registry.settled.notify_all();
    }
}

fn not_found(input: &str, name: &str) -> crate::error::OrmError {
    ResolutionError::NotFound(Diagnostic::new(input, ResolutionPhase::Load).resolved(name)).into()
}

fn validate_model(input: &str, info: ClassInfo) -> OrmResult<Arc<ModelClass>> {
    match info {
        ClassInfo::Model(class) => Ok(class),
        ClassInfo::Other { name, base } => {
            let mut diag = Diagnostic::new(input, ResolutionPhase::Validate)
                .resolved(name)
                .expected("Model");
            if let Some(base) = base {
                diag.expected = Some(format!("Model (found subclass of {base})"));
            }
            Err(ResolutionError::TypeMismatch(diag).into())
        }
    }
}
