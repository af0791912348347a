//! Model class resolution strategies.
//!
//! A resolver turns a table name, alias or class name into a loaded
//! [`ModelClass`]. Two strategies are provided:
//!
//! - [`ConventionResolver`]: `namespace::UpperCamelCase(singular(table))`,
//!   so `blog_posts` resolves to `app::models::BlogPost`.
//! - [`MapResolver`]: an explicit, case-insensitive map with a fallback.
//!
//! Both load classes through a [`ClassRegistry`].

use crate::error::{Diagnostic, OrmResult, ResolutionError, ResolutionPhase};
use crate::model::{ClassRegistry, ModelClass};
use heck::ToUpperCamelCase;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

/// Resolves names to model classes.
pub trait ModelResolver: Send + Sync {
    fn resolve(&self, name: &str) -> OrmResult<Arc<ModelClass>>;
}

/// True for names that already carry a namespace (`app::models::User`).
pub fn is_qualified(name: &str) -> bool {
    name.contains("::")
}

/// English singular of a snake_case table name.
pub fn singularize(word: &str) -> String {
    const IRREGULAR: &[(&str, &str)] = &[
        ("people", "person"),
        ("men", "man"),
        ("women", "woman"),
        ("children", "child"),
        ("mice", "mouse"),
    ];

    // Only the last segment of `blog_posts` is plural.
    let (head, last) = match word.rfind('_') {
        Some(i) => word.split_at(i + 1),
        None => ("", word),
    };
    let lower = last.to_ascii_lowercase();
    if let Some((_, single)) = IRREGULAR.iter().find(|(plural, _)| *plural == lower) {
        return format!("{head}{single}");
    }

    let single = if lower.len() > 3 && lower.ends_with("ies") {
        format!("{}y", &last[..last.len() - 3])
    } else if ["sses", "shes", "ches", "xes", "zes"]
        .iter()
        .any(|suffix| lower.ends_with(suffix))
    {
        last[..last.len() - 2].to_string()
    } else if lower.ends_with("ss") || lower.ends_with("us") || lower.ends_with("is") {
        last.to_string()
    } else if let Some(stripped) = last.strip_suffix('s').or_else(|| last.strip_suffix('S')) {
        stripped.to_string()
    } else {
        last.to_string()
    };
    format!("{head}{single}")
}

/// Class name for a table (or relation) name by convention, without namespace.
pub fn class_name_for(table: &str) -> String {
    singularize(table.trim()).to_upper_camel_case()
}

/// `namespace::UpperCamelCase(singular(table))`.
#[derive(Debug, Clone)]
pub struct ConventionResolver {
    namespace: String,
    registry: Arc<ClassRegistry>,
}

impl ConventionResolver {
    pub fn new(namespace: impl Into<String>, registry: Arc<ClassRegistry>) -> Self {
        Self {
            namespace: namespace.into(),
            registry,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The qualified class name `input` maps to.
    pub fn class_name(&self, input: &str) -> String {
        let input = input.trim();
        if is_qualified(input) {
            return input.to_string();
        }
        let short = if input.starts_with(|c: char| c.is_ascii_uppercase()) {
            input.to_string()
        } else {
            class_name_for(input)
        };
        if self.namespace.is_empty() {
            short
        } else {
            format!("{}::{short}", self.namespace)
        }
    }
}

impl ModelResolver for ConventionResolver {
    fn resolve(&self, name: &str) -> OrmResult<Arc<ModelClass>> {
        if name.trim().is_empty() {
            return Err(ResolutionError::NotFound(Diagnostic::new(name, ResolutionPhase::Lookup)).into());
        }
        let class = self.class_name(name);
        tracing::debug!(target: "bindorm.resolver", input = name, class = %class, "convention lookup");
        self.registry.load_model(name, &class)
    }
}

/// Explicit table/alias → class map.
///
/// Keys are matched case-insensitively; empty keys are ignored. Qualified
/// class names are loaded as given. Misses go to the fallback resolver.
pub struct MapResolver {
    map: HashMap<String, String>,
    registry: Arc<ClassRegistry>,
    fallback: Option<Arc<dyn ModelResolver>>,
}

impl std::fmt::Debug for MapResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapResolver")
            .field("map", &self.map)
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

impl MapResolver {
    pub fn new(registry: Arc<ClassRegistry>) -> Self {
        Self {
            map: HashMap::new(),
            registry,
            fallback: None,
        }
    }

    /// Map `key` to the qualified class name `class`.
    pub fn map(mut self, key: &str, class: impl Into<String>) -> Self {
        let key = key.trim();
        if !key.is_empty() {
            self.map.insert(key.to_lowercase(), class.into());
        }
        self
    }

    pub fn fallback(mut self, resolver: Arc<dyn ModelResolver>) -> Self {
        self.fallback = Some(resolver);
        self
    }

    /// The class name mapped for `key`, if any.
    pub fn lookup(&self, key: &str) -> Option<&str> {
        self.map.get(&key.trim().to_lowercase()).map(String::as_str)
    }
}

impl ModelResolver for MapResolver {
    fn resolve(&self, name: &str) -> OrmResult<Arc<ModelClass>> {
        let input = name.trim();
        if is_qualified(input) {
            return self.registry.load_model(name, input);
        }
        if let Some(class) = self.lookup(input) {
            tracing::debug!(target: "bindorm.resolver", input = name, class, "map lookup");
            return self.registry.load_model(name, class);
        }
        match &self.fallback {
            Some(fallback) => fallback.resolve(name),
            None => Err(ResolutionError::NotFound(Diagnostic::new(name, ResolutionPhase::Lookup)).into()),
        }
    }
}

static DEFAULT_RESOLVER: LazyLock<RwLock<Arc<dyn ModelResolver>>> = LazyLock::new(|| {
    RwLock::new(Arc::new(ConventionResolver::new(
        "app::models",
        ClassRegistry::global(),
    )))
});

/// The process-wide default resolver.
pub fn default_resolver() -> Arc<dyn ModelResolver> {
    let guard = DEFAULT_RESOLVER
        .read()
        .unwrap_or_else(PoisonError::into_inner);
    Arc::clone(&*guard)
}

/// Replace the process-wide default resolver.
///
/// Meant for process startup. Statements built with an explicit
/// [`OrmContext`](crate::OrmContext) are not affected.
pub fn set_default_resolver(resolver: Arc<dyn ModelResolver>) {
    let mut guard = DEFAULT_RESOLVER
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    *guard = resolver;
}
