use bindorm::model::{
    ClassInfo, ClassLoader, ClassRegistration, ClassRegistry, ConventionResolver, InventoryLoader,
    LoadState, MapResolver, ModelClass, ModelResolver,
};
use bindorm::{OrmError, OrmResult, ResolutionPhase};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn invoice_class() -> ClassInfo {
    ClassInfo::model(ModelClass::new("billing::Invoice", "invoices").with_soft_deletes())
}

fn invoice_mailer_class() -> ClassInfo {
    ClassInfo::Other {
        name: "billing::InvoiceMailer".to_string(),
        base: Some("Mailer".to_string()),
    }
}

bindorm::inventory::submit! { ClassRegistration::new("billing::Invoice", invoice_class) }
bindorm::inventory::submit! { ClassRegistration::new("billing::InvoiceMailer", invoice_mailer_class) }

fn inventory_registry() -> Arc<ClassRegistry> {
    Arc::new(ClassRegistry::with_loader(Arc::new(InventoryLoader)))
}

#[test]
fn convention_resolver_loads_inventory_classes() {
    let registry = inventory_registry();
    let resolver = ConventionResolver::new("billing", Arc::clone(&registry));

    let class = resolver.resolve("invoices").unwrap();
    assert_eq!(class.name(), "billing::Invoice");
    assert_eq!(class.table(), "invoices");
    assert!(class.has_soft_deletes());
    assert!(matches!(registry.state("billing::Invoice"), LoadState::Loaded(_)));

    // Short, qualified and table names all land on the same class.
    assert!(Arc::ptr_eq(&class, &resolver.resolve("Invoice").unwrap()));
    assert!(Arc::ptr_eq(&class, &resolver.resolve("billing::Invoice").unwrap()));
}

#[test]
fn global_registry_uses_inventory() {
    let resolver = ConventionResolver::new("billing", ClassRegistry::global());
    assert_eq!(resolver.resolve("invoice").unwrap().table(), "invoices");
}

#[test]
fn missing_class_is_not_found() {
    let resolver = ConventionResolver::new("billing", inventory_registry());
    let err = resolver.resolve("ghosts").unwrap_err();

    let OrmError::Resolution(resolution) = &err else {
        panic!("expected a resolution error, got {err:?}");
    };
    assert!(resolution.is_not_found());
    let diag = err.diagnostic().unwrap();
    assert_eq!(diag.input, "ghosts");
    assert_eq!(diag.resolved.as_deref(), Some("billing::Ghost"));
    assert_eq!(diag.phase, ResolutionPhase::Load);
}

#[test]
fn non_model_class_is_a_type_mismatch() {
    let resolver = MapResolver::new(inventory_registry()).map("mailer", "billing::InvoiceMailer");
    let err = resolver.resolve("Mailer").unwrap_err();

    let OrmError::Resolution(resolution) = &err else {
        panic!("expected a resolution error, got {err:?}");
    };
    assert!(resolution.is_type_mismatch());
    let diag = resolution.diagnostic();
    assert_eq!(diag.phase, ResolutionPhase::Validate);
    assert_eq!(diag.resolved.as_deref(), Some("billing::InvoiceMailer"));
    assert!(diag.expected.as_deref().unwrap().contains("Mailer"));
}

#[test]
fn map_resolver_falls_back() {
    let registry = inventory_registry();
    let fallback = Arc::new(ConventionResolver::new("billing", Arc::clone(&registry)));
    let resolver = MapResolver::new(registry)
        .map("bills", "billing::Invoice")
        .fallback(fallback);

    assert_eq!(resolver.resolve("BILLS").unwrap().name(), "billing::Invoice");
    assert_eq!(resolver.resolve("invoices").unwrap().name(), "billing::Invoice");
    assert!(resolver.resolve("payments").is_err());
}

struct CountingLoader {
    calls: AtomicUsize,
}

impl ClassLoader for CountingLoader {
    fn load(&self, name: &str, registry: &ClassRegistry) -> OrmResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if name == "shop::Order" {
            registry.define(ClassInfo::model(ModelClass::new("shop::Order", "orders")));
        }
        Ok(())
    }
}

#[test]
fn loader_runs_once_per_class() {
    let loader = Arc::new(CountingLoader {
        calls: AtomicUsize::new(0),
    });
    let registry = Arc::new(ClassRegistry::with_loader(loader.clone()));
    let resolver = ConventionResolver::new("shop", registry);

    for _ in 0..3 {
        resolver.resolve("orders").unwrap();
    }
    assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
}

struct SelfReferencingLoader {
    resolver: std::sync::OnceLock<Arc<ConventionResolver>>,
}

impl ClassLoader for SelfReferencingLoader {
    fn load(&self, name: &str, _registry: &ClassRegistry) -> OrmResult<()> {
        // Resolving the class being loaded must not recurse.
        let resolver = self.resolver.get().ok_or_else(|| OrmError::state("resolver not set"))?;
        resolver.resolve(name).map(|_| ())
    }
}

#[test]
fn reentrant_resolution_fails() {
    let loader = Arc::new(SelfReferencingLoader {
        resolver: std::sync::OnceLock::new(),
    });
    let registry = Arc::new(ClassRegistry::with_loader(loader.clone()));
    let resolver = Arc::new(ConventionResolver::new("shop", Arc::clone(&registry)));
    loader.resolver.set(Arc::clone(&resolver)).unwrap();

    let err = resolver.resolve("carts").unwrap_err();
    let OrmError::Resolution(resolution) = &err else {
        panic!("expected a resolution error, got {err:?}");
    };
    assert!(resolution.is_reentrant());
    assert!(matches!(registry.state("shop::Cart"), LoadState::Failed));
}
