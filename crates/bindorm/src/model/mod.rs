//! Model classes, entities and class resolution.

mod class;
mod entity;
mod registry;
pub mod resolver;

pub use class::ModelClass;
pub use entity::{Entity, Related};
pub use registry::{ClassInfo, ClassLoader, ClassRegistration, ClassRegistry, InventoryLoader, LoadState};
pub use resolver::{
    ConventionResolver, MapResolver, ModelResolver, default_resolver, set_default_resolver,
};
