//! Property table, binding slots and the reload engine.

mod builder;
mod cache;
mod conversion;
mod engine;
mod loader;
pub mod placeholder;
mod publisher;
mod settings;
mod slot;
mod table;
mod validation;

pub use builder::ReloadEngineBuilder;
pub use cache::ResolvedValueCache;
pub use conversion::{
    BoolConversion, CustomConversion, DefaultConversion, LIST_SEPARATOR, ListConversion,
    PropertyConversion,
};
pub use engine::ReloadEngine;
pub use publisher::ChangePublisher;
pub use settings::{ENV_PREFIX, ENV_SEPARATOR, EngineSettings, ReloadSource};
pub use slot::Reloadable;
pub(crate) use slot::SlotBinding;
pub use table::PropertyTable;
pub use validation::Validate;
