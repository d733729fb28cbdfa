//! Tracer program registry
//!
//! Names map to program factories. The process-wide registry is built once
//! (lazily with the built-in programs, or explicitly through
//! `install_registry`) and is read-only afterwards.

use crate::{
    config::TraceOptions,
    dispatcher::Tracer,
    errors::{ProgramError, TracerError},
    programs,
    traits::TracerProgram,
    types::TraceContext,
};
use once_cell::sync::OnceCell;
use serde::de::DeserializeOwned;
use std::{collections::BTreeMap, sync::Arc};
use tracing::debug;

/// Builds a program from its JSON config (`null` when none was given)
pub type ProgramFactory =
    Arc<dyn Fn(&serde_json::Value) -> Result<Box<dyn TracerProgram>, ProgramError> + Send + Sync>;

static REGISTRY: OnceCell<TracerRegistry> = OnceCell::new();

/// Read-only mapping from tracer names to factories
#[derive(Clone)]
pub struct TracerRegistry {
    factories: BTreeMap<String, ProgramFactory>,
}

impl std::fmt::Debug for TracerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TracerRegistry").field("names", &self.names()).finish()
    }
}

impl Default for TracerRegistry {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl TracerRegistry {
    /// Builder preloaded with the built-in programs
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::empty()
            .register(programs::CALL_TRACER, |config| {
                Ok(Box::new(programs::CallTracer::new(
                    programs::CallSchema::Current,
                    parse_config(config)?,
                )))
            })
            .register(programs::CALL_TRACER_LEGACY, |config| {
                Ok(Box::new(programs::CallTracer::new(
                    programs::CallSchema::Legacy,
                    parse_config(config)?,
                )))
            })
            .register(programs::PRESTATE_TRACER, |config| {
                Ok(Box::new(programs::PrestateTracer::new(parse_config(config)?)))
            })
            .register(programs::FOUR_BYTE_TRACER, |_| Ok(Box::<programs::FourByteTracer>::default()))
            .register(programs::OPCOUNT_TRACER, |_| Ok(Box::<programs::OpcountTracer>::default()))
            .register(programs::NOOP_TRACER, |_| Ok(Box::new(programs::NoopTracer)))
    }

    /// Registered names in lexical order
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Instantiates the named program
    pub fn create_program(
        &self,
        name: &str,
        config: &serde_json::Value,
    ) -> Result<Box<dyn TracerProgram>, TracerError> {
        let factory = self.factories.get(name).ok_or_else(|| TracerError::Lookup(name.to_string()))?;
        factory(config).map_err(|err| match err {
            ProgramError::InvalidConfig(message) => TracerError::InvalidConfig(message),
            other => TracerError::InvalidConfig(other.to_string()),
        })
    }

    /// Creates a tracer for one transaction
    pub fn create_tracer(
        &self,
        options: &TraceOptions,
        context: TraceContext,
    ) -> Result<Tracer, TracerError> {
        let name = options.tracer_name();
        let config = options.tracer_config.clone().unwrap_or(serde_json::Value::Null);
        let program = self.create_program(name, &config)?;
        let budget = options.budget()?;
        debug!(target: "revm_tracers::registry", tracer = name, ?budget, "tracer created");
        Ok(Tracer::new(name, context, program, budget))
    }
}

/// Collects factories before the registry is frozen
pub struct RegistryBuilder {
    factories: BTreeMap<String, ProgramFactory>,
}

impl RegistryBuilder {
    /// Builder without the built-in programs
    pub fn empty() -> Self {
        Self { factories: BTreeMap::new() }
    }

    /// Adds or replaces a factory
    pub fn register<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&serde_json::Value) -> Result<Box<dyn TracerProgram>, ProgramError> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    pub fn build(self) -> TracerRegistry {
        TracerRegistry { factories: self.factories }
    }
}

/// Installs the process-wide registry
///
/// Fails, returning the registry, when one is already installed or the
/// built-in registry was already read.
pub fn install_registry(registry: TracerRegistry) -> Result<(), TracerRegistry> {
    REGISTRY.set(registry)
}

/// The process-wide registry
pub fn registry() -> &'static TracerRegistry {
    REGISTRY.get_or_init(TracerRegistry::default)
}

/// Creates a tracer from the process-wide registry with default options
///
/// # Example
/// ```rust
/// use revm_tracers::{create_tracer, types::TraceContext, TracerError};
///
/// let tracer = create_tracer("callTracer", TraceContext::default());
/// assert!(tracer.is_ok());
/// assert!(matches!(
///     create_tracer("nope", TraceContext::default()),
///     Err(TracerError::Lookup(_))
/// ));
/// ```
pub fn create_tracer(name: &str, context: TraceContext) -> Result<Tracer, TracerError> {
    let options = TraceOptions { tracer: Some(name.to_string()), ..Default::default() };
    registry().create_tracer(&options, context)
}

/// Creates a tracer from the process-wide registry
pub fn create_tracer_with_options(
    options: &TraceOptions,
    context: TraceContext,
) -> Result<Tracer, TracerError> {
    registry().create_tracer(options, context)
}

/// Parses a program config, using the default for `null`
pub fn parse_config<T>(config: &serde_json::Value) -> Result<T, ProgramError>
where
    T: DeserializeOwned + Default,
{
    if config.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(config.clone()).map_err(|e| ProgramError::InvalidConfig(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builtins_registered() {
        let registry = TracerRegistry::default();
        for name in [
            "callTracer",
            "callTracerLegacy",
            "prestateTracer",
            "4byteTracer",
            "opcountTracer",
            "noopTracer",
        ] {
            assert!(registry.contains(name), "{name} missing");
        }
    }

    #[test]
    fn test_unknown_name() {
        let registry = TracerRegistry::default();
        assert!(matches!(
            registry.create_program("jsTracer", &serde_json::Value::Null),
            Err(TracerError::Lookup(name)) if name == "jsTracer"
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let registry = TracerRegistry::default();
        assert!(matches!(
            registry.create_program("callTracer", &json!({"onlyTopCall": "yes"})),
            Err(TracerError::InvalidConfig(_))
        ));
        assert!(matches!(
            registry.create_program("prestateTracer", &json!({"unknownField": true})),
            Err(TracerError::InvalidConfig(_))
        ));
        assert!(registry.create_program("prestateTracer", &json!({"diffMode": true})).is_ok());
    }

    #[test]
    fn test_custom_registration() {
        let registry = TracerRegistry::builder()
            .register("silent", |_| Ok(Box::new(programs::NoopTracer)))
            .build();
        assert!(registry.contains("silent"));
        assert!(registry.contains("callTracer"));

        let bare = RegistryBuilder::empty()
            .register("silent", |_| Ok(Box::new(programs::NoopTracer)))
            .build();
        assert_eq!(bare.names(), vec!["silent"]);
    }
}
