//! Contract between presentation steps and the orchestrator driving them.

pub mod flip_in;

pub use flip_in::{FlipInPosts, FlipInPostsFactory, SKIN_KEY};

use crate::error::StepError;
use crate::feeds::{AvatarProvider, PostStreamProvider};
use serde::Deserialize;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// One discrete unit of presentation logic.
///
/// `do_step` returning `Ok` means the step has started. Completion is
/// reported later through the context's proceed signal. Steps that animate
/// spawn onto the current tokio runtime and must be invoked from within one.
pub trait Step: Send + Sync {
    fn do_step(&self, context: &MachineContext) -> Result<(), StepError>;

    /// Advisory duration for the orchestrator's scheduling.
    fn preferred_step_duration(&self, context: &MachineContext) -> Duration;
}

/// Registration entry for a step type.
pub trait StepFactory: Send + Sync {
    fn step_name(&self) -> &'static str;

    fn create(&self, definition: &StepDefinition) -> Result<Box<dyn Step>, StepError>;

    /// Providers that must be registered before the step can run.
    fn required_data_providers(&self, definition: &StepDefinition) -> Vec<ProviderKey>;
}

/// Step entry from the orchestrator's settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StepDefinition {
    pub step_class_name: String,
    #[serde(default)]
    pub config: Option<toml::Value>,
}

impl StepDefinition {
    pub fn new(step_class_name: impl Into<String>) -> Self {
        Self {
            step_class_name: step_class_name.into(),
            config: None,
        }
    }

    pub fn with_config(mut self, config: toml::Value) -> Self {
        self.config = Some(config);
        self
    }
}

/// Marker for types that can be looked up as data providers.
pub trait DataProvider: Any + Send + Sync {}

impl DataProvider for PostStreamProvider {}
impl DataProvider for AvatarProvider {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProviderKey {
    type_id: TypeId,
    name: &'static str,
}

impl ProviderKey {
    pub fn of<P: DataProvider>() -> Self {
        Self {
            type_id: TypeId::of::<P>(),
            name: short_type_name::<P>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Data providers indexed by their concrete type.
#[derive(Clone, Default)]
pub struct DataProviders {
    providers: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl fmt::Debug for DataProviders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataProviders")
            .field("count", &self.providers.len())
            .finish()
    }
}

impl DataProviders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<P: DataProvider>(&mut self, provider: Arc<P>) -> &mut Self {
        self.providers.insert(TypeId::of::<P>(), provider);
        self
    }

    pub fn get<P: DataProvider>(&self) -> Option<Arc<P>> {
        self.providers
            .get(&TypeId::of::<P>())
            .cloned()
            .and_then(|provider| provider.downcast::<P>().ok())
    }

    pub fn contains(&self, key: &ProviderKey) -> bool {
        self.providers.contains_key(&key.type_id)
    }
}

/// Verifies every provider the factory declares is registered.
pub fn check_required_providers(
    factory: &dyn StepFactory,
    definition: &StepDefinition,
    providers: &DataProviders,
) -> Result<(), StepError> {
    match factory
        .required_data_providers(definition)
        .into_iter()
        .find(|key| !providers.contains(key))
    {
        Some(missing) => Err(StepError::MissingProvider {
            provider: missing.name(),
        }),
        None => Ok(()),
    }
}

/// Message sent when a step has finished and the presentation may advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Proceed;

pub type ProceedReceiver = mpsc::UnboundedReceiver<Proceed>;

/// Sending half of the completion channel. Consumed by `proceed`.
#[derive(Debug, Clone)]
pub struct ProceedSignal {
    tx: mpsc::UnboundedSender<Proceed>,
}

impl ProceedSignal {
    pub fn channel() -> (Self, ProceedReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn proceed(self) {
        if self.tx.send(Proceed).is_err() {
            tracing::warn!("orchestrator stopped listening before step completed");
        }
    }
}

/// Everything a step sees of the orchestrator: keyed shared state, typed
/// data providers and the proceed signal.
pub struct MachineContext {
    state: HashMap<String, Arc<dyn Any + Send + Sync>>,
    providers: DataProviders,
    proceed: ProceedSignal,
}

impl fmt::Debug for MachineContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MachineContext")
            .field("state", &self.state.keys().collect::<Vec<_>>())
            .field("providers", &self.providers)
            .finish()
    }
}

impl MachineContext {
    pub fn new(providers: DataProviders, proceed: ProceedSignal) -> Self {
        Self {
            state: HashMap::new(),
            providers,
            proceed,
        }
    }

    pub fn put<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: Arc<T>) {
        self.state.insert(key.into(), value);
    }

    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Result<Arc<T>, StepError> {
        let value = self
            .state
            .get(key)
            .cloned()
            .ok_or_else(|| StepError::MissingState {
                key: key.to_string(),
            })?;
        value.downcast::<T>().map_err(|_| StepError::StateType {
            key: key.to_string(),
            expected: short_type_name::<T>(),
        })
    }

    pub fn data_provider<P: DataProvider>(&self) -> Result<Arc<P>, StepError> {
        self.providers.get::<P>().ok_or(StepError::MissingProvider {
            provider: short_type_name::<P>(),
        })
    }

    pub fn proceed_signal(&self) -> ProceedSignal {
        self.proceed.clone()
    }

    pub fn proceed(&self) {
        self.proceed.clone().proceed();
    }
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}
