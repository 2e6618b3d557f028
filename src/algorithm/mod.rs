//! Pluggable Distributed Algorithms
//!
//! An algorithm is anything implementing [`Algorithm`]. Implementations are
//! made available through an [`AlgorithmRegistry`] of named factories; a
//! factory that fails is kept as an invalid entry with its reason so the
//! operator can see why a name is unavailable.

mod random_traffic;

pub use random_traffic::RandomTraffic;

use crate::simulator::LiveNodes;
use std::collections::BTreeMap;
use std::fmt;

/// Behaviour run once per simulated second over the live node set.
pub trait Algorithm: Send {
    fn run(&mut self, nodes: &mut LiveNodes<'_>, step_count: u64);
}

pub type AlgorithmFactory = Box<dyn Fn() -> Result<Box<dyn Algorithm>, String> + Send + Sync>;

/// Result of instantiating one registered algorithm
pub enum LoadOutcome {
    Loaded(Box<dyn Algorithm>),
    Invalid(String),
}

impl fmt::Debug for LoadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadOutcome::Loaded(_) => f.write_str("Loaded"),
            LoadOutcome::Invalid(reason) => f.debug_tuple("Invalid").field(reason).finish(),
        }
    }
}

#[derive(Default)]
pub struct AlgorithmRegistry {
    factories: BTreeMap<String, AlgorithmFactory>,
}

impl AlgorithmRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the algorithms shipped with the crate.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(RandomTraffic::NAME, || Ok(Box::new(RandomTraffic::new())));
        registry
    }

    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<Box<dyn Algorithm>, String> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Instantiate every registered algorithm, in name order.
    pub fn discover(&self) -> BTreeMap<String, LoadOutcome> {
        self.factories
            .iter()
            .map(|(name, factory)| {
                let outcome = match factory() {
                    Ok(algorithm) => LoadOutcome::Loaded(algorithm),
                    Err(reason) => LoadOutcome::Invalid(format!("Failed to load: {}", reason)),
                };
                (name.clone(), outcome)
            })
            .collect()
    }
}

impl fmt::Debug for AlgorithmRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlgorithmRegistry")
            .field("names", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Outcome of selecting an algorithm by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Activated,
    /// Execution paused; `reset` tells the caller to reset the simulation.
    Paused { reason: String, reset: bool },
}

/// Holds the loaded algorithms and runs the active one.
#[derive(Default)]
pub struct AlgorithmController {
    algorithms: BTreeMap<String, Box<dyn Algorithm>>,
    validation_errors: BTreeMap<String, String>,
    active: Option<String>,
    paused: bool,
}

impl AlgorithmController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_algorithm(&mut self, name: impl Into<String>, algorithm: Box<dyn Algorithm>) {
        let name = name.into();
        self.validation_errors.remove(&name);
        self.algorithms.insert(name, algorithm);
    }

    pub fn record_error(&mut self, name: impl Into<String>, reason: impl Into<String>) {
        let name = name.into();
        self.algorithms.remove(&name);
        self.validation_errors.insert(name, reason.into());
    }

    pub fn algorithm_names(&self) -> impl Iterator<Item = &str> {
        self.algorithms.keys().map(String::as_str)
    }

    pub fn validation_errors(&self) -> &BTreeMap<String, String> {
        &self.validation_errors
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Activate `name`. Anything not loaded pauses execution; the previous
    /// active name is kept but will not run until a valid selection.
    pub fn set_active(&mut self, name: &str, reset_on_error: bool) -> Selection {
        if self.algorithms.contains_key(name) {
            self.active = Some(name.to_string());
            self.paused = false;
            return Selection::Activated;
        }

        let reason = self
            .validation_errors
            .get(name)
            .cloned()
            .unwrap_or_else(|| format!("Unknown algorithm: {}", name));
        self.paused = true;
        Selection::Paused {
            reason,
            reset: reset_on_error,
        }
    }

    pub fn execute(&mut self, nodes: &mut LiveNodes<'_>, step_count: u64) {
        if self.paused {
            return;
        }
        let Some(name) = self.active.as_deref() else {
            return;
        };
        if let Some(algorithm) = self.algorithms.get_mut(name) {
            algorithm.run(nodes, step_count);
        }
    }
}

impl fmt::Debug for AlgorithmController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlgorithmController")
            .field("algorithms", &self.algorithms.keys().collect::<Vec<_>>())
            .field("validation_errors", &self.validation_errors)
            .field("active", &self.active)
            .field("paused", &self.paused)
            .finish()
    }
}
