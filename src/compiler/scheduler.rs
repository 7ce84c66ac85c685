//! Parallel rewriting of independent compilation units.
//!
//! A [`UnitScheduler`] owns a set of compilation units, each an [`Arena`] of elements keyed by a
//! unit identifier. [`UnitScheduler::run`] rewrites every unit to its fixpoint with one
//! [`RewriteDriver`] per unit, spreading units over the rayon thread pool. A unit is taken out
//! of the map while it is being rewritten, so it is only ever touched by one thread and no
//! map lock is held while the rule runs.

use std::{fmt, hash::Hash};

use dashmap::DashMap;
use rayon::prelude::*;

use crate::{
    compiler::{
        arena::Arena,
        driver::{RewriteConfig, RewriteDriver, RewriteRule, RewriteStats},
        events::{EventKind, EventLog},
    },
    Result,
};

/// Runs a rewrite over many compilation units in parallel.
pub struct UnitScheduler<K, T>
where
    K: Eq + Hash,
{
    units: DashMap<K, Arena<T>>,
    stats: DashMap<K, RewriteStats>,
    config: RewriteConfig,
    events: EventLog,
}

impl<K, T> UnitScheduler<K, T>
where
    K: Eq + Hash + Ord + Clone + fmt::Display + Send + Sync,
    T: Send + Sync,
{
    /// Creates a scheduler without units. Every unit is rewritten with `config`.
    #[must_use]
    pub fn new(config: RewriteConfig) -> Self {
        UnitScheduler {
            units: DashMap::new(),
            stats: DashMap::new(),
            config,
            events: EventLog::new(),
        }
    }

    /// Adds a unit, returning the unit previously stored under `key`.
    ///
    /// Statistics of the replaced unit are discarded.
    pub fn add_unit(&self, key: K, unit: Arena<T>) -> Option<Arena<T>> {
        self.stats.remove(&key);
        self.units.insert(key, unit)
    }

    /// Takes a unit out of the scheduler.
    pub fn remove_unit(&self, key: &K) -> Option<Arena<T>> {
        self.stats.remove(key);
        self.units.remove(key).map(|(_, unit)| unit)
    }

    /// Number of units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Returns `true` if there are no units.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Unit keys in ascending order.
    #[must_use]
    pub fn keys(&self) -> Vec<K> {
        let mut keys: Vec<K> = self.units.iter().map(|entry| entry.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Calls `f` with the unit stored under `key`.
    pub fn with_unit<R>(&self, key: &K, f: impl FnOnce(&Arena<T>) -> R) -> Option<R> {
        self.units.get(key).map(|unit| f(unit.value()))
    }

    /// Statistics of the last run of the unit stored under `key`.
    #[must_use]
    pub fn unit_stats(&self, key: &K) -> Option<RewriteStats> {
        self.stats.get(key).map(|stats| *stats.value())
    }

    /// Events of every unit rewritten so far, tagged with the unit key.
    #[must_use]
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Consumes the scheduler, returning its units in key order.
    #[must_use]
    pub fn into_units(self) -> Vec<(K, Arena<T>)> {
        let mut units: Vec<_> = self.units.into_iter().collect();
        units.sort_by(|(a, _), (b, _)| a.cmp(b));
        units
    }

    /// Rewrites every unit to its fixpoint.
    ///
    /// `rule_factory` builds a fresh rule for each unit; every live element of the unit is a
    /// seed. Units are processed in parallel, each on exactly one thread.
    ///
    /// # Errors
    ///
    /// Every unit is attempted. If any failed, the error of the failing unit with the smallest
    /// key is returned; units that succeeded keep their rewritten state.
    pub fn run<R, F>(&self, rule_factory: F) -> Result<RewriteStats>
    where
        R: RewriteRule<T>,
        F: Fn(&K) -> R + Sync,
    {
        let keys = self.keys();

        let results: Vec<Result<RewriteStats>> = keys
            .par_iter()
            .map(|key| self.run_unit(key, &rule_factory))
            .collect();

        let mut total = RewriteStats::default();
        for result in results {
            total.merge(&result?);
        }
        Ok(total)
    }

    fn run_unit<R, F>(&self, key: &K, rule_factory: &F) -> Result<RewriteStats>
    where
        R: RewriteRule<T>,
        F: Fn(&K) -> R,
    {
        // Take the unit out (brief lock, then released)
        let Some((key, mut unit)) = self.units.remove(key) else {
            return Ok(RewriteStats::default());
        };

        let driver = RewriteDriver::new(self.config.clone());
        let mut rule = rule_factory(&key);
        let seeds = unit.handles();
        let result = driver.run(&mut unit, seeds, &mut rule);

        let label = key.to_string();
        self.events.merge_unit(driver.events(), &label);

        match &result {
            Ok(stats) => {
                self.stats.insert(key.clone(), *stats);
                self.events
                    .record(EventKind::UnitCompleted)
                    .source(rule.name())
                    .unit(label)
                    .message(stats.to_string());
            }
            Err(_) => {
                self.stats.remove(&key);
            }
        }

        self.units.insert(key, unit);
        result
    }
}

impl<K, T> fmt::Debug for UnitScheduler<K, T>
where
    K: Eq + Hash + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitScheduler")
            .field("units", &self.units.len())
            .field("config", &self.config)
            .field("events", &self.events.len())
            .finish()
    }
}
