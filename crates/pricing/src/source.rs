//! Read-only rule sources consulted on every pricing run.
//!
//! Storage lives elsewhere; these traits are the boundary. The in-memory
//! implementations back tests and local wiring.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use thiserror::Error;

use shipdesk_core::CustomerId;

use crate::rule::RuleDefinition;

/// Failure fetching rules from a source. Propagated to the caller as-is.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuleSourceError {
    #[error("rule source unavailable: {0}")]
    Unavailable(String),

    #[error("rule source backend failure: {0}")]
    Backend(String),
}

/// Weight, dimension and seasonal rules by zone and service type.
pub trait RuleCatalog: Send + Sync {
    fn rules_for_context(
        &self,
        zone_code: &str,
        service_type: &str,
    ) -> Result<Vec<RuleDefinition>, RuleSourceError>;
}

/// Time-windowed promotions keyed by zone code (or [`crate::ALL_ZONES`]).
pub trait PromotionalCatalog: Send + Sync {
    fn find_active_promotions(&self, zone: &str) -> Result<Vec<RuleDefinition>, RuleSourceError>;
}

/// Negotiated per-customer overrides.
pub trait CustomerPricingCatalog: Send + Sync {
    fn find_active_for_customer(
        &self,
        customer: CustomerId,
    ) -> Result<Vec<RuleDefinition>, RuleSourceError>;
}

impl<S> RuleCatalog for Arc<S>
where
    S: RuleCatalog + ?Sized,
{
    fn rules_for_context(
        &self,
        zone_code: &str,
        service_type: &str,
    ) -> Result<Vec<RuleDefinition>, RuleSourceError> {
        (**self).rules_for_context(zone_code, service_type)
    }
}

impl<S> PromotionalCatalog for Arc<S>
where
    S: PromotionalCatalog + ?Sized,
{
    fn find_active_promotions(&self, zone: &str) -> Result<Vec<RuleDefinition>, RuleSourceError> {
        (**self).find_active_promotions(zone)
    }
}

impl<S> CustomerPricingCatalog for Arc<S>
where
    S: CustomerPricingCatalog + ?Sized,
{
    fn find_active_for_customer(
        &self,
        customer: CustomerId,
    ) -> Result<Vec<RuleDefinition>, RuleSourceError> {
        (**self).find_active_for_customer(customer)
    }
}

fn zone_key(zone: &str) -> String {
    zone.trim().to_ascii_lowercase()
}

fn poisoned(source: &str) -> RuleSourceError {
    RuleSourceError::Unavailable(format!("{source} lock poisoned"))
}

/// In-memory rule catalog for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryRuleCatalog {
    inner: RwLock<HashMap<(String, String), Vec<RuleDefinition>>>,
}

impl InMemoryRuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &self,
        zone_code: &str,
        service_type: &str,
        rule: RuleDefinition,
    ) -> Result<(), RuleSourceError> {
        let mut map = self.inner.write().map_err(|_| poisoned("rule catalog"))?;
        map.entry((zone_key(zone_code), service_type.trim().to_ascii_lowercase()))
            .or_default()
            .push(rule);
        Ok(())
    }
}

impl RuleCatalog for InMemoryRuleCatalog {
    fn rules_for_context(
        &self,
        zone_code: &str,
        service_type: &str,
    ) -> Result<Vec<RuleDefinition>, RuleSourceError> {
        let map = self.inner.read().map_err(|_| poisoned("rule catalog"))?;
        let key = (zone_key(zone_code), service_type.trim().to_ascii_lowercase());
        Ok(map.get(&key).cloned().unwrap_or_default())
    }
}

/// In-memory promotional catalog for tests/dev.
///
/// Only definitions flagged `active` are returned; validity windows are
/// checked by the engine against the request's pricing instant.
#[derive(Debug, Default)]
pub struct InMemoryPromotionalCatalog {
    inner: RwLock<HashMap<String, Vec<RuleDefinition>>>,
}

impl InMemoryPromotionalCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, zone: &str, rule: RuleDefinition) -> Result<(), RuleSourceError> {
        let mut map = self.inner.write().map_err(|_| poisoned("promotional catalog"))?;
        map.entry(zone_key(zone)).or_default().push(rule);
        Ok(())
    }
}

impl PromotionalCatalog for InMemoryPromotionalCatalog {
    fn find_active_promotions(&self, zone: &str) -> Result<Vec<RuleDefinition>, RuleSourceError> {
        let map = self.inner.read().map_err(|_| poisoned("promotional catalog"))?;
        Ok(map
            .get(&zone_key(zone))
            .map(|rules| rules.iter().filter(|r| r.active).cloned().collect())
            .unwrap_or_default())
    }
}

/// In-memory customer pricing catalog for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryCustomerPricingCatalog {
    inner: RwLock<HashMap<CustomerId, Vec<RuleDefinition>>>,
}

impl InMemoryCustomerPricingCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, customer: CustomerId, rule: RuleDefinition) -> Result<(), RuleSourceError> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| poisoned("customer pricing catalog"))?;
        map.entry(customer).or_default().push(rule);
        Ok(())
    }
}

impl CustomerPricingCatalog for InMemoryCustomerPricingCatalog {
    fn find_active_for_customer(
        &self,
        customer: CustomerId,
    ) -> Result<Vec<RuleDefinition>, RuleSourceError> {
        let map = self
            .inner
            .read()
            .map_err(|_| poisoned("customer pricing catalog"))?;
        Ok(map
            .get(&customer)
            .map(|rules| rules.iter().filter(|r| r.active).cloned().collect())
            .unwrap_or_default())
    }
}
