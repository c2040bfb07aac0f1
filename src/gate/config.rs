use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::errors::{InvalidRuleError, ProviderError};

use super::request::RequestView;
use super::rule::{Predicate, Role, Rule};

/// Resolves the caller identity for a request. `Ok(None)` means no identity.
pub type IdentityProvider<I> =
    Arc<dyn Fn(&RequestView<'_>) -> Result<Option<I>, ProviderError> + Send + Sync>;

/// Paths that bypass the gate unless replaced.
pub const DEFAULT_EXCLUDED_PATHS: [&str; 2] = ["/health_check", "/favicon.ico"];

/// One consistent view of the gate configuration.
pub struct GateSettings<I> {
    enabled: bool,
    excluded_paths: Vec<String>,
    provider: IdentityProvider<I>,
    maintenance_page: Option<PathBuf>,
    rules: Vec<Rule<I>>,
}

impl<I: 'static> Default for GateSettings<I> {
    fn default() -> Self {
        Self {
            enabled: false,
            excluded_paths: DEFAULT_EXCLUDED_PATHS.iter().map(|p| p.to_string()).collect(),
            provider: Arc::new(|_: &RequestView<'_>| Ok(None)),
            maintenance_page: None,
            rules: Vec::new(),
        }
    }
}

impl<I> Clone for GateSettings<I> {
    fn clone(&self) -> Self {
        Self {
            enabled: self.enabled,
            excluded_paths: self.excluded_paths.clone(),
            provider: Arc::clone(&self.provider),
            maintenance_page: self.maintenance_page.clone(),
            rules: self.rules.clone(),
        }
    }
}

impl<I> fmt::Debug for GateSettings<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GateSettings")
            .field("enabled", &self.enabled)
            .field("excluded_paths", &self.excluded_paths)
            .field("maintenance_page", &self.maintenance_page)
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}

impl<I> GateSettings<I> {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn excluded_paths(&self) -> &[String] {
        &self.excluded_paths
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        self.excluded_paths.iter().any(|excluded| excluded == path)
    }

    pub fn maintenance_page(&self) -> Option<&Path> {
        self.maintenance_page.as_deref()
    }

    pub fn rules(&self) -> &[Rule<I>] {
        &self.rules
    }

    pub fn resolve_identity(&self, request: &RequestView<'_>) -> Result<Option<I>, ProviderError> {
        (self.provider)(request)
    }

    /// Any-match over the registered rules. No rules means everyone passes.
    pub fn allowed(&self, identity: &I, request: &RequestView<'_>) -> bool {
        self.rules.is_empty() || self.rules.iter().any(|rule| rule.matches(identity, request))
    }

    pub fn identity_present(identity: Option<&I>) -> bool {
        identity.is_some()
    }

    fn push_excluded(&mut self, path: String) {
        if !self.is_excluded(&path) {
            self.excluded_paths.push(path);
        }
    }
}

/// Shared gate configuration.
///
/// Cheap to read from many requests at once: readers clone the current
/// snapshot and never call user code while holding the lock. Writers replace
/// the whole snapshot, so a reader sees either all of an update or none of it.
pub struct Configuration<I> {
    inner: RwLock<Arc<GateSettings<I>>>,
}

impl<I: 'static> Default for Configuration<I> {
    fn default() -> Self {
        Self::from_settings(GateSettings::default())
    }
}

impl<I: 'static> fmt::Debug for Configuration<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Configuration").field(&*self.snapshot()).finish()
    }
}

impl<I: 'static> Configuration<I> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> ConfigurationBuilder<I> {
        ConfigurationBuilder::new()
    }

    pub fn from_settings(settings: GateSettings<I>) -> Self {
        Self {
            inner: RwLock::new(Arc::new(settings)),
        }
    }

    pub fn snapshot(&self) -> Arc<GateSettings<I>> {
        Arc::clone(&self.inner.read())
    }

    fn update(&self, f: impl FnOnce(&mut GateSettings<I>)) {
        let mut guard = self.inner.write();
        f(Arc::make_mut(&mut guard));
    }

    pub fn is_enabled(&self) -> bool {
        self.snapshot().enabled
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.update(|settings| settings.enabled = enabled);
    }

    pub fn enable_gate(&self) {
        self.set_enabled(true);
    }

    pub fn disable_gate(&self) {
        self.set_enabled(false);
    }

    /// Wakes the sleeping gate up: requests flow through untouched.
    pub fn play_pokeflute(&self) {
        self.disable_gate();
    }

    /// Puts the gate back to sleep across the path.
    pub fn stop_pokeflute(&self) {
        self.enable_gate();
    }

    pub fn excluded_paths(&self) -> Vec<String> {
        self.snapshot().excluded_paths.clone()
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        self.snapshot().is_excluded(path)
    }

    /// Replaces the excluded paths, defaults included.
    pub fn set_excluded_paths<P>(&self, paths: impl IntoIterator<Item = P>)
    where
        P: Into<String>,
    {
        let mut next = Vec::new();
        for path in paths {
            let path = path.into();
            if !next.contains(&path) {
                next.push(path);
            }
        }
        self.update(|settings| settings.excluded_paths = next);
    }

    pub fn exclude_path(&self, path: impl Into<String>) {
        let path = path.into();
        self.update(|settings| settings.push_excluded(path));
    }

    pub fn set_identity_provider<F>(&self, provider: F)
    where
        F: Fn(&RequestView<'_>) -> Result<Option<I>, ProviderError> + Send + Sync + 'static,
    {
        let provider: IdentityProvider<I> = Arc::new(provider);
        self.update(|settings| settings.provider = provider);
    }

    pub fn maintenance_page(&self) -> Option<PathBuf> {
        self.snapshot().maintenance_page.clone()
    }

    pub fn set_maintenance_page(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        self.update(|settings| settings.maintenance_page = Some(path));
    }

    pub fn clear_maintenance_page(&self) {
        self.update(|settings| settings.maintenance_page = None);
    }

    pub fn add_rule<F>(&self, role: impl Into<Role>, predicate: F) -> Result<(), InvalidRuleError>
    where
        F: Fn(&I, &RequestView<'_>) -> bool + Send + Sync + 'static,
    {
        let rule = Rule::new(role, predicate)?;
        self.update(|settings| settings.rules.push(rule));
        Ok(())
    }

    pub fn try_add_rule(
        &self,
        role: Option<Role>,
        predicate: Option<Predicate<I>>,
    ) -> Result<(), InvalidRuleError> {
        let rule = Rule::from_parts(role, predicate)?;
        self.update(|settings| settings.rules.push(rule));
        Ok(())
    }

    pub fn clear_rules(&self) {
        self.update(|settings| settings.rules.clear());
    }

    /// Roles of the registered rules, in registration order.
    pub fn roles(&self) -> Vec<Role> {
        self.snapshot().rules.iter().map(|rule| rule.role().clone()).collect()
    }

    pub fn allowed(&self, identity: &I, request: &RequestView<'_>) -> bool {
        self.snapshot().allowed(identity, request)
    }

    pub fn identity_present(identity: Option<&I>) -> bool {
        GateSettings::identity_present(identity)
    }
}

/// Fluent construction of a [`Configuration`]; the first invalid rule wins.
pub struct ConfigurationBuilder<I> {
    settings: GateSettings<I>,
    error: Option<InvalidRuleError>,
}

impl<I: 'static> ConfigurationBuilder<I> {
    pub fn new() -> Self {
        Self {
            settings: GateSettings::default(),
            error: None,
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.settings.enabled = enabled;
        self
    }

    pub fn excluded_paths<P>(mut self, paths: impl IntoIterator<Item = P>) -> Self
    where
        P: Into<String>,
    {
        self.settings.excluded_paths.clear();
        for path in paths {
            self.settings.push_excluded(path.into());
        }
        self
    }

    pub fn exclude_path(mut self, path: impl Into<String>) -> Self {
        self.settings.push_excluded(path.into());
        self
    }

    pub fn identity_provider<F>(mut self, provider: F) -> Self
    where
        F: Fn(&RequestView<'_>) -> Result<Option<I>, ProviderError> + Send + Sync + 'static,
    {
        self.settings.provider = Arc::new(provider);
        self
    }

    pub fn maintenance_page(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings.maintenance_page = Some(path.into());
        self
    }

    pub fn rule<F>(mut self, role: impl Into<Role>, predicate: F) -> Self
    where
        F: Fn(&I, &RequestView<'_>) -> bool + Send + Sync + 'static,
    {
        match Rule::new(role, predicate) {
            Ok(rule) => self.settings.rules.push(rule),
            Err(err) => {
                self.error.get_or_insert(err);
            }
        }
        self
    }

    pub fn build(self) -> Result<Configuration<I>, InvalidRuleError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(Configuration::from_settings(self.settings)),
        }
    }
}

impl<I: 'static> Default for ConfigurationBuilder<I> {
    fn default() -> Self {
        Self::new()
    }
}
