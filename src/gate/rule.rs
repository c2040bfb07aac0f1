use std::fmt;
use std::sync::Arc;

use crate::errors::InvalidRuleError;

use super::request::RequestView;

/// Predicate deciding whether an identity may pass for a given request.
pub type Predicate<I> = Arc<dyn Fn(&I, &RequestView<'_>) -> bool + Send + Sync>;

/// Opaque role tag attached to a rule (e.g. `admin`, `guest`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Role(String);

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A (role, predicate) pair.
///
/// The role is descriptive only: `matches` never compares it against the
/// identity, the predicate alone decides.
pub struct Rule<I> {
    role: Role,
    predicate: Predicate<I>,
}

impl<I> Rule<I> {
    pub fn new<F>(role: impl Into<Role>, predicate: F) -> Result<Self, InvalidRuleError>
    where
        F: Fn(&I, &RequestView<'_>) -> bool + Send + Sync + 'static,
    {
        Self::from_parts(Some(role.into()), Some(Arc::new(predicate)))
    }

    /// Builds a rule from parts that may be missing, e.g. when the predicate
    /// is looked up by name.
    pub fn from_parts(
        role: Option<Role>,
        predicate: Option<Predicate<I>>,
    ) -> Result<Self, InvalidRuleError> {
        let role = role
            .filter(|role| !role.is_blank())
            .ok_or(InvalidRuleError::MissingRole)?;
        let predicate = predicate.ok_or(InvalidRuleError::MissingPredicate)?;

        Ok(Self { role, predicate })
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn matches(&self, identity: &I, request: &RequestView<'_>) -> bool {
        (self.predicate)(identity, request)
    }
}

impl<I> Clone for Rule<I> {
    fn clone(&self) -> Self {
        Self {
            role: self.role.clone(),
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<I> fmt::Debug for Rule<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule").field("role", &self.role).finish_non_exhaustive()
    }
}
