//! Dynamic conditions.
//!
//! A [`DynamicCondition`] is a named runtime predicate over a
//! [`SecurityContext`]. Predicates return `Result<bool, ConditionError>`:
//! `Ok(false)` denies, `Err(_)` is an environment failure that the
//! evaluator surfaces as an [`EvaluatorFault`](crate::EvaluatorFault).
//!
//! A component may declare a [`ConditionModule`]: conditions keyed by view
//! name, or by the whole-component key [`ConditionScope::COMPONENT_KEY`].

use crate::SecurityContext;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

type Predicate = dyn Fn(&SecurityContext) -> Result<bool, ConditionError> + Send + Sync;

/// Failure raised by a predicate instead of a decision.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ConditionError {
    message: String,
}

impl ConditionError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A named predicate over the caller's security context.
///
/// Cloning is cheap (the predicate is shared).
///
/// # Example
///
/// ```
/// use trellis_auth::{ConditionError, DynamicCondition, SecurityContext};
///
/// let adult = DynamicCondition::new("adult", |ctx| {
///     let age = ctx
///         .user
///         .attribute("age")
///         .and_then(|v| v.as_u64())
///         .ok_or_else(|| ConditionError::new("age attribute missing"))?;
///     Ok(age >= 18)
/// });
///
/// let ctx = SecurityContext::anonymous().with_attribute("age", 30);
/// assert_eq!(adult.evaluate(&ctx), Ok(true));
/// assert!(adult.evaluate(&SecurityContext::anonymous()).is_err());
/// ```
#[derive(Clone)]
pub struct DynamicCondition {
    name: Arc<str>,
    predicate: Arc<Predicate>,
}

impl DynamicCondition {
    /// Wraps a fallible predicate.
    pub fn new<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&SecurityContext) -> Result<bool, ConditionError> + Send + Sync + 'static,
    {
        let name: String = name.into();
        Self {
            name: Arc::from(name),
            predicate: Arc::new(predicate),
        }
    }

    /// Wraps a predicate that cannot fail.
    pub fn from_fn<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&SecurityContext) -> bool + Send + Sync + 'static,
    {
        Self::new(name, move |ctx| Ok(predicate(ctx)))
    }

    /// Passes when `user.<attribute>` equals `expected`.
    ///
    /// A missing attribute is a plain `false`, not a fault.
    pub fn attribute_equals(attribute: impl Into<String>, expected: impl Into<Value>) -> Self {
        let attribute = attribute.into();
        let expected = expected.into();
        let name = format!("{attribute} == {expected}");
        Self::from_fn(name, move |ctx| {
            ctx.user.attribute(&attribute) == Some(&expected)
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invokes the predicate.
    ///
    /// # Errors
    ///
    /// Returns the predicate's own [`ConditionError`].
    pub fn evaluate(&self, ctx: &SecurityContext) -> Result<bool, ConditionError> {
        (self.predicate)(ctx)
    }
}

impl fmt::Debug for DynamicCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicCondition")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Key of an entry in a [`ConditionModule`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConditionScope {
    /// Applies to the whole component, every view included.
    Component,
    /// Applies to one named view.
    View(String),
}

impl ConditionScope {
    /// Literal key that stands for the whole component in declarations.
    pub const COMPONENT_KEY: &'static str = "*";

    /// Parses a declared key.
    #[must_use]
    pub fn parse(key: &str) -> Self {
        if key == Self::COMPONENT_KEY {
            Self::Component
        } else {
            Self::View(key.to_string())
        }
    }
}

impl fmt::Display for ConditionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Component => f.write_str(Self::COMPONENT_KEY),
            Self::View(view) => f.write_str(view),
        }
    }
}

/// A component's declared dynamic conditions, keyed by scope.
#[derive(Debug, Clone, Default)]
pub struct ConditionModule {
    entries: HashMap<ConditionScope, DynamicCondition>,
}

impl ConditionModule {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, scope: ConditionScope, condition: DynamicCondition) -> Self {
        self.insert(scope, condition);
        self
    }

    /// Sets the condition for `scope`, returning the one it replaced.
    pub fn insert(
        &mut self,
        scope: ConditionScope,
        condition: DynamicCondition,
    ) -> Option<DynamicCondition> {
        self.entries.insert(scope, condition)
    }

    #[must_use]
    pub fn get(&self, scope: &ConditionScope) -> Option<&DynamicCondition> {
        self.entries.get(scope)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ordered conditions that gate `view` (or the whole component when
    /// `view` is `None`): the component-wide condition first, then the
    /// view's own.
    #[must_use]
    pub fn conditions_for(&self, view: Option<&str>) -> Vec<DynamicCondition> {
        let component = self.entries.get(&ConditionScope::Component).cloned();
        let own = view.and_then(|v| {
            self.entries
                .get(&ConditionScope::View(v.to_string()))
                .cloned()
        });
        component.into_iter().chain(own).collect()
    }
}
