//! Authorization requirements.

use crate::evaluator::{self, DenialReason};
use crate::{ConditionModule, DynamicCondition, EvaluatorFault, SecurityContext};
use std::collections::BTreeSet;

/// What a caller must satisfy to reach a component or a handler.
///
/// Dynamic conditions are an ordered `Vec`: evaluation stops at the first
/// condition that returns `false`, so later conditions may assume earlier
/// ones passed.
///
/// # Example
///
/// ```
/// use trellis_auth::{AuthorizationRequirement, DynamicCondition, SecurityContext};
///
/// let requirement = AuthorizationRequirement::new()
///     .with_permission("view_button1")
///     .with_condition(DynamicCondition::attribute_equals("location", "US"));
///
/// let us = SecurityContext::anonymous()
///     .with_permission("view_button1")
///     .with_attribute("location", "US");
/// assert_eq!(requirement.evaluate(&us), Ok(true));
///
/// let eu = us.clone().with_attribute("location", "EU");
/// assert_eq!(requirement.evaluate(&eu), Ok(false));
/// ```
#[derive(Debug, Clone, Default)]
pub struct AuthorizationRequirement {
    pub static_permissions: BTreeSet<String>,
    pub dynamic_conditions: Vec<DynamicCondition>,
}

impl AuthorizationRequirement {
    /// A requirement every caller satisfies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.static_permissions.insert(permission.into());
        self
    }

    #[must_use]
    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.static_permissions
            .extend(permissions.into_iter().map(Into::into));
        self
    }

    /// Appends a condition after the existing ones.
    #[must_use]
    pub fn with_condition(mut self, condition: DynamicCondition) -> Self {
        self.dynamic_conditions.push(condition);
        self
    }

    /// `true` when nothing is required.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.static_permissions.is_empty() && self.dynamic_conditions.is_empty()
    }

    /// A requirement satisfied only when both `self` and `other` are.
    ///
    /// Permissions are unioned; `other`'s conditions run after `self`'s.
    #[must_use]
    pub fn and(mut self, other: &Self) -> Self {
        self.static_permissions
            .extend(other.static_permissions.iter().cloned());
        self.dynamic_conditions
            .extend(other.dynamic_conditions.iter().cloned());
        self
    }

    /// Evaluates this requirement against `ctx`.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluatorFault`] when a condition fails to evaluate.
    pub fn evaluate(&self, ctx: &SecurityContext) -> Result<bool, EvaluatorFault> {
        evaluator::authorize(ctx, &self.static_permissions, &self.dynamic_conditions)
    }

    pub(crate) fn denial(
        &self,
        ctx: &SecurityContext,
    ) -> Result<Option<DenialReason>, EvaluatorFault> {
        evaluator::denial(ctx, &self.static_permissions, &self.dynamic_conditions)
    }
}

/// A component's declared access rules, as loaded by configuration.
///
/// Static permissions apply to the whole component; the condition module
/// adds a component-wide predicate and per-view predicates.
#[derive(Debug, Clone, Default)]
pub struct ComponentAccess {
    pub permissions: BTreeSet<String>,
    pub conditions: ConditionModule,
}

impl ComponentAccess {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.insert(permission.into());
        self
    }

    #[must_use]
    pub fn with_conditions(mut self, conditions: ConditionModule) -> Self {
        self.conditions = conditions;
        self
    }

    /// Requirement for accessing the component as a whole.
    #[must_use]
    pub fn requirement(&self) -> AuthorizationRequirement {
        self.build(None)
    }

    /// Requirement for one view of the component.
    #[must_use]
    pub fn view_requirement(&self, view: &str) -> AuthorizationRequirement {
        self.build(Some(view))
    }

    fn build(&self, view: Option<&str>) -> AuthorizationRequirement {
        AuthorizationRequirement {
            static_permissions: self.permissions.clone(),
            dynamic_conditions: self.conditions.conditions_for(view),
        }
    }
}
