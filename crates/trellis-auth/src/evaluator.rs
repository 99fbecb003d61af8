//! The authorization evaluator.
//!
//! ```text
//! authorize(ctx, static, dynamic)
//!     │
//!     ├── static:  every permission ∈ ctx.user.permissions   (empty ⇒ pass)
//!     │      └── fail → false (dynamic conditions are not run)
//!     │
//!     └── dynamic: conditions in order, stop at first false  (empty ⇒ pass)
//!            ├── Ok(false) → false
//!            └── Err(_)    → EvaluatorFault
//! ```
//!
//! The evaluator is pure: it keeps no state between calls and never
//! caches a decision. Callers build a fresh [`SecurityContext`] per request.

use crate::{AuthError, AuthorizationRequirement, DynamicCondition, EvaluatorFault, SecurityContext};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Decides whether `ctx` satisfies a static permission list and an ordered
/// list of dynamic conditions.
///
/// # Errors
///
/// Returns [`EvaluatorFault`] when a condition fails to evaluate.
///
/// # Example
///
/// ```
/// use trellis_auth::{authorize, DynamicCondition, SecurityContext};
///
/// let ctx = SecurityContext::anonymous().with_permission("read");
///
/// assert!(authorize(&ctx, ["read"], &[]).expect("no fault"));
/// assert!(!authorize(&ctx, ["read", "write"], &[]).expect("no fault"));
///
/// let deny = DynamicCondition::from_fn("deny", |_| false);
/// assert!(!authorize(&ctx, ["read"], &[deny]).expect("no fault"));
/// ```
pub fn authorize<I>(
    ctx: &SecurityContext,
    static_permissions: I,
    dynamic_conditions: &[DynamicCondition],
) -> Result<bool, EvaluatorFault>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    Ok(denial(ctx, static_permissions, dynamic_conditions)?.is_none())
}

/// Like [`authorize`], but reports why access was denied.
pub(crate) fn denial<I>(
    ctx: &SecurityContext,
    static_permissions: I,
    dynamic_conditions: &[DynamicCondition],
) -> Result<Option<DenialReason>, EvaluatorFault>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let missing: Vec<String> = static_permissions
        .into_iter()
        .filter_map(|permission| {
            let permission = permission.as_ref();
            (!ctx.user.has_permission(permission)).then(|| permission.to_string())
        })
        .collect();
    if !missing.is_empty() {
        return Ok(Some(DenialReason::MissingPermissions(missing)));
    }

    for condition in dynamic_conditions {
        let passed = condition
            .evaluate(ctx)
            .map_err(|source| EvaluatorFault::new(condition.name(), source))?;
        if !passed {
            return Ok(Some(DenialReason::ConditionFailed {
                condition: condition.name().to_string(),
            }));
        }
    }

    Ok(None)
}

/// Runs the component-level requirement, then the handler-level one.
///
/// The handler layer is only evaluated when the component layer passes.
///
/// # Errors
///
/// Returns [`EvaluatorFault`] when a condition at either layer fails.
pub fn authorize_layers(
    ctx: &SecurityContext,
    component: &AuthorizationRequirement,
    handler: &AuthorizationRequirement,
) -> Result<Decision, EvaluatorFault> {
    for (layer, requirement) in [(Layer::Component, component), (Layer::Handler, handler)] {
        let denial = requirement.denial(ctx).map_err(|fault| {
            tracing::trace!(%layer, condition = %fault.condition, "layer faulted");
            fault
        })?;
        if let Some(reason) = denial {
            tracing::trace!(%layer, %reason, "layer denied");
            return Ok(Decision::Denied { layer, reason });
        }
        tracing::trace!(%layer, "layer passed");
    }
    Ok(Decision::Allowed)
}

/// Which authorization layer produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Component,
    Handler,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Component => f.write_str("component"),
            Self::Handler => f.write_str("handler"),
        }
    }
}

/// Why a requirement was not met.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    /// Static permissions the caller lacks.
    MissingPermissions(Vec<String>),
    /// The first dynamic condition that returned `false`.
    ConditionFailed { condition: String },
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPermissions(missing) => {
                write!(f, "missing permissions [{}]", missing.join(", "))
            }
            Self::ConditionFailed { condition } => {
                write!(f, "condition '{condition}' not met")
            }
        }
    }
}

/// Result of a two-layer check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied { layer: Layer, reason: DenialReason },
}

impl Decision {
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    /// Converts a denial into [`AuthError::Unauthorized`].
    ///
    /// # Errors
    ///
    /// Returns the denial.
    pub fn into_result(self) -> Result<(), AuthError> {
        match self {
            Self::Allowed => Ok(()),
            Self::Denied { layer, reason } => Err(AuthError::Unauthorized { layer, reason }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConditionError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn location_is_us() -> DynamicCondition {
        DynamicCondition::from_fn("location_is_us", |ctx| {
            ctx.user.attribute("location").and_then(|v| v.as_str()) == Some("US")
        })
    }

    fn button_user(location: &str) -> SecurityContext {
        SecurityContext::anonymous()
            .with_permission("view_button1")
            .with_permission("view_button2")
            .with_attribute("location", location)
    }

    #[test]
    fn empty_requirement_is_vacuously_true() {
        let none: [&str; 0] = [];
        assert_eq!(authorize(&SecurityContext::anonymous(), none, &[]), Ok(true));
    }

    #[test]
    fn button_scenario_us_allowed() {
        let ctx = button_user("US");
        assert_eq!(authorize(&ctx, ["view_button1"], &[location_is_us()]), Ok(true));
    }

    #[test]
    fn button_scenario_eu_denied_with_static_satisfied() {
        let ctx = button_user("EU");
        assert_eq!(authorize(&ctx, ["view_button1"], &[]), Ok(true));
        assert_eq!(authorize(&ctx, ["view_button1"], &[location_is_us()]), Ok(false));
    }

    #[test]
    fn short_circuits_on_first_false() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let spy_calls = Arc::new(AtomicUsize::new(0));

        let record = |name: &'static str, result: bool| {
            let calls = Arc::clone(&calls);
            DynamicCondition::from_fn(name, move |_| {
                calls.lock().expect("lock").push(name);
                result
            })
        };
        let spy = {
            let spy_calls = Arc::clone(&spy_calls);
            DynamicCondition::from_fn("spy", move |_| {
                spy_calls.fetch_add(1, Ordering::SeqCst);
                true
            })
        };

        let conditions = vec![record("first", true), record("second", false), spy];
        let none: [&str; 0] = [];
        let result = authorize(&SecurityContext::anonymous(), none, &conditions);

        assert_eq!(result, Ok(false));
        assert_eq!(*calls.lock().expect("lock"), vec!["first", "second"]);
        assert_eq!(spy_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn static_failure_skips_dynamic_conditions() {
        let invoked = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&invoked);
        let cond = DynamicCondition::from_fn("count", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });

        let result = authorize(&SecurityContext::anonymous(), ["admin"], &[cond]);
        assert_eq!(result, Ok(false));
        assert_eq!(invoked.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn faulting_condition_is_a_fault_not_a_denial() {
        let broken = DynamicCondition::new("geo_lookup", |_| {
            Err(ConditionError::new("geo db offline"))
        });
        let none: [&str; 0] = [];
        let err = authorize(&SecurityContext::anonymous(), none, &[broken])
            .expect_err("should fault");
        assert_eq!(err.condition, "geo_lookup");
        assert_eq!(err.source.message(), "geo db offline");
    }

    #[test]
    fn fault_after_false_is_never_reached() {
        let deny = DynamicCondition::from_fn("deny", |_| false);
        let broken = DynamicCondition::new("broken", |_| Err(ConditionError::new("boom")));
        let none: [&str; 0] = [];
        assert_eq!(
            authorize(&SecurityContext::anonymous(), none, &[deny, broken]),
            Ok(false)
        );
    }

    #[test]
    fn layers_report_component_denial_first() {
        let ctx = SecurityContext::anonymous().with_permission("handler_perm");
        let component = AuthorizationRequirement::new().with_permission("component_perm");
        let handler = AuthorizationRequirement::new().with_permission("handler_perm");

        let decision = authorize_layers(&ctx, &component, &handler).expect("no fault");
        assert_eq!(
            decision,
            Decision::Denied {
                layer: Layer::Component,
                reason: DenialReason::MissingPermissions(vec!["component_perm".into()]),
            }
        );
    }

    #[test]
    fn layers_require_both() {
        let ctx = SecurityContext::anonymous().with_permission("component_perm");
        let component = AuthorizationRequirement::new().with_permission("component_perm");
        let handler = AuthorizationRequirement::new()
            .with_condition(DynamicCondition::from_fn("closed", |_| false));

        let decision = authorize_layers(&ctx, &component, &handler).expect("no fault");
        assert_eq!(
            decision,
            Decision::Denied {
                layer: Layer::Handler,
                reason: DenialReason::ConditionFailed {
                    condition: "closed".into()
                },
            }
        );

        let open = AuthorizationRequirement::new();
        let decision = authorize_layers(&ctx, &component, &open).expect("no fault");
        assert!(decision.is_allowed());
        assert!(decision.into_result().is_ok());
    }

    #[test]
    fn decision_into_result() {
        let denied = Decision::Denied {
            layer: Layer::Handler,
            reason: DenialReason::MissingPermissions(vec!["a".into(), "b".into()]),
        };
        let err = denied.into_result().expect_err("denial should convert to error");
        assert_eq!(
            err.to_string(),
            "handler authorization denied: missing permissions [a, b]"
        );
    }

    // ─── Property-Based Tests ─────────────────────────────────────

    mod proptest_authorize {
        use super::*;
        use proptest::prelude::*;
        use std::collections::BTreeSet;

        fn permission_set() -> impl Strategy<Value = BTreeSet<String>> {
            prop::collection::btree_set("[a-e]{1,2}", 0..8)
        }

        proptest! {
            /// Static-only authorization holds exactly when required ⊆ held.
            #[test]
            fn static_only_is_subset(required in permission_set(), held in permission_set()) {
                let ctx = held
                    .iter()
                    .fold(SecurityContext::anonymous(), |ctx, p| ctx.with_permission(p.clone()));
                let result = authorize(&ctx, &required, &[]);
                prop_assert_eq!(result, Ok(required.is_subset(&held)));
            }

            /// Dynamic-only authorization holds exactly when every predicate is true,
            /// and evaluation stops at the first false.
            #[test]
            fn dynamic_only_is_conjunction(outcomes in prop::collection::vec(any::<bool>(), 0..8)) {
                let invoked = Arc::new(AtomicUsize::new(0));
                let conditions: Vec<DynamicCondition> = outcomes
                    .iter()
                    .enumerate()
                    .map(|(i, outcome)| {
                        let invoked = Arc::clone(&invoked);
                        let outcome = *outcome;
                        DynamicCondition::from_fn(format!("c{i}"), move |_| {
                            invoked.fetch_add(1, Ordering::SeqCst);
                            outcome
                        })
                    })
                    .collect();

                let none: [&str; 0] = [];
                let result = authorize(&SecurityContext::anonymous(), none, &conditions);
                prop_assert_eq!(result, Ok(outcomes.iter().all(|o| *o)));

                let expected_calls = outcomes
                    .iter()
                    .position(|o| !*o)
                    .map_or(outcomes.len(), |first_false| first_false + 1);
                prop_assert_eq!(invoked.load(Ordering::SeqCst), expected_calls);
            }
        }
    }
}
