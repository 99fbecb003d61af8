//! Intent round trips: client → channel → server → router → handler → ack.

use parking_lot::Mutex;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use trellis_auth::{AuthorizationRequirement, ConditionError, DynamicCondition, UserContext};
use trellis_runtime::channel::{ChannelFactory, ChannelRegistry, LocalChannelFactory};
use trellis_runtime::config::{AccessConfig, ConditionConfig, TrellisConfig};
use trellis_runtime::intent::{handler_fn, IntentError, SessionHandle};
use trellis_runtime::RuntimeContext;
use trellis_types::Intent;

fn remote_code(err: &IntentError) -> &str {
    match err {
        IntentError::Remote(payload) => &payload.code,
        other => panic!("expected remote error, got {other:?}"),
    }
}

fn counting_handler(
    runtime: &RuntimeContext,
    category: &str,
    action: &str,
    requirement: AuthorizationRequirement,
) -> Arc<AtomicUsize> {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    runtime
        .router()
        .register(
            category,
            action,
            handler_fn(move |_, _, ack| {
                seen.fetch_add(1, Ordering::SeqCst);
                ack.ok();
            }),
            requirement,
        )
        .expect("register");
    calls
}

#[tokio::test]
async fn ack_resolves_the_sender_and_session_changes_stick() {
    let runtime = RuntimeContext::new(TrellisConfig::default());
    runtime
        .router()
        .register(
            "cart",
            "add",
            handler_fn(|context, session, ack| {
                let qty = context.get("qty").and_then(|v| v.as_u64()).unwrap_or(1);
                let total = session.get("items").and_then(|v| v.as_u64()).unwrap_or(0);
                session.insert("items", total + qty);
                ack.ok();
            }),
            AuthorizationRequirement::new(),
        )
        .expect("register");

    let session = SessionHandle::new();
    runtime.bind("/core", session.clone()).expect("bind");
    let client = runtime.client();

    client
        .send(Intent::new("cart", "add").with_context("qty", 2))
        .await
        .expect("first add");
    client
        .send(Intent::new("cart", "add"))
        .await
        .expect("second add");

    assert_eq!(session.get("items"), Some(json!(3)));
}

#[tokio::test]
async fn denied_intent_never_reaches_the_handler() {
    let mut config = TrellisConfig::default();
    config.access.insert(
        "buttons".into(),
        AccessConfig {
            permissions: vec!["view_button1".into()],
            conditions: vec![ConditionConfig {
                view: None,
                attribute: "location".into(),
                equals: json!("US"),
            }],
        },
    );
    let runtime = RuntimeContext::new(config);
    let calls = counting_handler(&runtime, "buttons", "show", AuthorizationRequirement::new());

    let session = SessionHandle::new();
    runtime.bind("/core", session.clone()).expect("bind");
    let client = runtime.client();

    let err = client
        .send(Intent::new("buttons", "show"))
        .await
        .expect_err("anonymous is denied");
    assert_eq!(remote_code(&err), "INTENT_UNAUTHORIZED");
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    session.set_user(Some(
        UserContext::new()
            .with_permission("view_button1")
            .with_attribute("location", "US"),
    ));
    client
        .send(Intent::new("buttons", "show"))
        .await
        .expect("permitted user");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    session.set_user(Some(
        UserContext::new()
            .with_permission("view_button1")
            .with_attribute("location", "EU"),
    ));
    let err = client
        .send(Intent::new("buttons", "show"))
        .await
        .expect_err("condition fails");
    assert_eq!(remote_code(&err), "INTENT_UNAUTHORIZED");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn handler_layer_is_checked_after_component_layer() {
    let runtime = RuntimeContext::new(TrellisConfig::default());
    let calls = counting_handler(
        &runtime,
        "admin",
        "purge",
        AuthorizationRequirement::new().with_permission("admin"),
    );
    let session = SessionHandle::for_user(UserContext::new().with_permission("viewer"));
    runtime.bind("/core", session).expect("bind");

    let err = runtime
        .client()
        .send(Intent::new("admin", "purge"))
        .await
        .expect_err("denied");
    match err {
        IntentError::Remote(payload) => {
            assert_eq!(payload.code, "INTENT_UNAUTHORIZED");
            assert!(payload.message.contains("handler"), "{}", payload.message);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn faulting_condition_is_reported_distinctly() {
    let runtime = RuntimeContext::new(TrellisConfig::default());
    runtime.router().guard_component(
        "reports",
        AuthorizationRequirement::new().with_condition(DynamicCondition::new(
            "quota lookup",
            |_| Err(ConditionError::new("quota service unavailable")),
        )),
    );
    let calls = counting_handler(&runtime, "reports", "run", AuthorizationRequirement::new());
    runtime.bind("/core", SessionHandle::new()).expect("bind");

    let err = runtime
        .client()
        .send(Intent::new("reports", "run"))
        .await
        .expect_err("fault");
    assert_eq!(remote_code(&err), "INTENT_EVALUATOR_FAULT");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unknown_intent_is_not_found() {
    let runtime = RuntimeContext::new(TrellisConfig::default());
    runtime.bind("/core", SessionHandle::new()).expect("bind");

    let err = runtime
        .client()
        .send(Intent::new("cart", "teleport"))
        .await
        .expect_err("no handler");
    assert_eq!(remote_code(&err), "INTENT_HANDLER_NOT_FOUND");
}

#[tokio::test]
async fn only_the_first_ack_counts() {
    let runtime = RuntimeContext::new(TrellisConfig::default());
    let repeats = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&repeats);
    runtime
        .router()
        .register(
            "cart",
            "checkout",
            handler_fn(move |_, _, ack| {
                let first = ack.ok();
                let second = ack.err(IntentError::handler("too late"));
                sink.lock().push((first, second));
            }),
            AuthorizationRequirement::new(),
        )
        .expect("register");
    runtime.bind("/core", SessionHandle::new()).expect("bind");

    runtime
        .client()
        .send(Intent::new("cart", "checkout"))
        .await
        .expect("first ack wins");
    assert_eq!(*repeats.lock(), vec![(true, false)]);
}

#[tokio::test]
async fn handler_errors_and_dropped_acks_reach_the_sender() {
    let runtime = RuntimeContext::new(TrellisConfig::default());
    let router = runtime.router();
    router
        .register(
            "cart",
            "pay",
            handler_fn(|_, _, ack| {
                ack.err(IntentError::handler("card declined"));
            }),
            AuthorizationRequirement::new(),
        )
        .expect("register");
    router
        .register(
            "cart",
            "forget",
            handler_fn(|_, _, ack| drop(ack)),
            AuthorizationRequirement::new(),
        )
        .expect("register");
    runtime.bind("/core", SessionHandle::new()).expect("bind");
    let client = runtime.client();

    match client.send(Intent::new("cart", "pay")).await {
        Err(IntentError::Remote(payload)) => {
            assert_eq!(payload.code, "INTENT_HANDLER_FAILED");
            assert!(payload.message.contains("card declined"));
        }
        other => panic!("unexpected {other:?}"),
    }

    let err = client
        .send(Intent::new("cart", "forget"))
        .await
        .expect_err("dropped");
    assert_eq!(remote_code(&err), "INTENT_ACK_DROPPED");
}

#[tokio::test]
async fn fire_and_forget_still_runs_the_handler() {
    let runtime = RuntimeContext::new(TrellisConfig::default());
    let (tx, rx) = tokio::sync::oneshot::channel();
    let tx = Mutex::new(Some(tx));
    runtime
        .router()
        .register(
            "stats",
            "ping",
            handler_fn(move |_, _, ack| {
                ack.ok();
                if let Some(tx) = tx.lock().take() {
                    let _ = tx.send(());
                }
            }),
            AuthorizationRequirement::new(),
        )
        .expect("register");
    runtime.bind("/core", SessionHandle::new()).expect("bind");

    runtime
        .client()
        .send(Intent::new("stats", "ping").without_reply())
        .await
        .expect("sent");
    rx.await.expect("handler ran");
}

#[tokio::test]
async fn namespaces_route_categories_to_their_channels() {
    let mut config = TrellisConfig::default();
    config
        .transport
        .namespaces
        .insert("users".into(), "/admin".into());
    let runtime = RuntimeContext::new(config);
    let calls = counting_handler(&runtime, "users", "ban", AuthorizationRequirement::new());

    runtime.bind("/core", SessionHandle::new()).expect("bind");
    let err = runtime
        .client()
        .send(Intent::new("users", "ban"))
        .await
        .expect_err("nobody on /admin yet");
    assert!(matches!(err, IntentError::Transport(_)));

    runtime.bind("/admin", SessionHandle::new()).expect("bind");
    runtime
        .client()
        .send(Intent::new("users", "ban"))
        .await
        .expect("served on /admin");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_lookups_share_one_channel() {
    let factory = Arc::new(LocalChannelFactory::new());
    let registry = Arc::new(ChannelRegistry::new(
        Arc::clone(&factory) as Arc<dyn ChannelFactory>
    ));

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                let path = if i % 2 == 0 { "/core" } else { "core/" };
                let channel = registry.get_channel(path).expect("open");
                Arc::as_ptr(&channel).cast::<()>() as usize
            })
        })
        .collect();

    let mut addresses = Vec::new();
    for task in tasks {
        addresses.push(task.await.expect("join"));
    }
    addresses.dedup();

    assert_eq!(addresses.len(), 1);
    assert_eq!(factory.opened(), 1);
    assert_eq!(registry.paths(), vec!["/core".to_string()]);
}
