use std::collections::BTreeMap;
use std::time::Duration;

use scoped_secrets_core::{
    ContextConfig, ContextError, DecryptResult, EnvBag, KeyPair, SecretContext, SnapshotStrategy,
    current, get_value, is_active, require_value, scope_current, spawn_scoped,
};

fn echo_context(strategy: SnapshotStrategy) -> SecretContext {
    SecretContext::new(ContextConfig::default().strategy(strategy)).with_decryptor(
        |src: &str, _: &KeyPair| -> DecryptResult<BTreeMap<String, String>> {
            let (name, value) = src.split_once('=').unwrap_or_default();
            let value = value.trim_matches('"').trim_start_matches("encrypted:");
            Ok(BTreeMap::from([(name.to_string(), format!("decrypted-{value}"))]))
        },
    )
}

fn request_bag(id: usize) -> EnvBag {
    EnvBag::new()
        .with("DOTENV_PRIVATE_KEY", "k1")
        .with("REQUEST_ID", id.to_string())
        .with("TOKEN", format!("encrypted:{id}"))
}

async fn nested_read() -> Result<String, ContextError> {
    tokio::task::yield_now().await;
    require_value("TOKEN")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_never_share_values() -> anyhow::Result<()> {
    let mut handles = Vec::new();
    for id in 0..32 {
        let strategy = if id % 2 == 0 {
            SnapshotStrategy::Eager
        } else {
            SnapshotStrategy::Lazy
        };
        handles.push(tokio::spawn(async move {
            echo_context(strategy)
                .initialize(request_bag(id), || async move {
                    for round in 0..5 {
                        tokio::time::sleep(Duration::from_millis((id as u64 * 7 + round) % 5)).await;
                        assert_eq!(require_value("REQUEST_ID")?, id.to_string());
                        assert_eq!(nested_read().await?, format!("decrypted-{id}"));
                    }
                    Ok::<_, ContextError>(id)
                })
                .await
        }));
    }

    for (expected, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.await??, expected);
    }
    Ok(())
}

#[tokio::test]
async fn binding_released_after_handler_returns() {
    let context = echo_context(SnapshotStrategy::Eager);
    let inside = context
        .initialize(request_bag(1), || async { is_active() })
        .await;
    assert!(inside);
    assert!(!is_active());
    assert!(matches!(
        get_value("REQUEST_ID"),
        Err(ContextError::NoActiveContext { .. })
    ));
}

#[tokio::test]
async fn handler_errors_propagate_and_release_binding() {
    let context = echo_context(SnapshotStrategy::Eager);
    let result = context
        .initialize(request_bag(2), || async { require_value("NOT_THERE") })
        .await;
    assert_eq!(
        result,
        Err(ContextError::MissingRequiredValue {
            name: "NOT_THERE".into()
        })
    );
    assert!(current().is_err());
}

#[tokio::test]
async fn cancelled_request_drops_binding() {
    let context = echo_context(SnapshotStrategy::Lazy);
    let slow = context.initialize(request_bag(3), || async {
        tokio::time::sleep(Duration::from_secs(60)).await;
    });
    let timed_out = tokio::time::timeout(Duration::from_millis(10), slow).await;
    assert!(timed_out.is_err());
    assert!(!is_active());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn spawned_work_carries_the_snapshot() -> anyhow::Result<()> {
    let context = echo_context(SnapshotStrategy::Eager);
    let (spawned, plain_spawn) = context
        .initialize(request_bag(4), || async {
            let spawned = spawn_scoped(async { require_value("TOKEN") })?.await?;
            let plain_spawn = tokio::spawn(async { is_active() }).await?;
            anyhow::Ok((spawned, plain_spawn))
        })
        .await?;

    assert_eq!(spawned?, "decrypted-4");
    assert!(!plain_spawn, "tokio::spawn must not inherit the binding");
    Ok(())
}

#[tokio::test]
async fn scoped_future_outlives_handler_scope() -> anyhow::Result<()> {
    let context = echo_context(SnapshotStrategy::Lazy);
    let deferred = context
        .initialize(request_bag(5), || async { scope_current(nested_read()) })
        .await?;
    assert!(!is_active());
    assert_eq!(deferred.await?, "decrypted-5");
    Ok(())
}

#[tokio::test]
async fn nested_initialize_shadows_outer_binding() {
    let context = echo_context(SnapshotStrategy::Eager);
    let (inner, outer) = context
        .initialize(request_bag(6), || async {
            let inner = echo_context(SnapshotStrategy::Eager)
                .initialize(request_bag(7), || async { require_value("REQUEST_ID") })
                .await;
            (inner, require_value("REQUEST_ID"))
        })
        .await;
    assert_eq!(inner, Ok("7".to_string()));
    assert_eq!(outer, Ok("6".to_string()));
}
