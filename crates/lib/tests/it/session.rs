use std::{
    net::{IpAddr, Ipv6Addr},
    sync::Arc,
    time::Duration,
};

use watcher::{
    ManualClock,
    auth::{AuthContext, AuthResolver, IpFamily, client_ip},
    kv::{InMemoryKv, KvStore},
    session::{SESSION_TTL, SessionStore},
};

fn setup() -> (SessionStore, InMemoryKv, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::default());
    let kv = InMemoryKv::with_clock(clock.clone());
    (SessionStore::new(Arc::new(kv.clone())), kv, clock)
}

fn context() -> AuthContext {
    let addr = IpAddr::V6(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 0x42));
    AuthContext {
        user_id: "u-9".into(),
        name: "Agus Salim".into(),
        role: "viewer".into(),
        nip: "199001012015021003".into(),
        department_id: "21".into(),
        title: "Penelaah Keberatan".into(),
        ip: client_ip(&addr),
        ip_family: IpFamily::of(&addr),
    }
}

#[tokio::test]
async fn test_round_trip_preserves_every_field() {
    let (sessions, _, _) = setup();
    let ctx = context();
    let token = sessions.create(&ctx, SESSION_TTL).await.unwrap();
    let resolved = sessions.resolve(token.as_str()).await.unwrap();
    assert_eq!(resolved, ctx);
    assert_eq!(resolved.ip_family, IpFamily::Ipv6);
}

#[tokio::test]
async fn test_record_is_json_under_token() {
    let (sessions, kv, _) = setup();
    let token = sessions.create(&context(), SESSION_TTL).await.unwrap();
    let raw = kv.get(token.as_str()).await.unwrap().unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    for key in [
        "user_id",
        "name",
        "role",
        "nip",
        "department_id",
        "jabatan",
        "ip",
        "ipvx",
    ] {
        assert!(value.get(key).is_some(), "missing {key}");
    }
}

#[tokio::test]
async fn test_expired_is_indistinguishable_from_unknown() {
    let (sessions, _, clock) = setup();
    let token = sessions.create(&context(), SESSION_TTL).await.unwrap();

    clock.advance(SESSION_TTL - Duration::from_millis(1));
    sessions.resolve(token.as_str()).await.unwrap();

    clock.advance(Duration::from_millis(1));
    let expired = sessions.resolve(token.as_str()).await.unwrap_err();
    let unknown = sessions.resolve("0123456789abcdef").await.unwrap_err();
    assert!(expired.is_not_found());
    assert!(unknown.is_not_found());
}

#[tokio::test]
async fn test_resolve_does_not_extend_ttl() {
    let (sessions, _, clock) = setup();
    let resolver = AuthResolver::new(sessions.clone());
    let token = sessions.create(&context(), SESSION_TTL).await.unwrap();

    // Touch the session every hour for 23 hours.
    for _ in 0..23 {
        clock.advance(Duration::from_secs(3600));
        resolver.resolve_token(Some(token.as_str())).await.unwrap();
    }
    clock.advance(Duration::from_secs(3600));
    assert!(
        resolver
            .resolve_token(Some(token.as_str()))
            .await
            .unwrap_err()
            .is_invalid_session()
    );
}

#[tokio::test]
async fn test_destroyed_session_no_longer_resolves() {
    let (sessions, kv, _) = setup();
    let token = sessions.create(&context(), SESSION_TTL).await.unwrap();
    assert_eq!(kv.len().await, 1);

    sessions.destroy(token.as_str()).await.unwrap();
    assert!(kv.is_empty().await);
    assert!(
        sessions
            .resolve(token.as_str())
            .await
            .unwrap_err()
            .is_not_found()
    );
}

#[tokio::test]
async fn test_concurrent_creates_get_distinct_tokens() {
    let (sessions, kv, _) = setup();
    let mut handles = Vec::new();
    for _ in 0..32 {
        let sessions = sessions.clone();
        handles.push(tokio::spawn(async move {
            sessions.create(&context(), SESSION_TTL).await.unwrap()
        }));
    }
    let mut tokens = std::collections::HashSet::new();
    for handle in handles {
        tokens.insert(handle.await.unwrap());
    }
    assert_eq!(tokens.len(), 32);
    assert_eq!(kv.len().await, 32);
}
