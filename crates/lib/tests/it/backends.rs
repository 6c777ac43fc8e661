//! Registry and session store against real MySQL and Redis servers.
//!
//! Every test returns early when its server variable is unset; see
//! `helpers::mysql_connection` and `helpers::redis_kv`.

use std::time::Duration;

use serde_json::Value;
use watcher::{config::Config, registry::ConnectionRegistry};

use crate::helpers::{TestApp, login, mysql_connection, unique_database};

const TIMEOUT: Duration = Duration::from_secs(10);

async fn schema_count(catalog: &ConnectionRegistry, database: &str) -> i64 {
    let handle = catalog.get("catalog").unwrap();
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM information_schema.SCHEMATA WHERE SCHEMA_NAME = ?",
    )
    .bind(database)
    .fetch_one(handle.pool())
    .await
    .unwrap()
}

async fn drop_database(catalog: &ConnectionRegistry, database: &str) {
    let handle = catalog.get("catalog").unwrap();
    sqlx::query(&format!("DROP DATABASE IF EXISTS `{database}`"))
        .execute(handle.pool())
        .await
        .unwrap();
}

/// Registry on the always-present `mysql` schema, for catalog queries.
async fn catalog() -> Option<ConnectionRegistry> {
    let config = mysql_connection("catalog", "mysql")?;
    Some(
        ConnectionRegistry::initialize([config], TIMEOUT, TIMEOUT)
            .await
            .expect("Failed to connect to TEST_MYSQL_URL"),
    )
}

#[tokio::test]
async fn test_mysql_bootstrap_creates_missing_database() {
    let Some(catalog) = catalog().await else {
        eprintln!("TEST_MYSQL_URL not set, skipping");
        return;
    };
    let database = unique_database();
    assert_eq!(schema_count(&catalog, &database).await, 0);

    let config = mysql_connection("mfwp", &database).unwrap();
    let registry = ConnectionRegistry::initialize([config.clone()], TIMEOUT, TIMEOUT)
        .await
        .unwrap();
    assert_eq!(schema_count(&catalog, &database).await, 1);

    // The pool is scoped to the new database
    let handle = registry.get("mfwp").unwrap();
    let current: String = sqlx::query_scalar("SELECT CAST(DATABASE() AS CHAR)")
        .fetch_one(handle.pool())
        .await
        .unwrap();
    assert_eq!(current, database);
    registry.close().await;

    // Bootstrapping an existing database is a no-op
    let again = ConnectionRegistry::initialize([config], TIMEOUT, TIMEOUT)
        .await
        .unwrap();
    again.get("mfwp").unwrap().ping().await.unwrap();
    again.close().await;

    drop_database(&catalog, &database).await;
    catalog.close().await;
}

#[tokio::test]
async fn test_mysql_unreachable_server_fails_fast() {
    let Some(mut config) = mysql_connection("mfwp", &unique_database()) else {
        eprintln!("TEST_MYSQL_URL not set, skipping");
        return;
    };
    // Reserved TEST-NET address; nothing answers
    config.host = "192.0.2.1".to_string();
    let err = ConnectionRegistry::initialize([config], Duration::from_millis(500), TIMEOUT)
        .await
        .unwrap_err();
    assert!(err.is_unreachable());
}

#[tokio::test]
async fn test_mysql_masterfile_with_temporal_and_decimal_columns() {
    let Some(catalog) = catalog().await else {
        eprintln!("TEST_MYSQL_URL not set, skipping");
        return;
    };
    let users_db = unique_database();
    let mfwp_db = unique_database();
    let registry = ConnectionRegistry::initialize(
        [
            mysql_connection("users", &users_db).unwrap(),
            mysql_connection("mfwp", &mfwp_db).unwrap(),
        ],
        TIMEOUT,
        TIMEOUT,
    )
    .await
    .unwrap();

    let mfwp = registry.get("mfwp").unwrap();
    for statement in [
        "CREATE TABLE masterfile (
            NPWP_15 VARCHAR(15) NOT NULL,
            NAMA_WP VARCHAR(255),
            KODE_KPP INT,
            TGL_DAFTAR DATE,
            SALDO DECIMAL(15,2),
            UPDATED_AT DATETIME,
            JUMLAH BIGINT UNSIGNED
        )",
        "INSERT INTO masterfile VALUES ('012345678901234', 'PT Maju Jaya', 302, \
         '2015-03-02', 1250000.50, '2024-01-05 08:30:00', 18446744073709551615)",
    ] {
        sqlx::query(statement).execute(mfwp.pool()).await.unwrap();
    }

    let app = TestApp::with_registry(Config::default(), registry.clone()).await;
    let base = app.serve().await;
    let client = reqwest::Client::new();
    let token = login(&client, &base).await;

    let response = client
        .get(format!("{base}/mfwp/get/012345678901234"))
        .header("Cookie", format!("session_token={token}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["NAMA_WP"], "PT Maju Jaya");
    assert_eq!(body["KODE_KPP"], 302);
    assert_eq!(body["TGL_DAFTAR"], "2015-03-02");
    assert_eq!(body["SALDO"], "1250000.50");
    assert_eq!(body["UPDATED_AT"], "2024-01-05 08:30:00");
    assert_eq!(body["JUMLAH"], "18446744073709551615");

    registry.close().await;
    drop_database(&catalog, &users_db).await;
    drop_database(&catalog, &mfwp_db).await;
    catalog.close().await;
}

#[cfg(feature = "redis")]
mod redis_sessions {
    use std::{
        net::{IpAddr, Ipv4Addr},
        sync::Arc,
        time::Duration,
    };

    use watcher::{
        auth::{AuthContext, IpFamily, client_ip},
        kv::KvStore,
        session::{SESSION_TTL, SessionStore, StoreError},
    };

    use crate::helpers::redis_kv;

    fn context() -> AuthContext {
        let addr = IpAddr::V4(Ipv4Addr::new(10, 20, 0, 7));
        AuthContext {
            user_id: "u-31".into(),
            name: "Sri Wahyuni".into(),
            role: "staff".into(),
            nip: "198703122009012004".into(),
            department_id: "4".into(),
            title: "Pelaksana".into(),
            ip: client_ip(&addr),
            ip_family: IpFamily::of(&addr),
        }
    }

    fn test_key(label: &str) -> String {
        format!("watcher-test-{label}-{}", uuid::Uuid::new_v4().simple())
    }

    #[tokio::test]
    async fn test_session_is_written_with_its_ttl() {
        let Some((kv, url)) = redis_kv().await else {
            eprintln!("TEST_REDIS_URL not set, skipping");
            return;
        };
        let sessions = SessionStore::new(Arc::new(kv));
        let ctx = context();
        let token = sessions.create(&ctx, SESSION_TTL).await.unwrap();

        let client = ::redis::Client::open(url.as_str()).unwrap();
        let mut conn = client.get_multiplexed_async_connection().await.unwrap();
        let ttl: i64 = ::redis::cmd("TTL")
            .arg(token.as_str())
            .query_async(&mut conn)
            .await
            .unwrap();
        assert!((86_390..=86_400).contains(&ttl), "ttl was {ttl}");

        assert_eq!(sessions.resolve(token.as_str()).await.unwrap(), ctx);

        // Reads leave the TTL alone
        let after: i64 = ::redis::cmd("TTL")
            .arg(token.as_str())
            .query_async(&mut conn)
            .await
            .unwrap();
        assert!(after <= ttl);

        sessions.destroy(token.as_str()).await.unwrap();
        assert!(matches!(
            sessions.resolve(token.as_str()).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_key_expires() {
        let Some((kv, _)) = redis_kv().await else {
            eprintln!("TEST_REDIS_URL not set, skipping");
            return;
        };
        let key = test_key("expiry");
        kv.set_with_ttl(&key, "v", Duration::from_secs(1)).await.unwrap();
        assert_eq!(kv.get(&key).await.unwrap().as_deref(), Some("v"));

        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert_eq!(kv.get(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_reports_presence() {
        let Some((kv, _)) = redis_kv().await else {
            eprintln!("TEST_REDIS_URL not set, skipping");
            return;
        };
        let key = test_key("delete");
        kv.set_with_ttl(&key, "v", Duration::from_secs(60)).await.unwrap();
        assert!(kv.delete(&key).await.unwrap());
        assert!(!kv.delete(&key).await.unwrap());
        assert_eq!(kv.get(&key).await.unwrap(), None);
        kv.ping().await.unwrap();
    }
}
