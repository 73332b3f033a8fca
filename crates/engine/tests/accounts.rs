use sea_orm::{ConnectionTrait, Database, Statement};
use uuid::Uuid;

use engine::{
    Engine, EngineError, Money, OutcomePreset, SEED_BALANCE, TrustedRecipient, UserSettings,
};
use migration::MigratorTrait;

async fn engine_with_user() -> Engine {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db).build();
    engine.create_user("alice", "password").await.unwrap();
    engine
}

async fn file_db_engine() -> (Engine, String, std::path::PathBuf) {
    let root = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../target/test_dbs");
    std::fs::create_dir_all(&root).unwrap();

    let path = root.join(format!("accounts_{}.db", Uuid::new_v4()));
    let url = format!("sqlite:{}?mode=rwc", path.display());

    let db = Database::connect(&url).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db).build();
    (engine, url, path)
}

#[tokio::test]
async fn signup_and_login_open_a_seeded_session() {
    let engine = engine_with_user().await;

    let session = engine.login("alice", "password").await.unwrap();
    assert_eq!(session.username(), "alice");
    assert_eq!(session.balance().await, SEED_BALANCE);
    assert_eq!(session.transactions().await.len(), 5);
}

#[tokio::test]
async fn duplicate_usernames_are_rejected() {
    let engine = engine_with_user().await;
    let err = engine.create_user("alice", "other").await.unwrap_err();
    assert_eq!(err, EngineError::ExistingKey("alice".to_string()));
}

#[tokio::test]
async fn bad_credentials_share_one_error() {
    let engine = engine_with_user().await;

    let wrong_password = engine.login("alice", "nope").await.unwrap_err();
    let unknown_user = engine.login("nobody", "password").await.unwrap_err();
    assert_eq!(wrong_password, unknown_user);
    assert_eq!(
        wrong_password,
        EngineError::Validation("invalid credentials".to_string())
    );
}

#[tokio::test]
async fn change_password_requires_the_current_one() {
    let engine = engine_with_user().await;

    let err = engine
        .change_password("alice", "wrong", "newpass")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    engine
        .change_password("alice", "password", "newpass")
        .await
        .unwrap();
    assert!(engine.login("alice", "password").await.is_err());
    assert!(engine.login("alice", "newpass").await.is_ok());
}

#[tokio::test]
async fn delete_user_removes_credentials_and_settings() {
    let engine = engine_with_user().await;
    engine
        .save_user_settings(
            "alice",
            &UserSettings {
                transaction_pin: Some("1234".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    engine.delete_user("alice").await.unwrap();
    assert!(!engine.user_exists("alice").await.unwrap());
    assert!(engine.login("alice", "password").await.is_err());

    let err = engine.delete_user("alice").await.unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("alice".to_string()));
}

#[tokio::test]
async fn settings_round_trip_and_reset() {
    let engine = engine_with_user().await;

    // Nothing saved yet: defaults.
    let settings = engine.user_settings("alice").await.unwrap();
    assert_eq!(settings, UserSettings::default());

    let custom = UserSettings {
        transaction_pin: Some("1234".to_string()),
        preset_outcome: OutcomePreset::Pending,
        spending_limit: Some(Money::new(10_000_000)),
        default_bank: Some("GTBank".to_string()),
        ..Default::default()
    };
    engine.save_user_settings("alice", &custom).await.unwrap();
    assert_eq!(engine.user_settings("alice").await.unwrap(), custom);

    engine.reset_user_settings("alice").await.unwrap();
    assert_eq!(
        engine.user_settings("alice").await.unwrap(),
        UserSettings::default()
    );
}

#[tokio::test]
async fn corrupted_settings_record_surfaces_as_a_settings_error() {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO users (username, password) VALUES (?, ?)",
        vec!["alice".into(), "password".into()],
    ))
    .await
    .unwrap();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO user_settings (username, settings) VALUES (?, ?)",
        vec!["alice".into(), "{not json".into()],
    ))
    .await
    .unwrap();
    let engine = Engine::builder().database(db).build();

    let err = engine.user_settings("alice").await.unwrap_err();
    assert!(matches!(err, EngineError::SettingsCodec(_)));
}

#[tokio::test]
async fn settings_for_unknown_user_cannot_be_saved() {
    let engine = engine_with_user().await;
    let err = engine
        .save_user_settings("nobody", &UserSettings::default())
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("nobody".to_string()));
}

#[tokio::test]
async fn trusted_recipients_are_added_and_removed() {
    let engine = engine_with_user().await;
    let jane = TrustedRecipient {
        name: "Jane O.".to_string(),
        bank: "GTBank".to_string(),
        account: "0123456789".to_string(),
    };

    engine
        .add_trusted_recipient("alice", jane.clone())
        .await
        .unwrap();
    let err = engine
        .add_trusted_recipient("alice", jane.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));

    engine
        .remove_trusted_recipient("alice", "0123456789", "GTBank")
        .await
        .unwrap();
    let err = engine
        .remove_trusted_recipient("alice", "0123456789", "GTBank")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn settings_survive_an_engine_rebuild() {
    let (engine, url, path) = file_db_engine().await;
    engine.create_user("alice", "password").await.unwrap();
    engine
        .save_user_settings(
            "alice",
            &UserSettings {
                receipt_account_name: Some("Ada L.".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    drop(engine);

    let db = Database::connect(&url).await.unwrap();
    let engine = Engine::builder().database(db).build();
    assert!(engine.login("alice", "password").await.is_ok());
    assert_eq!(
        engine
            .user_settings("alice")
            .await
            .unwrap()
            .receipt_account_name
            .as_deref(),
        Some("Ada L.")
    );

    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn export_and_import_restore_the_ledger() {
    let engine = engine_with_user().await;
    let session = engine.login("alice", "password").await.unwrap();

    session
        .pay_bill("Electricity", "1234567890", Money::new(500_000))
        .await
        .unwrap();
    let raw = engine.export_account(&session).await.unwrap();

    // A fresh login starts from the seed again.
    let restored = engine.login("alice", "password").await.unwrap();
    assert_eq!(restored.balance().await, SEED_BALANCE);

    engine.import_account(&restored, &raw).await.unwrap();
    assert_eq!(restored.balance().await, Money::new(451_500_000));
    assert_eq!(restored.transactions().await.len(), 6);
}

#[tokio::test]
async fn import_rejects_garbage() {
    let engine = engine_with_user().await;
    let session = engine.login("alice", "password").await.unwrap();

    let err = engine
        .import_account(&session, "{not json")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ImportParse(_)));
    assert_eq!(session.balance().await, SEED_BALANCE);
}
