use homestead::{
    accounts::{AccountError, AccountService},
    config::GameConfig,
    engine::{Engine, EngineBuilder, EngineSettings},
    persistence::{LocalStore, PersistenceGateway},
};
use tempfile::{tempdir, TempDir};

fn setup() -> (TempDir, AccountService<LocalStore>, Engine) {
    let dir = tempdir().expect("tempdir");
    let service = AccountService::new(PersistenceGateway::new(LocalStore::new(dir.path())));
    let engine = EngineBuilder::standard(EngineSettings::new(GameConfig::default())).build();
    (dir, service, engine)
}

#[tokio::test]
async fn signup_starts_a_fresh_game_and_session() {
    let (_dir, accounts, engine) = setup();
    let session = accounts.signup(&engine, "ada", "hunter2").await.unwrap();
    assert_eq!(session.user, "ada");
    assert_eq!(session.world.ledger().population, 1);
    assert_eq!(session.world.map().len(), 25);
    assert_eq!(accounts.resume().await.unwrap().as_deref(), Some("ada"));

    let err = accounts.signup(&engine, "ada", "other").await.unwrap_err();
    assert!(matches!(err, AccountError::UserExists(name) if name == "ada"));
    assert!(matches!(
        accounts.signup(&engine, "", "pw").await,
        Err(AccountError::EmptyCredentials)
    ));
}

#[tokio::test]
async fn login_checks_credentials() {
    let (_dir, accounts, engine) = setup();
    accounts.signup(&engine, "ada", "hunter2").await.unwrap();

    assert!(matches!(
        accounts.login(&engine, "ada", "wrong").await,
        Err(AccountError::WrongPassword)
    ));
    assert!(matches!(
        accounts.login(&engine, "grace", "hunter2").await,
        Err(AccountError::UnknownUser(_))
    ));
    assert!(accounts.login(&engine, "ada", "hunter2").await.is_ok());
}

#[tokio::test]
async fn logout_saves_and_login_brings_the_game_back() {
    let (_dir, accounts, mut engine) = setup();
    let mut session = accounts.signup(&engine, "ada", "hunter2").await.unwrap();
    session.world.ledger_mut().wood = 17.0;
    engine.run(&mut session.world, 12).unwrap();

    accounts.logout("ada", &session.world).await.unwrap();
    assert_eq!(accounts.resume().await.unwrap(), None);
    assert!(accounts.resume_session(&engine).await.unwrap().is_none());

    let back = accounts.login(&engine, "ada", "hunter2").await.unwrap();
    assert_eq!(back.world, session.world);
    assert_eq!(back.world.tick(), 12);

    let resumed = accounts
        .resume_session(&engine)
        .await
        .unwrap()
        .expect("session recorded by login");
    assert_eq!(resumed.user, "ada");
    assert_eq!(resumed.world.ledger().wood, 17.0);
}
