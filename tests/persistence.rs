use homestead::{
    actors::{ActorId, UnitId, UnitKind},
    buildings::BuildingKind,
    commands::OrderRequest,
    config::GameConfig,
    engine::{EngineBuilder, EngineSettings},
    persistence::{DocumentStore, LocalStore, PersistenceGateway},
    resources::ResourceKind,
    world::World,
};
use tempfile::tempdir;

fn build_engine(seed: u64) -> EngineBuilder {
    let config = GameConfig {
        seed,
        ..GameConfig::default()
    };
    EngineBuilder::standard(EngineSettings::new(config))
}

#[tokio::test]
async fn saved_game_resumes_exactly_where_it_left_off() {
    let dir = tempdir().expect("tempdir");
    let gateway = PersistenceGateway::new(LocalStore::new(dir.path()));
    let mut engine = build_engine(11).build();
    let mut world = engine.new_world();
    world
        .issue_order(engine.config(), ActorId::Unit(UnitId(1)), OrderRequest::Explore)
        .unwrap();
    engine.run(&mut world, 50).unwrap();

    gateway.save_snapshot("ada", &world).await.unwrap();
    let mut restored = gateway
        .load_snapshot("ada")
        .await
        .unwrap()
        .expect("snapshot present");
    engine.restore(&mut restored);
    assert_eq!(restored, world);

    let mut other_engine = build_engine(11).build();
    engine.run(&mut world, 30).unwrap();
    other_engine.run(&mut restored, 30).unwrap();
    assert_eq!(restored.tick(), world.tick());
    assert_eq!(restored.map(), world.map());
    assert_eq!(restored.discoveries(), world.discoveries());
    assert_eq!(restored.actors(), world.actors());
}

#[tokio::test]
async fn partial_snapshot_fills_in_defaults() {
    let dir = tempdir().expect("tempdir");
    let store = LocalStore::new(dir.path());
    store
        .put(
            "ee_idle_save_bob",
            r#"{"game":{"ledger":{"food":5,"population":2,"populationLimit":8}}}"#.to_string(),
        )
        .await
        .unwrap();
    let gateway = PersistenceGateway::new(store);

    let mut world = gateway
        .load_snapshot("bob")
        .await
        .unwrap()
        .expect("snapshot present");
    assert_eq!(world.ledger().food, 5.0);
    assert_eq!(world.ledger().population, 2);
    assert_eq!(world.ledger().population_limit, 8);
    assert_eq!(world.discoveries().available(ResourceKind::Gold), 0);
    assert_eq!(world.actors().next_unit_id(), 1);
    assert_eq!(world.actors().next_group_id(), 1);
    assert!(world.map().is_empty());

    let engine = build_engine(3).build();
    engine.restore(&mut world);
    assert_eq!(world.map().len(), 25);
    assert_eq!(world.map().discovered_count(), 0);
}

#[tokio::test]
async fn missing_and_deleted_saves_load_as_none() {
    let dir = tempdir().expect("tempdir");
    let gateway = PersistenceGateway::new(LocalStore::new(dir.path()));
    assert_eq!(gateway.load_snapshot("nobody").await.unwrap(), None);

    gateway.save_snapshot("ada", &World::fresh()).await.unwrap();
    gateway.delete_snapshot("ada").await.unwrap();
    assert_eq!(gateway.load_snapshot("ada").await.unwrap(), None);
}

#[tokio::test]
async fn first_version_saves_keep_their_stock() {
    let dir = tempdir().expect("tempdir");
    let store = LocalStore::new(dir.path());
    store
        .put(
            "ee_idle_save_carol",
            r#"{"game":{"food":40,"wood":12,"gold":0,"stone":7,"iron":1,
                "population":3,"populationLimit":4,
                "units":{"citizen":2,"scout":1,"hunter":0},
                "buildings":{"house":1}}}"#
                .to_string(),
        )
        .await
        .unwrap();
    let gateway = PersistenceGateway::new(store);

    let mut world = gateway
        .load_snapshot("carol")
        .await
        .unwrap()
        .expect("old save is readable");
    let engine = build_engine(5).build();
    engine.restore(&mut world);

    assert_eq!(world.ledger().food, 40.0);
    assert_eq!(world.ledger().wood, 12.0);
    assert_eq!(world.ledger().stone, 7.0);
    assert_eq!(world.ledger().population, 3);
    assert_eq!(world.ledger().population_limit, 4);
    assert_eq!(world.actors().unit_count(UnitKind::Citizen), 2);
    assert_eq!(world.actors().unit_count(UnitKind::Scout), 1);
    assert_eq!(world.buildings().count(BuildingKind::House), 1);
    assert_eq!(world.map().len(), 25);

    let id = world.spawn_unit(UnitKind::Hunter).unwrap();
    assert_eq!(id, UnitId(4));
}

#[tokio::test]
async fn save_without_counters_never_hands_out_a_taken_id() {
    let dir = tempdir().expect("tempdir");
    let store = LocalStore::new(dir.path());
    store
        .put(
            "ee_idle_save_dan",
            r#"{"game":{"ledger":{"population":2,"population_limit":8},
                "units":[{"id":1,"kind":"citizen"},{"id":2,"kind":"scout"}]}}"#
                .to_string(),
        )
        .await
        .unwrap();
    let gateway = PersistenceGateway::new(store);
    let engine = build_engine(5).build();

    let mut world = gateway
        .load_snapshot("dan")
        .await
        .unwrap()
        .expect("snapshot present");
    engine.restore(&mut world);

    let id = world.spawn_unit(UnitKind::Hunter).unwrap();
    assert_eq!(id, UnitId(3));
    world
        .issue_order(engine.config(), ActorId::Unit(UnitId(1)), OrderRequest::Explore)
        .unwrap();
    let orders: Vec<(u32, &str)> = world
        .actors()
        .units()
        .iter()
        .map(|unit| (unit.id.0, unit.order.name()))
        .collect();
    assert_eq!(orders, vec![(1, "explore"), (2, "idle"), (3, "idle")]);
}
