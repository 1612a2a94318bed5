//! Repository behavior against a real store file

use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;

use gm_knowledge_core::catalog::{Monster, Spell};
use gm_knowledge_core::config::StoreConfig;
use gm_knowledge_core::ContentPack;
use gm_knowledge_storage::{ContentStore, Repository, RepositoryHub};

async fn open_store() -> (Arc<ContentStore>, TempDir) {
    let dir = TempDir::new().unwrap();
    let config = StoreConfig {
        url: format!("file:{}", dir.path().join("content.db").display()),
        ..StoreConfig::default()
    };
    let store = ContentStore::open(config).await.unwrap();
    store.initialize_schema().await.unwrap();
    (Arc::new(store), dir)
}

async fn add_pack(store: &ContentStore, id: &str, active: bool) {
    let mut pack = ContentPack::new(id, id, "1.0");
    pack.is_active = active;
    store.upsert_content_pack(&pack).await.unwrap();
}

async fn add_spell(store: &ContentStore, pack: &str, index: &str, name: &str, level: i64) {
    let conn = store.acquire().await.unwrap();
    conn.execute(
        "INSERT INTO spells (\"index\", name, url, content_pack_id, level, ritual, \"desc\") \
         VALUES (?, ?, ?, ?, ?, 0, ?)",
        libsql::params![
            index,
            name,
            format!("/api/spells/{index}"),
            pack,
            level,
            json!([format!("{name} does something arcane.")]).to_string(),
        ],
    )
    .await
    .unwrap();
    store.release(conn);
}

async fn add_monster(store: &ContentStore, pack: &str, index: &str, name: &str, cr: f64) {
    let conn = store.acquire().await.unwrap();
    conn.execute(
        "INSERT INTO monsters (\"index\", name, url, content_pack_id, size, type, hit_points, \
         strength, dexterity, constitution, intelligence, wisdom, charisma, challenge_rating, xp) \
         VALUES (?, ?, ?, ?, 'Medium', 'humanoid', 15, 10, 10, 10, 10, 10, 10, ?, 100)",
        libsql::params![
            index,
            name,
            format!("/api/monsters/{index}"),
            pack,
            cr,
        ],
    )
    .await
    .unwrap();
    store.release(conn);
}

#[tokio::test]
async fn pack_priority_overrides_resolution_order() {
    let (store, _dir) = open_store().await;
    add_pack(&store, "pack_a", true).await;
    add_pack(&store, "pack_b", true).await;
    add_spell(&store, "pack_a", "fireball", "Fireball", 3).await;
    add_spell(&store, "pack_b", "fireball", "Custom Fireball", 3).await;

    let repo = Repository::<Spell>::new(Arc::clone(&store));

    let b_first = vec!["pack_b".to_string(), "pack_a".to_string()];
    let spell = repo
        .get_by_index_with_packs("fireball", Some(&b_first))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(spell.name, "Custom Fireball");

    let a_first = vec!["pack_a".to_string(), "pack_b".to_string()];
    let spell = repo
        .get_by_index_with_packs("fireball", Some(&a_first))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(spell.name, "Fireball");

    // Without a priority list either pack may win, but the winner is
    // stable across calls
    let first = repo.get_by_index("fireball").await.unwrap().unwrap();
    for _ in 0..5 {
        let again = repo.get_by_index("fireball").await.unwrap().unwrap();
        assert_eq!(again.name, first.name);
    }
}

#[tokio::test]
async fn inactive_packs_are_invisible_without_priority() {
    let (store, _dir) = open_store().await;
    add_pack(&store, "homebrew", false).await;
    add_spell(&store, "homebrew", "soulfire", "Soulfire", 4).await;

    let repo = Repository::<Spell>::new(Arc::clone(&store));
    assert!(repo.get_by_index("soulfire").await.unwrap().is_none());
    assert!(!repo.exists("soulfire").await.unwrap());
    assert_eq!(repo.count().await.unwrap(), 0);

    // An explicit priority list reaches into inactive packs
    let priority = vec!["homebrew".to_string()];
    let spell = repo
        .get_by_index_with_packs("soulfire", Some(&priority))
        .await
        .unwrap();
    assert!(spell.is_some());
}

#[tokio::test]
async fn returned_values_outlive_the_store() {
    let (store, dir) = open_store().await;
    add_pack(&store, "srd", true).await;
    add_spell(&store, "srd", "fireball", "Fireball", 3).await;

    let repo = Repository::<Spell>::new(Arc::clone(&store));
    let spell = repo.get_by_index("fireball").await.unwrap().unwrap();
    let serialized_before = serde_json::to_string(&spell).unwrap();

    // Dispose the store; the value object must be unaffected
    store.dispose();
    drop(repo);
    drop(store);
    drop(dir);

    let serialized_after = serde_json::to_string(&spell).unwrap();
    assert_eq!(serialized_before, serialized_after);

    // Storage-only fields never reach the caller
    assert!(!serialized_after.contains("content_pack_id"));
    assert!(!serialized_after.contains("embedding"));
}

#[tokio::test]
async fn common_interface_covers_lookup_search_and_listing() {
    let (store, _dir) = open_store().await;
    add_pack(&store, "srd", true).await;
    add_spell(&store, "srd", "fireball", "Fireball", 3).await;
    add_spell(&store, "srd", "fire-bolt", "Fire Bolt", 0).await;
    add_spell(&store, "srd", "shield", "Shield", 1).await;

    let repo = Repository::<Spell>::new(Arc::clone(&store));

    // Case-insensitive name lookup
    let spell = repo.get_by_name("fIrEbAlL").await.unwrap().unwrap();
    assert_eq!(spell.index, "fireball");

    // Substring search
    let hits = repo.search("fire").await.unwrap();
    assert_eq!(hits.len(), 2);

    // Field filters with validation of the field name
    let cantrips = repo.filter_by(&[("level", json!(0))]).await.unwrap();
    assert_eq!(cantrips.len(), 1);
    assert_eq!(cantrips[0].index, "fire-bolt");
    assert!(repo.filter_by(&[("hit_points", json!(7))]).await.is_err());

    assert_eq!(repo.count().await.unwrap(), 3);
    let names = repo.get_names().await.unwrap();
    assert_eq!(names, vec!["Fire Bolt", "Fireball", "Shield"]);
    let indices = repo.get_indices().await.unwrap();
    assert!(indices.contains(&"fire-bolt".to_string()));
}

#[tokio::test]
async fn specialized_repositories_filter_by_domain() {
    let (store, _dir) = open_store().await;
    add_pack(&store, "srd", true).await;
    add_spell(&store, "srd", "fireball", "Fireball", 3).await;
    add_spell(&store, "srd", "shield", "Shield", 1).await;
    add_monster(&store, "srd", "goblin", "Goblin", 0.25).await;
    add_monster(&store, "srd", "orc", "Orc", 0.5).await;
    add_monster(&store, "srd", "adult-red-dragon", "Adult Red Dragon", 17.0).await;

    let hub = RepositoryHub::new(Arc::clone(&store));

    let third_level = hub.spells().get_by_level(3).await.unwrap();
    assert_eq!(third_level.len(), 1);
    assert_eq!(third_level[0].index, "fireball");

    let low_cr = hub.monsters().get_by_cr_range(0.0, 1.0).await.unwrap();
    assert_eq!(low_cr.len(), 2);

    let dragons = hub
        .monsters()
        .base()
        .search("dragon")
        .await
        .unwrap();
    assert_eq!(dragons.len(), 1);
}

#[tokio::test]
async fn invalid_rows_are_skipped_in_batches() {
    let (store, _dir) = open_store().await;
    add_pack(&store, "srd", true).await;
    add_spell(&store, "srd", "fireball", "Fireball", 3).await;

    // A monster missing required ability scores fails validation
    let conn = store.acquire().await.unwrap();
    conn.execute(
        "INSERT INTO monsters (\"index\", name, url, content_pack_id, size, type, hit_points, \
         strength, dexterity, constitution, intelligence, wisdom, charisma, challenge_rating, xp) \
         VALUES ('goblin', 'Goblin', '/api/monsters/goblin', 'srd', 'Small', 'humanoid', 7, \
         8, 14, 10, 10, 8, 8, 0.25, 50)",
        (),
    )
    .await
    .unwrap();
    // condition_immunities holds strings instead of reference triples, so
    // the row passes SQL constraints but fails domain validation
    conn.execute(
        "INSERT INTO monsters (\"index\", name, url, content_pack_id, size, type, hit_points, \
         strength, dexterity, constitution, intelligence, wisdom, charisma, challenge_rating, xp, \
         condition_immunities) \
         VALUES ('broken', 'Broken', '/api/monsters/broken', 'srd', 'Small', 'humanoid', 7, \
         8, 8, 8, 8, 8, 8, 0.0, 0, '[\"charmed\"]')",
        (),
    )
    .await
    .unwrap();
    store.release(conn);

    let repo = Repository::<Monster>::new(Arc::clone(&store));
    let monsters = repo.list_all().await.unwrap();
    assert_eq!(monsters.len(), 1);
    assert_eq!(monsters[0].index, "goblin");
}
