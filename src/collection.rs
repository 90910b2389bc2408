//! Collection lifecycle commands: `dh init`, `dh verify`, `dh drop`.

use anyhow::{bail, Result};
use discussion_harness_core::index::ensure_collection;
use discussion_harness_core::search::Searcher;
use discussion_harness_core::store::{CollectionSchema, IndexStore};

use crate::config::Config;
use crate::typesense::TypesenseStore;
use crate::{db, migrate};

/// Ensure the collection and the response log exist.
pub async fn run_init(config: &Config) -> Result<()> {
    let store = TypesenseStore::from_env(&config.index)?;
    let schema = CollectionSchema::discussions(&config.index.collection);
    let created = ensure_collection(&store, &schema).await?;

    let pool = db::connect(config).await?;
    migrate::run_migrations(&pool).await?;
    pool.close().await;

    if created {
        println!("Created collection '{}'.", config.index.collection);
    } else {
        println!("Collection '{}' already exists.", config.index.collection);
    }
    println!("Response log ready at {}", config.log.path.display());
    Ok(())
}

/// Report how many documents the collection holds.
pub async fn run_verify(config: &Config) -> Result<()> {
    let store = TypesenseStore::from_env(&config.index)?;
    let count = Searcher::new(&store, &config.index.collection)
        .count_documents()
        .await?;
    println!(
        "Collection '{}' contains {} documents.",
        config.index.collection, count
    );
    Ok(())
}

/// Delete the collection. Refuses without `--yes`.
pub async fn run_drop(config: &Config, confirmed: bool) -> Result<()> {
    if !confirmed {
        bail!(
            "Refusing to delete collection '{}' without --yes",
            config.index.collection
        );
    }
    let store = TypesenseStore::from_env(&config.index)?;
    store.delete_collection(&config.index.collection).await?;
    println!("Deleted collection '{}'.", config.index.collection);
    Ok(())
}
