//! Bulk copying between storages.

use anyhow::Result;
use stowage::{BulkCopy, Content, Error, Key, MemoryStorage, Storage};

use common::{key, random_buffer};

mod common;

#[tokio::test]
async fn copies_everything() -> Result<()> {
    let source = MemoryStorage::new();
    let destination = MemoryStorage::new();
    let expected = random_buffer();

    source.save(&key("a/one"), Content::from(expected.clone())).await?;
    source.save(&key("b/two"), Content::from("2")).await?;

    BulkCopy::all(&source).copy_to(&destination).await?;

    assert_eq!(
        destination.list(&Key::ROOT).await?,
        vec![key("a/one"), key("b/two")],
    );
    assert_eq!(destination.value(&key("a/one")).await?.bytes().await?, expected);
    // The source keeps its data.
    assert!(source.exists(&key("a/one")).await?);

    Ok(())
}

#[tokio::test]
async fn copies_only_the_listed_keys() -> Result<()> {
    let source = MemoryStorage::new();
    let destination = MemoryStorage::new();

    source.save(&key("wanted"), Content::from("1")).await?;
    source.save(&key("ignored"), Content::from("2")).await?;

    BulkCopy::keys(&source, vec![key("wanted")])
        .copy_to(&destination)
        .await?;

    assert_eq!(destination.list(&Key::ROOT).await?, vec![key("wanted")]);

    Ok(())
}

#[tokio::test]
async fn copies_keys_matching_a_predicate() -> Result<()> {
    let source = MemoryStorage::new();
    let destination = MemoryStorage::new();

    source.save(&key("docs/readme.md"), Content::from("md")).await?;
    source.save(&key("docs/logo.png"), Content::from("png")).await?;
    source.save(&key("notes.md"), Content::from("md")).await?;

    BulkCopy::filtered(&source, |key| key.to_string().ends_with(".md"))
        .copy_to(&destination)
        .await?;

    assert_eq!(
        destination.list(&Key::ROOT).await?,
        vec![key("docs/readme.md"), key("notes.md")],
    );

    Ok(())
}

#[tokio::test]
async fn fails_on_a_missing_explicit_key() -> Result<()> {
    let source = MemoryStorage::new();
    let destination = MemoryStorage::new();

    source.save(&key("present"), Content::from("1")).await?;

    let err = BulkCopy::keys(&source, vec![key("present"), key("missing")])
        .copy_to(&destination)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    Ok(())
}

#[tokio::test]
async fn copying_nothing_succeeds() -> Result<()> {
    let source = MemoryStorage::new();
    let destination = MemoryStorage::new();

    BulkCopy::all(&source).copy_to(&destination).await?;
    assert!(destination.list(&Key::ROOT).await?.is_empty());

    Ok(())
}
