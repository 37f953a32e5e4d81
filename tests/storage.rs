//! Contract tests run against every backend.

use anyhow::Result;
use stowage::{Content, Error, FileStorage, Key, MemoryStorage, Storage};
use tempfile::tempdir;

use common::{key, random_buffer};

mod common;

async fn saves_and_loads(storage: &impl Storage) -> Result<()> {
    let target = key("one/two/file.txt");
    let expected = random_buffer();

    assert!(!storage.exists(&target).await?);
    storage.save(&target, Content::from(expected.clone())).await?;
    assert!(storage.exists(&target).await?);

    let value = storage.value(&target).await?;
    assert_eq!(value.size(), Some(expected.len() as u64));
    assert_eq!(value.bytes().await?, expected);

    Ok(())
}

async fn save_overwrites(storage: &impl Storage) -> Result<()> {
    let target = key("file");
    storage.save(&target, Content::from("original")).await?;
    storage.save(&target, Content::from("replacement")).await?;

    let value = storage.value(&target).await?.bytes().await?;
    assert_eq!(value.as_ref(), b"replacement");

    Ok(())
}

async fn value_of_missing_key_fails(storage: &impl Storage) -> Result<()> {
    let err = storage.value(&key("missing")).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    Ok(())
}

async fn save_to_root_fails(storage: &impl Storage) -> Result<()> {
    assert!(storage.save(&Key::ROOT, Content::empty()).await.is_err());
    Ok(())
}

async fn value_of_root_fails(storage: &impl Storage) -> Result<()> {
    assert!(storage.value(&Key::ROOT).await.is_err());
    Ok(())
}

async fn deletes_value(storage: &impl Storage) -> Result<()> {
    let target = key("doomed");
    storage.save(&target, Content::from("data")).await?;
    storage.delete(&target).await?;
    assert!(!storage.exists(&target).await?);
    Ok(())
}

async fn delete_of_missing_key_fails(storage: &impl Storage) -> Result<()> {
    let err = storage.delete(&key("missing")).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    Ok(())
}

async fn moves_value(storage: &impl Storage) -> Result<()> {
    let source = key("from/file");
    let destination = key("to/file");
    let expected = random_buffer();

    storage.save(&source, Content::from(expected.clone())).await?;
    storage.save(&destination, Content::from("stale")).await?;
    storage.move_value(&source, &destination).await?;

    assert!(!storage.exists(&source).await?);
    assert_eq!(storage.value(&destination).await?.bytes().await?, expected);

    Ok(())
}

async fn move_of_missing_source_fails(storage: &impl Storage) -> Result<()> {
    let err = storage
        .move_value(&key("missing"), &key("anywhere"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    Ok(())
}

async fn lists_structural_descendants(storage: &impl Storage) -> Result<()> {
    storage.save(&key("pre/file"), Content::empty()).await?;
    storage.save(&key("pre/sub/file"), Content::empty()).await?;
    storage.save(&key("pref/other"), Content::empty()).await?;
    storage.save(&key("unrelated"), Content::empty()).await?;

    // `pref` shares a string prefix with `pre` but is not nested under it.
    assert_eq!(
        storage.list(&key("pre")).await?,
        vec![key("pre/file"), key("pre/sub/file")],
    );
    assert_eq!(
        storage.list(&Key::ROOT).await?,
        vec![
            key("pre/file"),
            key("pre/sub/file"),
            key("pref/other"),
            key("unrelated"),
        ],
    );
    assert!(storage.list(&key("absent")).await?.is_empty());

    Ok(())
}

async fn lists_key_itself(storage: &impl Storage) -> Result<()> {
    storage.save(&key("exact/file"), Content::empty()).await?;
    assert_eq!(
        storage.list(&key("exact/file")).await?,
        vec![key("exact/file")],
    );
    Ok(())
}

async fn reads_metadata_size(storage: &impl Storage) -> Result<()> {
    let target = key("sized");
    storage.save(&target, Content::from("four")).await?;
    assert_eq!(storage.metadata(&target).await?.size(), 4);

    let err = storage.metadata(&key("missing")).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    Ok(())
}

async fn value_is_one_time(storage: &impl Storage) -> Result<()> {
    let target = key("once");
    storage.save(&target, Content::from("payload")).await?;

    let value = storage.value(&target).await?;
    assert_eq!(value.bytes().await?.as_ref(), b"payload");
    assert!(matches!(value.stream(), Err(Error::AlreadyConsumed)));

    Ok(())
}

async fn delete_all_removes_subtree(storage: &impl Storage) -> Result<()> {
    storage.save(&key("tree/one"), Content::empty()).await?;
    storage.save(&key("tree/sub/two"), Content::empty()).await?;
    storage.save(&key("kept"), Content::empty()).await?;

    storage.delete_all(&key("tree")).await?;

    assert_eq!(storage.list(&Key::ROOT).await?, vec![key("kept")]);

    Ok(())
}

macro_rules! backend_tests {
    ($($scenario:ident),+ $(,)?) => {
        mod memory {
            use super::*;

            $(
                #[tokio::test]
                async fn $scenario() -> Result<()> {
                    super::$scenario(&MemoryStorage::new()).await
                }
            )+
        }

        mod file {
            use super::*;

            $(
                #[tokio::test]
                async fn $scenario() -> Result<()> {
                    let temp_dir = tempdir()?;
                    super::$scenario(&FileStorage::new(temp_dir.path())).await
                }
            )+
        }
    };
}

backend_tests!(
    saves_and_loads,
    save_overwrites,
    value_of_missing_key_fails,
    save_to_root_fails,
    value_of_root_fails,
    deletes_value,
    delete_of_missing_key_fails,
    moves_value,
    move_of_missing_source_fails,
    lists_structural_descendants,
    lists_key_itself,
    reads_metadata_size,
    value_is_one_time,
    delete_all_removes_subtree,
);
