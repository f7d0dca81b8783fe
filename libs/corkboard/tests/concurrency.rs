//! Slug assignment under concurrent creation

mod common;

use std::collections::BTreeSet;

use corkboard::models::{NewBoard, NewList};

const WRITERS: usize = 8;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_boards_get_consecutive_slugs() -> Result<(), Box<dyn std::error::Error>> {
    let client = common::client().await;
    let (_, token) = common::sign_up(&client, "John Doe", "john@example.com").await;

    let mut handles = Vec::new();
    for _ in 0..WRITERS {
        let client = client.clone();
        let token = token.clone();
        handles.push(tokio::spawn(async move {
            let session = client.connect(Some(token));
            session
                .boards()
                .create(NewBoard {
                    name: "Weekly Sync".to_string(),
                    settings: None,
                })
                .await
                .map(|board| board.slug)
        }));
    }

    let mut slugs = BTreeSet::new();
    for handle in handles {
        slugs.insert(handle.await??);
    }

    let mut expected = BTreeSet::from(["weekly-sync".to_string()]);
    expected.extend((1..WRITERS).map(|n| format!("weekly-sync-{}", n)));
    assert_eq!(slugs, expected);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_lists_stay_unique_per_board() -> Result<(), Box<dyn std::error::Error>> {
    let client = common::client().await;
    let (_, token) = common::sign_up(&client, "John Doe", "john@example.com").await;

    let session = client.connect(Some(token.clone()));
    let board = session
        .boards()
        .create(NewBoard {
            name: "Board".to_string(),
            settings: None,
        })
        .await?;
    let board_id = board.id.to_string();

    let mut handles = Vec::new();
    for i in 0..WRITERS {
        let client = client.clone();
        let token = token.clone();
        let board_id = board_id.clone();
        handles.push(tokio::spawn(async move {
            client
                .connect(Some(token))
                .lists()
                .create(
                    &board_id,
                    NewList {
                        name: "Done".to_string(),
                        position: i as f64,
                    },
                )
                .await
                .map(|list| list.slug)
        }));
    }

    let mut slugs = BTreeSet::new();
    for handle in handles {
        assert!(slugs.insert(handle.await??), "duplicate slug");
    }
    assert_eq!(slugs.len(), WRITERS);
    assert_eq!(session.lists().list_by_board(&board_id).await?.len(), WRITERS);
    Ok(())
}
