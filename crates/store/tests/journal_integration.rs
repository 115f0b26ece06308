use futures::StreamExt;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use tokio::sync::mpsc::UnboundedReceiver;
use vigil_core::config::SessionConfig;
use vigil_core::history::port::PacketHistory;
use vigil_core::packet::entity::PacketType;
use vigil_core::session::entity::SessionState;
use vigil_core::store::error::StoreError;
use vigil_core::store::port::PacketJournal;
use vigil_core::transport::port::{Inbound, Transport};
use vigil_session::{ChannelHandler, Session, SessionEvent};
use vigil_store::journal::SqlitePacketJournal;

const POLL: Duration = Duration::from_millis(10);

async fn next(rx: &mut UnboundedReceiver<SessionEvent>) -> Option<SessionEvent> {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .ok()
        .flatten()
}

#[tokio::test]
async fn test_history_is_newest_first() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let journal = SqlitePacketJournal::open_in(dir.path(), "vigil", "packets", POLL).await?;

    for i in 1..=5 {
        journal
            .append(PacketType::LiveResult, &json!({"deployId": format!("L-{}", i)}).to_string())
            .await?;
    }
    journal.append(PacketType::LiveNode, r#"{"algorithmId":"a"}"#).await?;

    let latest = journal.latest(PacketType::LiveResult).await?.expect("a live result");
    assert!(latest.message.contains("L-5"));
    assert_eq!(latest.packet_type, PacketType::LiveResult);
    assert!(journal.latest(PacketType::AlgorithmStatus).await?.is_none());

    let recent = journal.recent(PacketType::LiveResult, 3).await?;
    let ids = recent
        .iter()
        .map(|p| serde_json::from_str::<serde_json::Value>(&p.message).map(|v| v["deployId"].clone()))
        .collect::<Result<Vec<_>, _>>()?;
    assert_eq!(ids, vec![json!("L-5"), json!("L-4"), json!("L-3")]);
    Ok(())
}

#[tokio::test]
async fn test_invalid_collection_is_rejected() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let result = SqlitePacketJournal::open_in(dir.path(), "vigil", "packets--x", POLL).await;
    assert!(matches!(result, Err(StoreError::InvalidName(_))));
    Ok(())
}

#[tokio::test]
async fn test_change_feed_starts_after_existing_rows() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let journal = SqlitePacketJournal::open_in(dir.path(), "vigil", "packets", POLL).await?;
    journal.append(PacketType::Log, r#"{"message":"old"}"#).await?;

    let Inbound::Changes(mut feed) = journal.open().await? else {
        anyhow::bail!("expected a change feed");
    };
    for i in 0..3 {
        journal
            .append(PacketType::Log, &json!({"message": format!("new-{}", i)}).to_string())
            .await?;
    }

    for i in 0..3 {
        let document = tokio::time::timeout(Duration::from_secs(2), feed.next())
            .await?
            .expect("feed ended")?;
        assert_eq!(document.packet_type, "Log");
        assert!(document.message.contains(&format!("new-{}", i)));
    }
    Ok(())
}

/// # Summary
/// A session fed by the journal replays history, then follows new rows.
#[tokio::test]
async fn test_session_over_journal() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let journal = Arc::new(SqlitePacketJournal::open_in(dir.path(), "vigil", "live_1", POLL).await?);
    journal
        .append(PacketType::AlgorithmStatus, r#"{"algorithmId":"a1","status":"Running"}"#)
        .await?;

    let (handler, mut rx) = ChannelHandler::new();
    let session = Session::new(SessionConfig::default(), journal.clone(), Arc::new(handler))?;
    session.load_recent(journal.as_ref()).await?;
    session.subscribe().await?;

    assert_eq!(next(&mut rx).await, Some(SessionEvent::StateChanged(SessionState::Subscribed)));
    assert!(matches!(next(&mut rx).await, Some(SessionEvent::AlgorithmStatus(_))));

    // let the listener open its feed before appending
    tokio::time::sleep(Duration::from_millis(100)).await;
    journal.append(PacketType::Log, r#"{"message":"live line"}"#).await?;
    match next(&mut rx).await {
        Some(SessionEvent::Log { text, .. }) => assert_eq!(text, "live line"),
        other => anyhow::bail!("unexpected event {:?}", other),
    }

    session.dispose().await;
    Ok(())
}
