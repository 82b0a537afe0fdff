//! Several clients driving one game through the server layer.

use std::collections::BTreeSet;
use std::time::Duration;
use warrens::{EngineConfig, Intent, LocalServer, RemoteServer, Server, WarrensResult};

const TURNS_PER_CLIENT: u64 = 25;

async fn wait_many(mut client: LocalServer) -> WarrensResult<Vec<u64>> {
    client.connect().await?;
    let mut turns = Vec::new();
    for _ in 0..TURNS_PER_CLIENT {
        let response = client.process(Intent::Wait).await?;
        assert!(response.accepted, "wait refused: {:?}", response.reason);
        turns.push(response.snapshot.turn);
    }
    client.stop().await?;
    Ok(turns)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_clients_take_distinct_turns() -> WarrensResult<()> {
    let mut host = LocalServer::start(&EngineConfig::for_testing(616))?;
    host.connect().await?;

    let first = tokio::spawn(wait_many(host.join()));
    let second = tokio::spawn(wait_many(host.join()));
    let first = first.await.expect("client task panicked")?;
    let second = second.await.expect("client task panicked")?;

    for turns in [&first, &second] {
        assert!(turns.windows(2).all(|w| w[0] < w[1]), "turns out of order: {:?}", turns);
    }
    let all: BTreeSet<u64> = first.iter().chain(second.iter()).copied().collect();
    let expected: BTreeSet<u64> = (1..=2 * TURNS_PER_CLIENT).collect();
    assert_eq!(all, expected);

    let snapshot = host.snapshot().await?;
    assert_eq!(snapshot.turn, 2 * TURNS_PER_CLIENT);
    host.stop().await
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_remote_and_local_clients_share_the_game() -> WarrensResult<()> {
    let config = EngineConfig::for_testing(1717);
    let mut host = LocalServer::start(&config)?;
    let addr = host.listen("127.0.0.1:0").await?;
    host.connect().await?;

    let mut remote = RemoteServer::new(addr.to_string(), config.server.clone());
    let welcome = remote.connect().await?;
    assert_eq!(welcome.turn, 0);

    let response = remote.process(Intent::Wait).await?;
    assert!(response.accepted);
    assert_eq!(host.snapshot().await?.turn, 1);

    host.process(Intent::Wait).await?;
    assert_eq!(remote.snapshot().await?.turn, 2);

    remote.put_game_message("Anyone down here?").await?;
    let mut heard = Vec::new();
    while let Some(text) = host.receive(Duration::from_secs(2)).await {
        let done = text == "Anyone down here?";
        heard.push(text);
        if done {
            break;
        }
    }
    assert_eq!(heard.last().map(String::as_str), Some("Anyone down here?"));

    remote.stop().await?;
    host.stop().await
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_queued_game_messages_reach_remote_clients_once() -> WarrensResult<()> {
    const WELCOME: &str = "Welcome to the warrens. Find the way out below.";
    let config = EngineConfig::for_testing(2929);
    let mut host = LocalServer::start(&config)?;
    let addr = host.listen("127.0.0.1:0").await?;

    let mut remote = RemoteServer::new(addr.to_string(), config.server.clone());
    remote.connect().await?;
    assert!(remote.process(Intent::Wait).await?.accepted);

    let mut heard = Vec::new();
    while let Some(text) = remote.receive(Duration::from_secs(2)).await {
        let done = text == WELCOME;
        heard.push(text);
        if done {
            break;
        }
    }
    assert_eq!(heard.last().map(String::as_str), Some(WELCOME));

    assert!(remote.process(Intent::Wait).await?.accepted);
    while let Some(text) = remote.receive(Duration::from_millis(300)).await {
        assert_ne!(text, WELCOME);
    }

    remote.stop().await?;
    host.stop().await
}

#[tokio::test]
async fn test_remote_without_host_fails_to_connect() {
    let config = EngineConfig::for_testing(1);
    // port 9 (discard) is almost never served on loopback
    let mut remote = RemoteServer::new("127.0.0.1:9", config.server);
    assert!(remote.connect().await.is_err());
    assert!(!remote.is_connected());
}
