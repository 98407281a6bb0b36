use crate::utils::*;
use wave_portal::{ErrorKind, WaveError, WaveFeed};

#[tokio::test]
async fn refresh_before_connect() {
    let wallet = MockWallet::new(ALICE);
    let chain = MockChain::with_waves(vec![wave(BOB, "hi", 1)]);
    let session = session(&wallet, &chain);

    let err = session.refresh().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(*session.feed(), WaveFeed::default());
    assert_eq!(chain.refreshes(), 0);
}

#[tokio::test]
async fn refresh_without_wallet() {
    let wallet = MockWallet::absent();
    let chain = MockChain::with_waves(vec![wave(BOB, "hi", 1)]);
    let session = session(&wallet, &chain);

    assert_eq!(session.refresh().await, Err(WaveError::NoWalletProvider));
    assert_eq!(chain.refreshes(), 0);
}

#[tokio::test]
async fn failed_refresh_keeps_snapshot() {
    let wallet = MockWallet::authorized(ALICE);
    let chain = MockChain::with_waves(vec![wave(BOB, "one", 1), wave(ALICE, "two", 2)]);
    let session = session(&wallet, &chain);
    session.restore().await.unwrap();
    let before = session.feed();
    assert_eq!(before.len(), 2);

    let mut feed = session.watch_feed();
    feed.borrow_and_update();
    chain.fail_reads(true);
    let err = session.refresh().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NetworkError);
    assert!(!feed.has_changed().unwrap());
    assert_eq!(session.feed(), before);

    chain.fail_reads(false);
    session.refresh().await.unwrap();
    assert!(feed.has_changed().unwrap());
    assert_eq!(session.feed().records, before.records);
}

#[tokio::test]
async fn connect_survives_failed_refresh() {
    let wallet = MockWallet::new(ALICE);
    let chain = MockChain::new();
    chain.fail_reads(true);
    let session = session(&wallet, &chain);

    assert_eq!(session.connect().await, Ok(ALICE));
    assert_eq!(session.feed().total_count, None);
}

#[tokio::test]
async fn mined_wave_with_failed_refresh_settles() {
    let wallet = MockWallet::new(ALICE);
    let chain = MockChain::new();
    let session = session(&wallet, &chain);
    session.connect().await.unwrap();
    chain.fail_reads(true);

    assert!(session.submit_wave("hello").await.is_ok());
    assert_eq!(session.lifecycle().phase, wave_portal::Phase::Idle);
    assert!(session.feed().is_empty());

    chain.fail_reads(false);
    session.refresh().await.unwrap();
    assert_eq!(session.feed().records[0].message, "hello");
}

#[tokio::test]
async fn display_preserves_order() {
    let wallet = MockWallet::authorized(ALICE);
    let chain = MockChain::with_waves(vec![
        wave(BOB, "older", 1_650_000_000),
        wave(ALICE, "newer", 1_650_000_060),
    ]);
    let session = session(&wallet, &chain);
    session.restore().await.unwrap();

    let lines: Vec<String> = session.feed().display().iter().map(ToString::to_string).collect();
    similar_asserts::assert_eq!(
        lines,
        vec![
            "[Fri, 15 Apr 2022 05:20:00 +0000] 0x7099…79C8: older".to_string(),
            "[Fri, 15 Apr 2022 05:21:00 +0000] 0xf39F…2266: newer".to_string(),
        ]
    );
}
