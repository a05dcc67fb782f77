// SPDX-FileCopyrightText: 2026 Morpho Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests driving the full agent loop over mock adapters:
//! inject channel updates, assert on the replies the bot would deliver.

use std::sync::Arc;
use std::time::Duration;

use morpho_agent::AgentLoop;
use morpho_config::MorphoConfig;
use morpho_core::ChannelAdapter;
use morpho_core::types::{Command, InboundPayload, InboundUpdate, ReplyBody};
use morpho_test_utils::{
    MockChannel, MockSwapEngine, command_update, photo_update, sample_catalog,
    temp_account_store, test_policy,
};
use tokio_util::sync::CancellationToken;

struct Harness {
    channel: Arc<MockChannel>,
    accounts: Arc<morpho_accounts::AccountStore>,
    cancel: CancellationToken,
    loop_handle: tokio::task::JoinHandle<()>,
    _dirs: (tempfile::TempDir, tempfile::TempDir),
}

impl Harness {
    async fn start(starter_quota: i64, engine: MockSwapEngine) -> Self {
        let (accounts, db_dir) = temp_account_store(test_policy(starter_quota)).await;
        let (catalog, catalog_dir) = sample_catalog();
        let channel = Arc::new(MockChannel::new());

        let mut config = MorphoConfig::default();
        config.catalog.custom_targets_dir = catalog_dir
            .path()
            .join("custom")
            .to_string_lossy()
            .into_owned();

        let agent = AgentLoop::new(
            channel.clone() as Arc<dyn ChannelAdapter>,
            accounts.clone(),
            catalog,
            Arc::new(engine),
            config,
        );

        let cancel = CancellationToken::new();
        let loop_cancel = cancel.clone();
        let loop_handle = tokio::spawn(async move {
            agent.run(loop_cancel).await.expect("agent loop failed");
        });

        Self {
            channel,
            accounts,
            cancel,
            loop_handle,
            _dirs: (db_dir, catalog_dir),
        }
    }

    async fn inject(&self, update: InboundUpdate) {
        self.channel.inject_update(update).await;
    }

    async fn stop(self) {
        self.cancel.cancel();
        self.loop_handle.await.expect("agent loop panicked");
    }
}

fn is_photo(body: &ReplyBody) -> bool {
    matches!(body, ReplyBody::Photo { .. })
}

fn text_of(body: &ReplyBody) -> &str {
    match body {
        ReplyBody::Text(t) => t,
        ReplyBody::Photo { caption, .. } => caption.as_deref().unwrap_or(""),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn start_command_greets_and_shows_menu() {
    let harness = Harness::start(10, MockSwapEngine::new()).await;

    harness.inject(command_update("u1", Command::Start)).await;
    let sent = harness.channel.wait_for_sent(2).await;

    assert!(text_of(&sent[0].body).contains("10 swaps"));
    assert!(text_of(&sent[1].body).contains("art"));
    assert!(text_of(&sent[1].body).contains("memes"));

    harness.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn full_swap_flow_charges_and_delivers_photo() {
    let harness = Harness::start(2, MockSwapEngine::new()).await;

    harness
        .inject(command_update("u1", Command::SelectCategory("art".into())))
        .await;
    let sent = harness.channel.wait_for_sent(1).await;
    // Category selection replies with the collage photo.
    assert!(is_photo(&sent[0].body));
    harness.channel.clear_sent().await;

    harness.inject(photo_update("u1", b"selfie")).await;
    let sent = harness.channel.wait_for_sent(1).await;
    assert!(is_photo(&sent[0].body));
    assert!(text_of(&sent[0].body).contains("1 swaps left"));

    let account = harness.accounts.get_or_create("u1").await.unwrap();
    assert_eq!(account.quota_remaining, 1);

    harness.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn exhausted_user_is_told_to_upgrade() {
    let harness = Harness::start(1, MockSwapEngine::new()).await;

    harness
        .inject(command_update("u1", Command::SelectCategory("art".into())))
        .await;
    harness.inject(photo_update("u1", b"selfie")).await;
    harness.channel.wait_for_sent(2).await;
    harness.channel.clear_sent().await;

    harness.inject(photo_update("u1", b"selfie")).await;
    let sent = harness.channel.wait_for_sent(1).await;
    assert!(text_of(&sent[0].body).contains("out of swaps"));

    harness.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn photo_without_category_prompts_selection() {
    let harness = Harness::start(5, MockSwapEngine::new()).await;

    harness.inject(photo_update("u1", b"selfie")).await;
    let sent = harness.channel.wait_for_sent(1).await;
    assert!(text_of(&sent[0].body).contains("category"));

    let account = harness.accounts.get_or_create("u1").await.unwrap();
    assert_eq!(account.quota_remaining, 5);

    harness.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn premium_upgrade_unlocks_custom_target_upload() {
    let harness = Harness::start(5, MockSwapEngine::new()).await;

    // Free user cannot arm a custom target.
    harness
        .inject(command_update("u1", Command::ArmCustomTarget))
        .await;
    let sent = harness.channel.wait_for_sent(1).await;
    assert!(text_of(&sent[0].body).contains("premium"));
    harness.channel.clear_sent().await;

    harness
        .inject(command_update("u1", Command::BuyPremium))
        .await;
    let sent = harness.channel.wait_for_sent(1).await;
    assert!(text_of(&sent[0].body).contains("105"));
    harness.channel.clear_sent().await;

    harness
        .inject(command_update("u1", Command::ArmCustomTarget))
        .await;
    harness.channel.wait_for_sent(1).await;
    harness.channel.clear_sent().await;

    // The next photo becomes the target, not a swap.
    harness.inject(photo_update("u1", b"target-face")).await;
    let sent = harness.channel.wait_for_sent(1).await;
    assert!(text_of(&sent[0].body).contains("Custom target saved"));

    let account = harness.accounts.get_or_create("u1").await.unwrap();
    assert!(account.custom_target_path.is_some());
    assert!(!account.awaiting_target);
    // Target uploads are not swaps and are never charged.
    assert_eq!(account.quota_remaining, 105);

    harness.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn superseding_command_discards_the_swap_result() {
    let engine = MockSwapEngine::new().with_delay(Duration::from_millis(200));
    let harness = Harness::start(5, engine).await;

    harness
        .inject(command_update("u1", Command::SelectCategory("art".into())))
        .await;
    harness.channel.wait_for_sent(1).await;
    harness.channel.clear_sent().await;

    // Photo starts a slow swap; the status command supersedes it.
    harness.inject(photo_update("u1", b"selfie")).await;
    harness.inject(command_update("u1", Command::Status)).await;

    // The status reply arrives; the swap result must be discarded.
    tokio::time::sleep(Duration::from_millis(500)).await;
    let sent = harness.channel.sent_replies().await;
    assert!(sent.iter().any(|r| text_of(&r.body).contains("Tier:")));
    assert!(
        !sent.iter().any(|r| is_photo(&r.body)),
        "superseded swap result must not be delivered"
    );

    // The reservation still ran to completion: charged and released.
    let account = harness.accounts.get_or_create("u1").await.unwrap();
    assert_eq!(account.quota_remaining, 4);
    assert!(!harness.accounts.has_pending("u1"));

    harness.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unknown_text_gets_the_usage_hint() {
    let harness = Harness::start(5, MockSwapEngine::new()).await;

    let update = InboundUpdate {
        payload: InboundPayload::Text("what do I do".into()),
        ..photo_update("u1", b"")
    };
    harness.inject(update).await;
    let sent = harness.channel.wait_for_sent(1).await;
    assert!(text_of(&sent[0].body).contains("/help"));

    harness.stop().await;
}
