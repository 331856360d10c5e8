#![cfg(unix)]

mod common;

use app_audio_switcher::action::{ActionId, ActionSelection, Controller};
use app_audio_switcher::host::{HostEvent, MemoryHost};
use app_audio_switcher::plugin::{LinkState, Plugin};
use common::*;

fn appear(id: &str, controller: Controller) -> HostEvent {
    HostEvent::WillAppear {
        context: ActionId::new(id),
        controller,
        settings: ActionSelection::with_devices(["A", "B"]),
    }
}

fn disappear(id: &str) -> HostEvent {
    HostEvent::WillDisappear {
        context: ActionId::new(id),
    }
}

#[tokio::test]
async fn test_two_actions_share_one_worker_for_their_lifetime() {
    let fake = FakeWorker::bind().await;
    let mut plugin = Plugin::new(&fake.config(), MemoryHost::new());

    plugin.handle_host_event(appear("key", Controller::Keypad)).await;
    assert_eq!(plugin.link_state(), LinkState::Ready);
    let pid = plugin.worker().supervisor().pid();
    assert!(pid.is_some());

    let mut peer = fake.accept().await;
    peer.expect("--get devices").await;

    plugin.handle_host_event(appear("dial", Controller::Encoder)).await;
    peer.expect("--get devices").await;
    assert_eq!(plugin.worker().connect_count(), 1);
    assert_eq!(plugin.worker().supervisor().pid(), pid);

    peer.reply(&devices_message()).await;
    step_until(&mut plugin, |p| p.store().devices().len() == 3).await;
    peer.expect("--get focused --icon").await;

    peer.reply(&focused_message(4321, "game.exe", "B")).await;
    step_until(&mut plugin, |p| p.store().focus().is_some()).await;

    let key = ActionId::new("key");
    let dial = ActionId::new("dial");
    assert_eq!(plugin.host().titles_for(&key), vec!["game.exe"]);
    assert_eq!(plugin.host().titles_for(&dial), vec!["game.exe"]);
    assert_eq!(
        plugin.host().feedback_for(&dial)[0].value.as_deref(),
        Some("Headphones")
    );

    plugin.handle_host_event(disappear("key")).await;
    assert_eq!(plugin.worker().supervisor().pid(), pid);
    assert!(plugin.worker().has_connection());

    plugin.handle_host_event(disappear("dial")).await;
    assert_eq!(plugin.link_state(), LinkState::Unbound);
    assert!(plugin.worker().supervisor().pid().is_none());
    assert!(peer.read_to_close().await.ends_with("close"));
}

#[tokio::test]
async fn test_concatenated_replies_are_handled_separately() {
    let fake = FakeWorker::bind().await;
    let mut plugin = Plugin::new(&fake.config(), MemoryHost::new());

    plugin.handle_host_event(appear("dial", Controller::Encoder)).await;
    let mut peer = fake.accept().await;
    peer.expect("--get devices").await;

    let both = format!(
        "{}{}",
        devices_message(),
        focused_message(77, "player.exe", "A")
    );
    let (head, tail) = both.split_at(both.len() / 2);
    peer.reply_raw(head).await;
    peer.reply_raw(tail).await;

    step_until(&mut plugin, |p| p.store().focus().is_some()).await;
    assert_eq!(plugin.store().devices().len(), 3);
    assert_eq!(
        plugin.host().titles_for(&ActionId::new("dial")),
        vec!["player.exe"]
    );
    peer.expect("--get focused --icon").await;

    plugin.shutdown().await;
}

#[tokio::test]
async fn test_lost_socket_reconnects_on_next_poll() {
    let fake = FakeWorker::bind().await;
    let config = app_audio_switcher::config::Config {
        focus_poll_ms: Some(50),
        ..fake.config()
    };
    let mut plugin = Plugin::new(&config, MemoryHost::new());

    plugin.handle_host_event(appear("key", Controller::Keypad)).await;
    assert!(plugin.is_polling());
    let pid = plugin.worker().supervisor().pid();

    let peer = fake.accept().await;
    drop(peer);
    step_until(&mut plugin, |p| p.link_state() == LinkState::Disconnected).await;

    // the poll tick opens a fresh socket to the same process
    step_until(&mut plugin, |p| p.link_state() == LinkState::Ready).await;
    let mut peer = fake.accept().await;
    peer.expect("--get focused").await;

    assert_eq!(plugin.worker().connect_count(), 2);
    assert_eq!(plugin.worker().supervisor().pid(), pid);

    plugin.shutdown().await;
    assert!(!plugin.is_polling());
}

#[tokio::test]
async fn test_appear_after_teardown_relaunches() {
    let fake = FakeWorker::bind().await;
    let mut plugin = Plugin::new(&fake.config(), MemoryHost::new());

    plugin.handle_host_event(appear("key", Controller::Keypad)).await;
    let first_pid = plugin.worker().supervisor().pid();
    let peer = fake.accept().await;
    plugin.handle_host_event(disappear("key")).await;
    assert!(peer.read_to_close().await.ends_with("close"));

    plugin.handle_host_event(appear("key", Controller::Keypad)).await;
    assert_eq!(plugin.link_state(), LinkState::Ready);
    let second_pid = plugin.worker().supervisor().pid();
    assert!(second_pid.is_some());
    assert_ne!(first_pid, second_pid);

    let mut peer = fake.accept().await;
    peer.expect("--get devices").await;
    plugin.shutdown().await;
}

#[tokio::test]
async fn test_failed_send_marks_link_disconnected() {
    let fake = FakeWorker::bind().await;
    let mut plugin = Plugin::new(&fake.config(), MemoryHost::new());

    plugin.handle_host_event(appear("dial", Controller::Encoder)).await;
    assert_eq!(plugin.link_state(), LinkState::Ready);
    let peer = fake.accept().await;

    // socket lost and control port gone, so the follow-up cannot be delivered
    assert!(plugin.worker_mut().handle_disconnect(1));
    drop(peer);
    drop(fake);

    plugin
        .handle_worker_frame(&devices_message().to_string())
        .await;
    assert_eq!(plugin.store().devices().len(), 3);
    assert!(!plugin.worker().has_connection());
    assert_eq!(plugin.link_state(), LinkState::Disconnected);

    plugin.shutdown().await;
}
