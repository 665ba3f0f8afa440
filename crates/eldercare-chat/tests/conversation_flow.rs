//! End-to-end flows through the shell: parent check-ins feeding the child
//! dashboard, with scripted model backends and devices.

use std::sync::Arc;

use eldercare_chat::device::PickedFile;
use eldercare_chat::mock::{MockBackend, MockGeolocator, MockMicrophone};
use eldercare_chat::{
    ConversationState, Outgoing, SendOutcome, Shell, CONNECTION_ERROR_FALLBACK,
    EMPTY_REPLY_FALLBACK,
};
use eldercare_core::config::ElderCareConfig;
use eldercare_core::types::{GeoLocation, MediaKind, Speaker, UserRole};

// =============================================================================
// Helpers
// =============================================================================

fn make_shell(backend: Arc<MockBackend>) -> Shell {
    Shell::from_config(
        &ElderCareConfig::default(),
        backend,
        Arc::new(MockMicrophone::with_chunks(vec![b"voice".to_vec()])),
        Arc::new(MockGeolocator::at(28.61, 77.21)),
    )
}

fn picked(name: &str, mime_type: &str, bytes: &[u8]) -> PickedFile {
    PickedFile {
        name: name.to_string(),
        mime_type: mime_type.to_string(),
        bytes: bytes.to_vec(),
    }
}

// =============================================================================
// Parent conversation
// =============================================================================

#[tokio::test]
async fn test_each_send_adds_exactly_two_messages_in_order() {
    let shell = make_shell(Arc::new(MockBackend::echo()));
    let parent = shell.parent();

    let texts = ["Good morning", "I had idli", "Going for a walk"];
    for (i, text) in texts.iter().enumerate() {
        let before = parent.messages().len();
        parent.send(Outgoing::text(*text)).await;
        let msgs = parent.messages();
        assert_eq!(msgs.len(), before + 2, "send #{}", i);
        assert_eq!(msgs[before].speaker, Speaker::User);
        assert_eq!(msgs[before].content, *text);
        assert_eq!(msgs[before + 1].speaker, Speaker::Assistant);
    }
}

#[tokio::test]
async fn test_empty_send_is_noop() {
    let backend = Arc::new(MockBackend::echo());
    let shell = make_shell(backend.clone());

    let outcome = shell.parent().send(Outgoing::text("   ")).await;
    assert_eq!(outcome, SendOutcome::Skipped);
    assert_eq!(shell.parent().messages().len(), 1);
    assert_eq!(backend.call_count(), 0);
    assert!(shell.activity_log().is_empty());
}

#[tokio::test]
async fn test_second_attachment_replaces_first() {
    let backend = Arc::new(MockBackend::reply("Lovely photo"));
    let shell = make_shell(backend.clone());
    let parent = shell.parent();

    parent
        .attach_file(picked("garden.png", "image/png", b"first"))
        .await
        .unwrap();
    parent
        .attach_file(picked("temple.jpg", "image/jpeg", b"second"))
        .await
        .unwrap();

    parent.send(Outgoing::text("See this")).await;
    let sent = &parent.messages()[1];
    let media = sent.media.as_ref().unwrap();
    assert_eq!(media.kind, MediaKind::Image);
    assert_eq!(media.subtype, "jpeg");
    assert_eq!(media.decode().unwrap(), b"second");
    assert!(parent.pending_media().is_none());

    let log = shell.activity_log();
    assert_eq!(log.len(), 1);
    assert!(log[0].media.is_some());
}

#[tokio::test]
async fn test_share_location_ignores_draft() {
    let shell = make_shell(Arc::new(MockBackend::reply("Thank you")));
    let parent = shell.parent();
    parent.set_draft("half typed thought");

    let outcome = parent.share_location().await.unwrap();
    let user = match outcome {
        SendOutcome::Completed { user, .. } => user,
        other => panic!("unexpected outcome {:?}", other),
    };
    assert_eq!(user.content, "I am sharing my current location.");
    assert_eq!(user.location, Some(GeoLocation::new(28.61, 77.21)));
}

#[tokio::test]
async fn test_failing_backend_apologizes_and_returns_to_idle() {
    let shell = make_shell(Arc::new(MockBackend::failing()));
    let parent = shell.parent();

    for text in ["hello", "are you there?"] {
        parent.send(Outgoing::text(text)).await;
        let last = parent.messages().pop().unwrap();
        assert_eq!(last.content, CONNECTION_ERROR_FALLBACK);
        assert_eq!(parent.state(), ConversationState::Idle);
    }
}

#[tokio::test]
async fn test_empty_backend_reply_uses_fallback() {
    let shell = make_shell(Arc::new(MockBackend::empty()));
    shell.parent().send(Outgoing::text("hello")).await;
    let last = shell.parent().messages().pop().unwrap();
    assert_eq!(last.content, EMPTY_REPLY_FALLBACK);
}

#[tokio::test]
async fn test_voice_note_flow() {
    let backend = Arc::new(MockBackend::reply("I heard you"));
    let shell = make_shell(backend.clone());
    let parent = shell.parent();

    parent.start_recording().await.unwrap();
    assert!(parent.is_recording());
    let media = parent.stop_recording().await.unwrap();
    assert_eq!(media.mime_type(), "audio/webm");

    let outcome = parent.send_draft().await;
    assert!(matches!(outcome, SendOutcome::Completed { .. }));
    assert_eq!(shell.dashboard().summary().media_count, 1);
}

#[tokio::test]
async fn test_emergency_message_bypasses_model() {
    let backend = Arc::new(MockBackend::reply("should not be used"));
    let shell = make_shell(backend.clone());

    shell
        .parent()
        .send(Outgoing::text("I have severe chest pain"))
        .await;
    let last = shell.parent().messages().pop().unwrap();
    assert!(last.content.contains("108"));
    assert_eq!(backend.call_count(), 0);
}

// =============================================================================
// Dashboard
// =============================================================================

#[tokio::test]
async fn test_dashboard_last_seen_is_most_recent_location() {
    let shell = make_shell(Arc::new(MockBackend::reply("ok")));
    let parent = shell.parent();
    let a = GeoLocation::new(1.0, 1.0);
    let b = GeoLocation::new(2.0, 2.0);

    parent
        .send(Outgoing {
            text: Some("at home".to_string()),
            location: Some(a),
            ..Outgoing::default()
        })
        .await;
    parent.send(Outgoing::text("no location here")).await;
    parent
        .send(Outgoing {
            text: Some("at the park".to_string()),
            location: Some(b),
            ..Outgoing::default()
        })
        .await;

    shell.switch_role(UserRole::Child);
    assert_eq!(shell.dashboard().summary().last_location, Some(b));
}

#[tokio::test]
async fn test_dashboard_update_while_pending_is_noop() {
    let backend = Arc::new(MockBackend::reply("Dad is doing well").gated());
    let shell = Arc::new(make_shell(backend.clone()));
    shell.switch_role(UserRole::Child);

    let first = {
        let shell = Arc::clone(&shell);
        tokio::spawn(async move { shell.dashboard().request_update(None).await })
    };
    backend.wait_for_calls(1).await;

    assert_eq!(
        shell.dashboard().request_update(Some("Any news?")).await,
        None
    );
    assert_eq!(backend.call_count(), 1);

    backend.release();
    assert_eq!(
        first.await.unwrap().as_deref(),
        Some("Dad is doing well")
    );
    assert_eq!(backend.call_count(), 1);
}

#[tokio::test]
async fn test_dashboard_sees_recent_parent_activity() {
    let backend = Arc::new(MockBackend::echo());
    let shell = make_shell(backend.clone());

    for text in ["one", "two", "three", "four", "five", "six"] {
        shell.parent().send(Outgoing::text(text)).await;
    }

    let answer = shell.dashboard().request_update(None).await.unwrap();
    assert!(answer.starts_with("Activity Log:\nParent: two\n"));
    assert!(answer.contains("Parent: six\n\nQuestion: What is today's status?"));
    assert!(!answer.contains("Parent: one"));

    let timeline = shell.dashboard().summary().timeline;
    assert_eq!(timeline.len(), 5);
    assert_eq!(timeline[0].content, "six");
}
