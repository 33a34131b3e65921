// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the conversation engine over a real SQLite store.

use std::sync::Arc;

use intake_config::IntakeConfig;
use intake_conversation::{ConversationEngine, Outcome, Rejection};
use intake_core::{InboundEvent, MessageHandle, OrderStore, Step, UserId};
use intake_test_utils::{MockTransport, TestHarness, UnavailableStore, OPERATOR};

const U1: UserId = UserId(101);
const U2: UserId = UserId(202);

async fn started(harness: &TestHarness, user: UserId) -> intake_core::OrderId {
    match harness.entry(user, Some("alex_tg")).await {
        Outcome::Started { order_id, .. } => order_id,
        other => panic!("expected Started, got {other:?}"),
    }
}

#[tokio::test]
async fn full_conversation_creates_complete_order_and_notifies() {
    let harness = TestHarness::new().await.unwrap();
    let store = harness.store();

    let order_id = started(&harness, U1).await;
    assert_eq!(order_id.0, 1);
    assert_eq!(store.get_step(order_id).await.unwrap(), Step::AwaitConsent);

    assert_eq!(
        harness.consent(U1).await,
        Outcome::Advanced {
            order_id,
            step: Step::AskName
        }
    );
    assert_eq!(
        harness.transport().texts_to(U1).await.last().map(String::as_str),
        Some("How should I address you?")
    );

    assert_eq!(
        harness.text(U1, "Alex").await,
        Outcome::Advanced {
            order_id,
            step: Step::AskTask
        }
    );
    assert_eq!(
        harness.text(U1, "need a bot").await,
        Outcome::Advanced {
            order_id,
            step: Step::AskContact
        }
    );
    assert_eq!(
        harness.text(U1, "@alex_tg").await,
        Outcome::Completed {
            order_id,
            notified: true
        }
    );

    assert!(store.is_complete(order_id).await.unwrap());
    let order = store.get_order(order_id).await.unwrap().unwrap();
    assert_eq!(order.step, Step::Done);
    assert_eq!(order.name.as_deref(), Some("Alex"));
    assert_eq!(order.task.as_deref(), Some("need a bot"));
    assert_eq!(order.contact.as_deref(), Some("@alex_tg"));
    assert!(harness.engine().sessions().get(U1).is_none());

    let to_operator = harness.transport().texts_to(OPERATOR).await;
    assert_eq!(to_operator.len(), 1);
    assert!(to_operator[0].contains("#1"));
    assert!(to_operator[0].contains("need a bot"));
}

#[tokio::test]
async fn welcome_carries_consent_button_and_cleans_up() {
    let harness = TestHarness::new().await.unwrap();
    started(&harness, U1).await;

    let sent = harness.transport().sent_messages().await;
    // Wait indicator, then the welcome.
    assert_eq!(sent[0].text, "⏳");
    let welcome = &sent[1];
    assert_eq!(welcome.buttons.len(), 1);
    assert_eq!(welcome.buttons[0].payload, "yes");

    // The user's command and the wait indicator are both deleted.
    let deleted = harness.transport().deleted().await;
    assert_eq!(deleted.len(), 2);
    assert!(deleted.iter().any(|h| h.id.starts_with("in-")));
    assert!(deleted.iter().any(|h| h.id.starts_with("mock-")));
}

#[tokio::test]
async fn text_before_consent_asks_for_button() {
    let harness = TestHarness::new().await.unwrap();
    let order_id = started(&harness, U1).await;

    assert_eq!(
        harness.text(U1, "hello?").await,
        Outcome::Rejected(Rejection::ButtonExpected)
    );
    assert_eq!(
        harness.store().get_step(order_id).await.unwrap(),
        Step::AwaitConsent
    );
    let order = harness.store().get_order(order_id).await.unwrap().unwrap();
    assert!(order.name.is_none());
}

#[tokio::test]
async fn media_is_rejected_at_every_active_step() {
    let harness = TestHarness::new().await.unwrap();
    let order_id = started(&harness, U1).await;

    for advance in ["consent", "Alex", "need a bot"] {
        let before = harness.store().get_order(order_id).await.unwrap().unwrap();
        assert_eq!(
            harness.media(U1).await,
            Outcome::Rejected(Rejection::MediaNotAccepted)
        );
        let after = harness.store().get_order(order_id).await.unwrap().unwrap();
        assert_eq!(before, after);
        assert_eq!(
            harness.transport().texts_to(U1).await.last().map(String::as_str),
            Some("This bot does not accept files!")
        );

        if advance == "consent" {
            harness.consent(U1).await;
        } else {
            harness.text(U1, advance).await;
        }
    }
    assert_eq!(
        harness.store().get_step(order_id).await.unwrap(),
        Step::AskContact
    );
}

#[tokio::test]
async fn input_without_session_points_to_entry_command() {
    let harness = TestHarness::new().await.unwrap();

    assert_eq!(
        harness.text(U1, "hi").await,
        Outcome::Rejected(Rejection::NoSession)
    );
    assert_eq!(
        harness.media(U1).await,
        Outcome::Rejected(Rejection::NoSession)
    );
    assert_eq!(
        harness.consent(U1).await,
        Outcome::Rejected(Rejection::NoSession)
    );

    let texts = harness.transport().texts_to(U1).await;
    assert_eq!(texts, vec!["Press /start first!"; 3]);
    assert!(harness.store().list_orders(&Default::default()).await.unwrap().is_empty());
    // Both user messages were removed; callbacks carry none.
    assert_eq!(harness.transport().deleted().await.len(), 2);
}

#[tokio::test]
async fn repeated_or_foreign_callbacks_are_ignored() {
    let harness = TestHarness::new().await.unwrap();
    let order_id = started(&harness, U1).await;

    let foreign = harness
        .dispatch(intake_core::InboundEvent::Callback {
            user: U1,
            payload: "maybe".into(),
        })
        .await;
    assert_eq!(foreign, Outcome::Ignored);
    assert_eq!(
        harness.store().get_step(order_id).await.unwrap(),
        Step::AwaitConsent
    );

    harness.consent(U1).await;
    harness.text(U1, "Alex").await;
    assert_eq!(harness.consent(U1).await, Outcome::Ignored);
    assert_eq!(
        harness.store().get_step(order_id).await.unwrap(),
        Step::AskTask
    );
}

#[tokio::test]
async fn reentry_mid_flow_abandons_previous_order() {
    let harness = TestHarness::new().await.unwrap();
    let first = started(&harness, U1).await;
    harness.consent(U1).await;
    harness.text(U1, "Alex").await;

    let second = match harness.entry(U1, None).await {
        Outcome::Started {
            order_id,
            abandoned,
        } => {
            assert_eq!(abandoned, Some(first));
            order_id
        }
        other => panic!("expected Started, got {other:?}"),
    };
    assert!(second > first);

    let old = harness.store().get_order(first).await.unwrap().unwrap();
    assert_eq!(old.step, Step::AskTask);
    assert_eq!(old.name.as_deref(), Some("Alex"));

    let new = harness.store().get_order(second).await.unwrap().unwrap();
    assert_eq!(new.step, Step::AwaitConsent);
    assert_eq!(new.username, "0");
    assert_eq!(harness.engine().sessions().get(U1), Some(second));
}

#[tokio::test]
async fn input_after_completion_gets_start_over_guidance() {
    let harness = TestHarness::new().await.unwrap();
    started(&harness, U1).await;
    harness.consent(U1).await;
    for answer in ["Alex", "need a bot", "@alex_tg"] {
        harness.text(U1, answer).await;
    }

    assert_eq!(
        harness.text(U1, "one more thing").await,
        Outcome::Rejected(Rejection::NoSession)
    );
    assert_eq!(harness.store().list_orders(&Default::default()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn notification_failure_leaves_order_done() {
    let harness = TestHarness::new().await.unwrap();
    harness.transport().fail_sends_to(OPERATOR).await;

    let order_id = started(&harness, U1).await;
    harness.consent(U1).await;
    harness.text(U1, "Alex").await;
    harness.text(U1, "need a bot").await;

    assert_eq!(
        harness.text(U1, "@alex_tg").await,
        Outcome::Completed {
            order_id,
            notified: false
        }
    );
    assert_eq!(harness.store().get_step(order_id).await.unwrap(), Step::Done);
    assert!(harness.store().is_complete(order_id).await.unwrap());
}

#[tokio::test]
async fn missing_operator_skips_notification() {
    let harness = TestHarness::builder()
        .with_operator(None)
        .build()
        .await
        .unwrap();

    let order_id = started(&harness, U1).await;
    harness.consent(U1).await;
    harness.text(U1, "Alex").await;
    harness.text(U1, "need a bot").await;
    assert_eq!(
        harness.text(U1, "@alex_tg").await,
        Outcome::Completed {
            order_id,
            notified: false
        }
    );
}

#[tokio::test]
async fn failed_images_fall_back_to_text() {
    let harness = TestHarness::builder()
        .with_welcome_image("/nonexistent/start.png")
        .build()
        .await
        .unwrap();
    harness.transport().fail_media_sends().await;

    started(&harness, U1).await;
    let welcome = harness
        .transport()
        .sent_messages()
        .await
        .into_iter()
        .find(|m| !m.buttons.is_empty())
        .expect("welcome was sent");
    assert!(welcome.media.is_none());
    assert_eq!(welcome.text, harness.config().prompts.welcome);
}

#[tokio::test]
async fn images_are_attached_when_configured() {
    let harness = TestHarness::builder()
        .with_welcome_image("pics/start.png")
        .with_farewell_image("pics/fin.png")
        .build()
        .await
        .unwrap();

    started(&harness, U1).await;
    harness.consent(U1).await;
    for answer in ["Alex", "need a bot", "@alex_tg"] {
        harness.text(U1, answer).await;
    }

    let media: Vec<_> = harness
        .transport()
        .sent_messages()
        .await
        .into_iter()
        .filter_map(|m| m.media)
        .collect();
    assert_eq!(media, vec!["pics/start.png", "pics/fin.png"]);
}

#[tokio::test]
async fn vanished_order_resets_session() {
    let harness = TestHarness::new().await.unwrap();
    // Session pointing at an order that was never stored.
    harness
        .engine()
        .sessions()
        .insert(U1, intake_core::OrderId(999));

    assert_eq!(
        harness.text(U1, "Alex").await,
        Outcome::Failed {
            session_reset: true
        }
    );
    assert!(harness.engine().sessions().get(U1).is_none());
    let last = harness.transport().texts_to(U1).await.pop().unwrap();
    assert!(last.contains("Something went wrong"));
}

#[tokio::test]
async fn users_do_not_interfere() {
    let harness = TestHarness::new().await.unwrap();
    let a = started(&harness, U1).await;
    let b = started(&harness, U2).await;

    harness.consent(U1).await;
    harness.text(U1, "Alex").await;
    harness.consent(U2).await;

    assert_eq!(harness.store().get_step(a).await.unwrap(), Step::AskTask);
    assert_eq!(harness.store().get_step(b).await.unwrap(), Step::AskName);
    let order_b = harness.store().get_order(b).await.unwrap().unwrap();
    assert!(order_b.name.is_none());
}

#[tokio::test]
async fn concurrent_events_for_many_users() {
    let harness = std::sync::Arc::new(TestHarness::new().await.unwrap());

    let mut tasks = Vec::new();
    for n in 0..16 {
        let harness = harness.clone();
        tasks.push(tokio::spawn(async move {
            let user = UserId(1_000 + n);
            harness.entry(user, None).await;
            harness.consent(user).await;
            harness.text(user, &format!("user {n}")).await;
            harness.text(user, "task").await;
            harness.text(user, "contact").await
        }));
    }

    for task in tasks {
        assert!(matches!(
            task.await.unwrap(),
            Outcome::Completed { notified: true, .. }
        ));
    }

    let orders = harness.store().list_orders(&Default::default()).await.unwrap();
    assert_eq!(orders.len(), 16);
    assert!(orders.iter().all(|o| o.is_complete() && o.step == Step::Done));
    assert_eq!(harness.transport().texts_to(OPERATOR).await.len(), 16);
}

#[tokio::test]
async fn sessions_survive_restart() {
    let mut harness = TestHarness::new().await.unwrap();
    let order_id = started(&harness, U1).await;
    harness.consent(U1).await;
    harness.text(U1, "Alex").await;

    harness.restart().await.unwrap();
    assert_eq!(harness.engine().sessions().get(U1), Some(order_id));

    assert_eq!(
        harness.text(U1, "need a bot").await,
        Outcome::Advanced {
            order_id,
            step: Step::AskContact
        }
    );
}

#[tokio::test]
async fn restart_without_restore_forgets_sessions() {
    let mut harness = TestHarness::builder()
        .with_restore_sessions(false)
        .build()
        .await
        .unwrap();
    started(&harness, U1).await;

    harness.restart().await.unwrap();
    assert!(harness.engine().sessions().is_empty());
    assert_eq!(
        harness.text(U1, "Alex").await,
        Outcome::Rejected(Rejection::NoSession)
    );
}

#[tokio::test]
async fn failed_order_creation_still_cleans_up_chat() {
    let transport = Arc::new(MockTransport::new());
    let engine = ConversationEngine::from_config(
        &IntakeConfig::default(),
        Arc::new(UnavailableStore),
        transport.clone(),
    );
    let command = MessageHandle::new(U1, "in-1");

    let outcome = engine
        .dispatch(InboundEvent::EntryCommand {
            user: U1,
            username: Some("alex_tg".into()),
            message: Some(command.clone()),
        })
        .await;
    assert_eq!(
        outcome,
        Outcome::Failed {
            session_reset: false
        }
    );

    // The wait indicator is the first message sent, so it got the first handle.
    let deleted = transport.deleted().await;
    assert!(deleted.contains(&command));
    assert!(deleted.contains(&MessageHandle::new(U1, "mock-1")));
    assert_eq!(
        transport.texts_to(U1).await,
        vec!["⏳", "Something went wrong. Press /start to start over."]
    );
    assert!(engine.sessions().is_empty());
}
