//! Model session lifecycle, tool-call bookkeeping and close semantics.

mod support;

use std::time::Duration;

use conversation::{Role, Turn};
use runtime::model::{ModelCommand, ProviderEvent};
use runtime::{
    AgentConfig, CloseReason, Drain, ModelError, ModelSession, Participant, RoomRef,
    SessionBinding, SessionEvent, SessionState, Submission, ToolOutput, ToolResult,
};
use support::{FakeProvider, fake_model, within};

const CONNECT: Duration = Duration::from_secs(5);

fn session() -> ModelSession {
    ModelSession::new(SessionBinding {
        room: RoomRef::new("lobby"),
        participant: Participant::new("alice"),
    })
}

fn agent() -> AgentConfig {
    AgentConfig {
        instructions: "Be brief.".into(),
        tools: Vec::new(),
    }
}

fn sunny(call_id: &str) -> ToolResult {
    ToolResult::success(call_id, ToolOutput::text("Sunny"))
}

#[tokio::test]
async fn start_connects_and_becomes_active() {
    let (provider, mut model) = fake_model();
    let session = session();
    assert_eq!(session.state(), SessionState::Uninitialized);

    session.start(&provider, &agent(), CONNECT).await.unwrap();
    assert_eq!(session.state(), SessionState::Active);

    let remote = model.accept().await;
    assert_eq!(remote.config.instructions, "Be brief.");
    assert_eq!(remote.binding.participant.identity, "alice");
}

#[tokio::test]
async fn start_twice_is_rejected() {
    let (provider, mut model) = fake_model();
    let session = session();
    session.start(&provider, &agent(), CONNECT).await.unwrap();
    let _remote = model.accept().await;

    let err = session.start(&provider, &agent(), CONNECT).await.unwrap_err();
    assert!(matches!(
        err,
        ModelError::InvalidState {
            state: SessionState::Active,
            ..
        }
    ));
}

#[tokio::test]
async fn refused_connect_closes_session() {
    let session = session();
    let err = session
        .start(&FakeProvider::Refuse, &agent(), CONNECT)
        .await
        .unwrap_err();
    assert!(matches!(err, ModelError::Connect(_)));
    assert_eq!(session.state(), SessionState::Closed);
}

#[tokio::test]
async fn handshake_timeout_closes_session() {
    let session = session();
    let err = session
        .start(&FakeProvider::Hang, &agent(), Duration::from_millis(50))
        .await
        .unwrap_err();
    assert!(matches!(err, ModelError::HandshakeTimeout(_)));
    assert_eq!(session.state(), SessionState::Closed);
}

#[tokio::test]
async fn operations_require_an_active_session() {
    let session = session();
    assert!(matches!(
        session.create_turn(Turn::user("hi")).await,
        Err(ModelError::InvalidState { .. })
    ));
    assert!(matches!(
        session.request_response().await,
        Err(ModelError::InvalidState { .. })
    ));
}

#[tokio::test]
async fn commands_reach_the_model_in_order() {
    let (provider, mut model) = fake_model();
    let session = session();
    session.start(&provider, &agent(), CONNECT).await.unwrap();
    let mut remote = model.accept().await;

    session.create_turn(Turn::assistant("Say hello")).await.unwrap();
    session.request_response().await.unwrap();

    let ModelCommand::CreateTurn(turn) = remote.next_command().await else {
        panic!("expected a turn");
    };
    assert_eq!(turn.text(), "Say hello");
    assert_eq!(remote.next_command().await, ModelCommand::RequestResponse);
}

#[tokio::test]
async fn turns_are_recorded_in_receipt_order() {
    let (provider, mut model) = fake_model();
    let session = session();
    let mut events = session.start(&provider, &agent(), CONNECT).await.unwrap();
    let remote = model.accept().await;

    remote.say("first").await;
    remote
        .emit(ProviderEvent::Turn(Turn::user("second")))
        .await;
    remote.say("third").await;

    for expected in ["first", "second", "third"] {
        let Some(SessionEvent::TurnProduced(turn)) = within(events.recv()).await else {
            panic!("expected a turn");
        };
        assert_eq!(turn.text(), expected);
    }

    let transcript = session.transcript().await;
    let texts: Vec<_> = transcript.iter().map(Turn::text).collect();
    assert_eq!(texts, ["first", "second", "third"]);
    assert_eq!(transcript.turns()[1].role, Role::User);
}

#[tokio::test]
async fn results_may_arrive_out_of_order() {
    let (provider, mut model) = fake_model();
    let session = session();
    let mut events = session.start(&provider, &agent(), CONNECT).await.unwrap();
    let mut remote = model.accept().await;

    remote.call_tool("call_1", "weather", "{}").await;
    remote.call_tool("call_2", "weather", "{}").await;
    for expected in ["call_1", "call_2"] {
        let Some(SessionEvent::ToolCallRequested(call)) = within(events.recv()).await else {
            panic!("expected a tool call");
        };
        assert_eq!(call.call_id, expected);
    }

    assert_eq!(
        session.submit_tool_result(sunny("call_2")).await,
        Submission::Delivered { remaining: 1 }
    );
    assert_eq!(
        session.submit_tool_result(sunny("call_1")).await,
        Submission::Delivered { remaining: 0 }
    );

    for expected in ["call_2", "call_1"] {
        let ModelCommand::SubmitToolResult(result) = remote.next_command().await else {
            panic!("expected a tool result");
        };
        assert_eq!(result.call_id, expected);
    }
}

#[tokio::test]
async fn unknown_and_repeated_results_are_stale() {
    let (provider, mut model) = fake_model();
    let session = session();
    let mut events = session.start(&provider, &agent(), CONNECT).await.unwrap();
    let mut remote = model.accept().await;

    assert_eq!(
        session.submit_tool_result(sunny("call_404")).await,
        Submission::Stale
    );

    remote.call_tool("call_1", "weather", "{}").await;
    within(events.recv()).await;
    assert_eq!(
        session.submit_tool_result(sunny("call_1")).await,
        Submission::Delivered { remaining: 0 }
    );
    assert_eq!(
        session.submit_tool_result(sunny("call_1")).await,
        Submission::Stale
    );

    assert!(matches!(
        remote.next_command().await,
        ModelCommand::SubmitToolResult(_)
    ));
    assert_eq!(remote.command_within(Duration::from_millis(50)).await, None);
}

#[tokio::test]
async fn close_without_pending_calls_is_graceful() {
    let (provider, mut model) = fake_model();
    let session = session();
    session.start(&provider, &agent(), CONNECT).await.unwrap();
    let mut remote = model.accept().await;

    assert_eq!(session.close(Duration::from_secs(1)).await, Drain::Graceful);
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(remote.next_command().await, ModelCommand::Close);

    assert_eq!(
        session.close(Duration::from_secs(1)).await,
        Drain::AlreadyClosed
    );
    assert!(matches!(
        session.create_turn(Turn::user("late")).await,
        Err(ModelError::InvalidState {
            state: SessionState::Closed,
            ..
        })
    ));
}

#[tokio::test]
async fn close_waits_for_pending_results() {
    let (provider, mut model) = fake_model();
    let session = session();
    let mut events = session.start(&provider, &agent(), CONNECT).await.unwrap();
    let mut remote = model.accept().await;

    remote.call_tool("call_1", "weather", "{}").await;
    within(events.recv()).await;

    let closing = {
        let session = session.clone();
        tokio::spawn(async move { session.close(Duration::from_secs(5)).await })
    };

    let mut state = session.subscribe_state();
    within(state.wait_for(|s| *s == SessionState::Closing))
        .await
        .unwrap();

    assert_eq!(
        session.submit_tool_result(sunny("call_1")).await,
        Submission::Delivered { remaining: 0 }
    );
    assert_eq!(within(closing).await.unwrap(), Drain::Graceful);

    assert!(matches!(
        remote.next_command().await,
        ModelCommand::SubmitToolResult(_)
    ));
    assert_eq!(remote.next_command().await, ModelCommand::Close);
}

#[tokio::test]
async fn drain_timeout_forces_close_and_late_results_are_stale() {
    let (provider, mut model) = fake_model();
    let session = session();
    let mut events = session.start(&provider, &agent(), CONNECT).await.unwrap();
    let mut remote = model.accept().await;

    remote.call_tool("call_1", "weather", "{}").await;
    remote.say("Let me check.").await;
    within(events.recv()).await;
    within(events.recv()).await;

    assert_eq!(
        session.close(Duration::from_millis(50)).await,
        Drain::Forced { abandoned: 1 }
    );
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(
        session.submit_tool_result(sunny("call_1")).await,
        Submission::Stale
    );
    assert_eq!(remote.next_command().await, ModelCommand::Close);
    assert_eq!(remote.command_within(Duration::from_millis(50)).await, None);

    let transcript = session.transcript().await;
    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript.turns()[0].text(), "Let me check.");
}

#[tokio::test]
async fn unread_tool_calls_do_not_hold_up_close() {
    let (provider, mut model) = fake_model();
    let session = session();
    let mut events = session.start(&provider, &agent(), CONNECT).await.unwrap();
    let mut remote = model.accept().await;

    remote.call_tool("call_1", "weather", "{}").await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    let drain = tokio::time::timeout(
        Duration::from_secs(1),
        session.close(Duration::from_secs(5)),
    )
    .await;
    assert_eq!(drain, Ok(Drain::Graceful));
    assert_eq!(remote.next_command().await, ModelCommand::Close);

    // Read after close, the call is no longer answerable.
    assert!(matches!(
        events.try_recv(),
        Some(SessionEvent::ToolCallRequested(_))
    ));
    assert_eq!(
        session.submit_tool_result(sunny("call_1")).await,
        Submission::Stale
    );
}

#[tokio::test]
async fn tool_results_do_not_reorder_the_transcript() {
    let (provider, mut model) = fake_model();
    let session = session();
    let mut events = session.start(&provider, &agent(), CONNECT).await.unwrap();
    let mut remote = model.accept().await;

    remote.say("first").await;
    remote.call_tool("call_1", "weather", "{}").await;
    remote.say("second").await;

    assert!(matches!(
        within(events.recv()).await,
        Some(SessionEvent::TurnProduced(_))
    ));
    assert!(matches!(
        within(events.recv()).await,
        Some(SessionEvent::ToolCallRequested(_))
    ));
    assert_eq!(
        session.submit_tool_result(sunny("call_1")).await,
        Submission::Delivered { remaining: 0 }
    );
    remote.say("third").await;

    let mut produced = Vec::new();
    while produced.len() < 2 {
        if let Some(SessionEvent::TurnProduced(turn)) = within(events.recv()).await {
            produced.push(turn.text().to_string());
        }
    }
    assert_eq!(produced, ["second", "third"]);
    assert!(matches!(
        remote.next_command().await,
        ModelCommand::SubmitToolResult(_)
    ));

    let transcript = session.transcript().await;
    let texts: Vec<_> = transcript.iter().map(Turn::text).collect();
    assert_eq!(texts, ["first", "second", "third"]);
}

#[tokio::test]
async fn lost_transport_is_reported_once() {
    let (provider, mut model) = fake_model();
    let session = session();
    let mut events = session.start(&provider, &agent(), CONNECT).await.unwrap();
    drop(model.accept().await);

    assert_eq!(
        within(events.recv()).await,
        Some(SessionEvent::Closed(CloseReason::TransportLost))
    );
    assert_eq!(within(events.recv()).await, None);
    assert_eq!(session.state(), SessionState::Closed);
}

#[tokio::test]
async fn remote_close_carries_its_reason() {
    let (provider, mut model) = fake_model();
    let session = session();
    let mut events = session.start(&provider, &agent(), CONNECT).await.unwrap();
    let remote = model.accept().await;

    remote
        .emit(ProviderEvent::Closed(CloseReason::Remote("server shutdown".into())))
        .await;
    assert_eq!(
        within(events.recv()).await,
        Some(SessionEvent::Closed(CloseReason::Remote(
            "server shutdown".into()
        )))
    );
}

#[tokio::test]
async fn provider_errors_do_not_end_the_session() {
    let (provider, mut model) = fake_model();
    let session = session();
    let mut events = session.start(&provider, &agent(), CONNECT).await.unwrap();
    let remote = model.accept().await;

    remote
        .emit(ProviderEvent::Error("[invalid_request_error] bad".into()))
        .await;
    remote.say("still here").await;

    let Some(SessionEvent::TurnProduced(turn)) = within(events.recv()).await else {
        panic!("expected a turn");
    };
    assert_eq!(turn.text(), "still here");
    assert_eq!(session.state(), SessionState::Active);
}
