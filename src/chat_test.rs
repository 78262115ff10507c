use std::time::Duration;

use serde_json::json;

use super::*;
use crate::conversation::Role;
use crate::error::TransportError;
use crate::transport::test_helpers::MockTransport;

fn session() -> SessionId {
    SessionId::parse("session_1700000000000").unwrap()
}

fn conversation(mock: &Arc<MockTransport>) -> Conversation {
    Conversation::new(Some(session()), mock.clone())
}

fn roles_and_contents(turns: &[Turn]) -> Vec<(Role, String)> {
    turns.iter().map(|t| (t.role, t.content.clone())).collect()
}

// =============================================================================
// extract_answer
// =============================================================================

#[test]
fn answer_must_be_non_empty_string() {
    assert_eq!(extract_answer(&json!({ "answer": "42" })).unwrap(), "42");
    assert!(matches!(extract_answer(&json!({})), Err(ChatError::InvalidResponseShape(_))));
    assert!(matches!(extract_answer(&json!({ "answer": null })), Err(ChatError::InvalidResponseShape(_))));
    assert!(matches!(extract_answer(&json!({ "answer": "" })), Err(ChatError::InvalidResponseShape(_))));
    assert!(matches!(extract_answer(&json!({ "answer": 42 })), Err(ChatError::InvalidResponseShape(_))));
    assert!(matches!(extract_answer(&json!(["answer"])), Err(ChatError::InvalidResponseShape(_))));
}

// =============================================================================
// success
// =============================================================================

#[tokio::test]
async fn first_question_appends_user_then_assistant() {
    let mock = Arc::new(MockTransport::new());
    mock.push_chat(Duration::ZERO, Ok(json!({ "answer": "42" })));
    let chat = conversation(&mock);

    let answer = chat.ask("What is the total?").await.unwrap().unwrap();

    assert_eq!(answer.role, Role::Assistant);
    assert_eq!(answer.content, "42");
    assert_eq!(
        roles_and_contents(&chat.turns()),
        [(Role::User, "What is the total?".to_string()), (Role::Assistant, "42".to_string())]
    );
    assert_eq!(chat.turns()[0].status, TurnStatus::Answered);
    assert!(!chat.is_waiting());

    let calls = mock.chat_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].session_id, "session_1700000000000");
    assert_eq!(calls[0].question, "What is the total?");
    assert_eq!(calls[0].chat_history, json!([]));
}

#[tokio::test]
async fn history_excludes_the_new_question() {
    let mock = Arc::new(MockTransport::new());
    mock.push_chat(Duration::ZERO, Ok(json!({ "answer": "42" })));
    mock.push_chat(Duration::ZERO, Ok(json!({ "answer": "7" })));
    let chat = conversation(&mock);

    chat.ask("What is the total?").await.unwrap();
    chat.ask("And the tax?").await.unwrap();

    let calls = mock.chat_calls();
    assert_eq!(calls[1].question, "And the tax?");
    assert_eq!(
        calls[1].chat_history,
        json!([
            { "role": "user", "content": "What is the total?" },
            { "role": "assistant", "content": "42" }
        ])
    );
    assert_eq!(chat.turns().len(), 4);
}

#[tokio::test]
async fn question_is_sent_as_typed() {
    let mock = Arc::new(MockTransport::new());
    let chat = conversation(&mock);

    chat.ask("  spaced out  ").await.unwrap();

    assert_eq!(mock.chat_calls()[0].question, "  spaced out  ");
    assert_eq!(chat.turns()[0].content, "  spaced out  ");
}

#[tokio::test]
async fn coordinator_sends_given_prior_history() {
    let mock = Arc::new(MockTransport::new());
    let coordinator = ChatCoordinator::new(mock.clone());
    let store = ConversationStore::new();
    let prior = vec![Turn::user("earlier"), Turn::assistant("reply")];

    coordinator
        .ask(&store, Some(&session()), "next", &prior)
        .await
        .unwrap();

    assert_eq!(mock.chat_calls()[0].chat_history.as_array().map(Vec::len), Some(2));
    assert_eq!(store.len(), 2);
}

// =============================================================================
// ignored submissions
// =============================================================================

#[tokio::test]
async fn blank_question_is_a_no_op() {
    let mock = Arc::new(MockTransport::new());
    let chat = conversation(&mock);

    assert!(chat.ask("").await.unwrap().is_none());
    assert!(chat.ask(" \t\n").await.unwrap().is_none());

    assert!(chat.turns().is_empty());
    assert!(mock.chat_calls().is_empty());
}

#[tokio::test]
async fn missing_session_is_a_no_op() {
    let mock = Arc::new(MockTransport::new());
    let chat = Conversation::new(SessionId::parse("   "), mock.clone());
    assert!(chat.session_id().is_none());

    assert!(chat.ask("What is the total?").await.unwrap().is_none());

    assert!(chat.store().is_empty());
    assert!(mock.chat_calls().is_empty());
}

// =============================================================================
// failures
// =============================================================================

#[tokio::test]
async fn server_error_keeps_only_the_user_turn() {
    let mock = Arc::new(MockTransport::new());
    mock.push_chat(Duration::ZERO, Ok(json!({ "answer": "first" })));
    mock.push_chat(
        Duration::ZERO,
        Err(TransportError::Status { status: 500, body: "Internal Server Error".into() }),
    );
    let chat = conversation(&mock);
    chat.ask("Hello").await.unwrap();

    let err = chat.ask("Summarize").await.unwrap_err();

    assert!(matches!(err, ChatError::Transport(TransportError::Status { status: 500, .. })));
    assert_eq!(err.user_message(), "Failed to send message. Please try again.");
    let turns = chat.turns();
    assert_eq!(turns.len(), 3);
    assert_eq!(turns[2].role, Role::User);
    assert_eq!(turns[2].content, "Summarize");
    assert_eq!(turns[2].status, TurnStatus::Unanswered);
}

#[tokio::test]
async fn missing_answer_is_invalid_shape() {
    let mock = Arc::new(MockTransport::new());
    mock.push_chat(Duration::ZERO, Ok(json!({ "detail": "no answer here" })));
    let chat = conversation(&mock);

    let err = chat.ask("Summarize").await.unwrap_err();

    assert!(matches!(err, ChatError::InvalidResponseShape(_)));
    assert_eq!(err.error_code(), "E_INVALID_RESPONSE_SHAPE");
    assert_eq!(chat.turns().len(), 1);
    assert_eq!(chat.turns()[0].status, TurnStatus::Unanswered);
}

#[tokio::test]
async fn unanswered_question_stays_in_next_history() {
    let mock = Arc::new(MockTransport::new());
    mock.push_chat(Duration::ZERO, Err(TransportError::Request("connection refused".into())));
    mock.push_chat(Duration::ZERO, Ok(json!({ "answer": "retry worked" })));
    let chat = conversation(&mock);

    assert!(chat.ask("Summarize").await.is_err());
    chat.ask("Summarize").await.unwrap();

    assert_eq!(
        mock.chat_calls()[1].chat_history,
        json!([{ "role": "user", "content": "Summarize" }])
    );
    let roles: Vec<Role> = chat.turns().iter().map(|t| t.role).collect();
    assert_eq!(roles, [Role::User, Role::User, Role::Assistant]);
}

#[tokio::test(start_paused = true)]
async fn cancelled_ask_leaves_user_turn_unanswered() {
    let mock = Arc::new(MockTransport::new());
    mock.push_chat(Duration::from_secs(30), Ok(json!({ "answer": "too late" })));
    let chat = conversation(&mock);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let err = chat.ask_with_cancel("Summarize", &cancel).await.unwrap_err();

    assert!(matches!(err, ChatError::Cancelled));
    assert_eq!(chat.turns().len(), 1);
    assert_eq!(chat.turns()[0].status, TurnStatus::Unanswered);
}

#[tokio::test(start_paused = true)]
async fn abandoned_ask_leaves_user_turn_unanswered() {
    let mock = Arc::new(MockTransport::new());
    mock.push_chat(Duration::from_secs(30), Ok(json!({ "answer": "too late" })));
    let chat = conversation(&mock);

    let abandoned = tokio::time::timeout(Duration::from_millis(100), chat.ask("Summarize")).await;
    assert!(abandoned.is_err());

    tokio::time::sleep(Duration::from_secs(60)).await;
    let turns = chat.turns();
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].status, TurnStatus::Unanswered);
    assert!(!chat.is_waiting());

    chat.ask("Summarize again").await.unwrap();
    assert_eq!(
        mock.chat_calls()[1].chat_history,
        json!([{ "role": "user", "content": "Summarize" }])
    );
}

// =============================================================================
// concurrency
// =============================================================================

#[tokio::test(start_paused = true)]
async fn concurrent_asks_append_answers_in_arrival_order() {
    let mock = Arc::new(MockTransport::new());
    mock.push_chat(Duration::from_millis(800), Ok(json!({ "answer": "answer A" })));
    mock.push_chat(Duration::from_millis(100), Ok(json!({ "answer": "answer B" })));
    let chat = conversation(&mock);

    let (a, b) = tokio::join!(chat.ask("question A"), chat.ask("question B"));
    assert_eq!(a.unwrap().unwrap().content, "answer A");
    assert_eq!(b.unwrap().unwrap().content, "answer B");

    assert_eq!(
        roles_and_contents(&chat.turns()),
        [
            (Role::User, "question A".to_string()),
            (Role::User, "question B".to_string()),
            (Role::Assistant, "answer B".to_string()),
            (Role::Assistant, "answer A".to_string()),
        ]
    );

    let calls = mock.chat_calls();
    assert_eq!(calls[0].chat_history, json!([]));
    assert_eq!(calls[1].chat_history, json!([{ "role": "user", "content": "question A" }]));
}

#[tokio::test(start_paused = true)]
async fn waiting_while_a_question_is_in_flight() {
    let mock = Arc::new(MockTransport::new());
    mock.push_chat(Duration::from_millis(500), Ok(json!({ "answer": "ok" })));
    let chat = conversation(&mock);

    let probe = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        chat.is_waiting()
    };
    let (result, waiting) = tokio::join!(chat.ask("q"), probe);

    assert!(result.is_ok());
    assert!(waiting);
    assert!(!chat.is_waiting());
}
