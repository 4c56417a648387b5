//! Drives a quiz task end to end with a paused clock.

mod common;

use common::{questions, ScriptedQuizProvider};
use donatello_quiz_core::{domain::Topic, ports::PortError, session::QuizSession};
use quiz_api_lib::web::{
    protocol::ServerMessage,
    quiz_task::{spawn_quiz_task, Intent, QuizHandle},
};
use serde_json::Value;
use std::time::Duration;
use tokio::time::{timeout, Instant};

async fn next_message(handle: &mut QuizHandle) -> ServerMessage {
    timeout(Duration::from_secs(600), handle.updates.recv())
        .await
        .expect("quiz task went quiet")
        .expect("quiz task closed its updates")
}

/// Reads updates until a state view satisfies `pred`, returning it as JSON.
async fn wait_for_view(handle: &mut QuizHandle, pred: impl Fn(&Value) -> bool) -> Value {
    loop {
        if let ServerMessage::State { view } = next_message(handle).await {
            let view = serde_json::to_value(view).unwrap();
            if pred(&view) {
                return view;
            }
        }
    }
}

async fn wait_for_question(handle: &mut QuizHandle, number: u64) -> Value {
    wait_for_view(handle, |v| {
        v["phase"] == "active" && v["question_number"] == number && v["answer_status"] == "unanswered"
    })
    .await
}

/// Picks the right (or a wrong) option on question `number` and submits it.
async fn answer(handle: &mut QuizHandle, number: u64, correct: bool) {
    let view = wait_for_question(handle, number).await;
    let choice = view["options"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .find(|option| option.starts_with("certa") == correct)
        .unwrap()
        .to_string();
    handle.intents.send(Intent::Select { option: choice }).await.unwrap();
    handle.intents.send(Intent::Submit).await.unwrap();
}

async fn start(handle: &mut QuizHandle, topic: Topic) {
    handle.intents.send(Intent::Start { topic }).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn perfect_run_reaches_master_feedback() {
    let provider = ScriptedQuizProvider::new(vec![Ok(questions(12))]);
    let mut handle = spawn_quiz_task(provider.clone(), QuizSession::with_seed(7));

    wait_for_view(&mut handle, |v| v["phase"] == "setup").await;
    start(&mut handle, Topic::General).await;
    wait_for_view(&mut handle, |v| v["phase"] == "loading").await;

    for number in 1..=12 {
        answer(&mut handle, number, true).await;
        let resolved = wait_for_view(&mut handle, |v| {
            v["question_number"] == number && v["answer_status"] == "correct"
        })
        .await;
        assert_eq!(resolved["score"], number);
    }

    let results = wait_for_view(&mut handle, |v| v["phase"] == "results").await;
    assert_eq!(results["score"], 12);
    assert_eq!(results["total_questions"], 12);
    assert_eq!(results["percentage"], 100.0);
    assert_eq!(
        results["feedback"],
        "Excelente trabalho! Você é um verdadeiro mestre de Donatello!"
    );

    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].topic, None);
    assert_eq!(requests[0].num_questions, 12);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn failed_generation_notifies_then_returns_to_setup() {
    let provider = ScriptedQuizProvider::new(vec![Err(PortError::Unexpected(
        "provider unreachable".to_string(),
    ))]);
    let mut handle = spawn_quiz_task(provider.clone(), QuizSession::with_seed(1));

    wait_for_view(&mut handle, |v| v["phase"] == "setup").await;
    start(&mut handle, Topic::Life).await;
    wait_for_view(&mut handle, |v| v["phase"] == "loading").await;

    let notice = next_message(&mut handle).await;
    assert_eq!(notice, ServerMessage::quiz_generation_failed());
    let view = wait_for_view(&mut handle, |_| true).await;
    assert_eq!(view["phase"], "setup");

    assert_eq!(provider.requests()[0].topic.as_deref(), Some("vida"));
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn unanswered_question_times_out_and_moves_on() {
    let provider = ScriptedQuizProvider::new(vec![Ok(questions(5))]);
    let mut handle = spawn_quiz_task(provider, QuizSession::with_seed(3));

    start(&mut handle, Topic::Sculptures).await;
    answer(&mut handle, 1, true).await;
    answer(&mut handle, 2, true).await;

    let shown = wait_for_question(&mut handle, 3).await;
    assert_eq!(shown["time_remaining"], 20);
    let shown_at = Instant::now();

    let timed_out = wait_for_view(&mut handle, |v| {
        v["question_number"] == 3 && v["answer_status"] == "incorrect"
    })
    .await;
    let waited = shown_at.elapsed();
    assert!(waited >= Duration::from_secs(20) && waited < Duration::from_secs(21));
    assert_eq!(timed_out["time_remaining"], 0);
    assert_eq!(timed_out["selected_answer"], Value::Null);
    assert_eq!(timed_out["correct_answer"], "certa 3");

    let next = wait_for_question(&mut handle, 4).await;
    let waited = shown_at.elapsed();
    assert!(waited >= Duration::from_millis(21_500) && waited < Duration::from_secs(22));
    assert_eq!(next["time_remaining"], 20);
    assert_eq!(next["score"], 2);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn last_answer_leads_to_results() {
    let provider = ScriptedQuizProvider::new(vec![Ok(questions(2))]);
    let mut handle = spawn_quiz_task(provider, QuizSession::with_seed(5));

    start(&mut handle, Topic::Period).await;
    answer(&mut handle, 1, true).await;
    answer(&mut handle, 2, false).await;

    let results = wait_for_view(&mut handle, |v| v["phase"] == "results").await;
    assert_eq!(results["score"], 1);
    assert_eq!(results["total_questions"], 2);
    assert_eq!(results["percentage"], 50.0);
    assert_eq!(results["feedback"], "Continue estudando para se tornar um mestre!");

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn play_again_starts_a_fresh_quiz() {
    let provider = ScriptedQuizProvider::new(vec![Ok(questions(1)), Ok(questions(3))]);
    let mut handle = spawn_quiz_task(provider.clone(), QuizSession::with_seed(9));

    start(&mut handle, Topic::General).await;
    answer(&mut handle, 1, true).await;
    wait_for_view(&mut handle, |v| v["phase"] == "results").await;

    handle.intents.send(Intent::PlayAgain).await.unwrap();
    wait_for_view(&mut handle, |v| v["phase"] == "setup").await;

    start(&mut handle, Topic::Sculptures).await;
    let first = wait_for_question(&mut handle, 1).await;
    assert_eq!(first["total_questions"], 3);
    assert_eq!(first["score"], 0);
    assert_eq!(first["time_remaining"], 20);
    assert_eq!(provider.requests()[1].topic.as_deref(), Some("esculturas"));

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn second_start_while_loading_is_rejected() {
    let provider =
        ScriptedQuizProvider::with_delay(vec![Ok(questions(3))], Duration::from_secs(5));
    let mut handle = spawn_quiz_task(provider.clone(), QuizSession::with_seed(11));

    start(&mut handle, Topic::General).await;
    wait_for_view(&mut handle, |v| v["phase"] == "loading").await;
    start(&mut handle, Topic::Life).await;

    match next_message(&mut handle).await {
        ServerMessage::Error { .. } => {}
        other => panic!("expected an error, got {:?}", other),
    }
    wait_for_question(&mut handle, 1).await;
    assert_eq!(provider.requests().len(), 1);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn unknown_option_and_empty_submit_are_rejected() {
    let provider = ScriptedQuizProvider::new(vec![Ok(questions(2))]);
    let mut handle = spawn_quiz_task(provider, QuizSession::with_seed(13));

    start(&mut handle, Topic::General).await;
    wait_for_question(&mut handle, 1).await;

    handle.intents.send(Intent::Submit).await.unwrap();
    handle
        .intents
        .send(Intent::Select {
            option: "Michelangelo".to_string(),
        })
        .await
        .unwrap();

    let mut errors = 0;
    while errors < 2 {
        match next_message(&mut handle).await {
            ServerMessage::Error { .. } => errors += 1,
            ServerMessage::State { view } => {
                let view = serde_json::to_value(view).unwrap();
                assert_eq!(view["answer_status"], "unanswered");
                assert_eq!(view["selected_answer"], Value::Null);
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_while_loading_finishes() {
    let provider =
        ScriptedQuizProvider::with_delay(vec![Ok(questions(3))], Duration::from_secs(3600));
    let mut handle = spawn_quiz_task(provider, QuizSession::with_seed(17));

    start(&mut handle, Topic::General).await;
    wait_for_view(&mut handle, |v| v["phase"] == "loading").await;

    timeout(Duration::from_secs(1), handle.shutdown())
        .await
        .expect("shutdown should not wait for the provider");
}
