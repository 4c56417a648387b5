//! services/api/src/adapters/quiz_llm.rs
//!
//! This module contains the adapter for the quiz-generating LLM.
//! It implements the `QuizContentProvider` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client, error::OpenAIError,
};
use async_trait::async_trait;
use donatello_quiz_core::{
    domain::{QuizDraft, QuizQuestion, QuizRequest},
    ports::{PortError, PortResult, QuizContentProvider},
    validation::validate_quiz,
};
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info, warn};

const SYSTEM_INSTRUCTIONS: &str = r#"You are an expert quiz generator specializing in the Italian Renaissance sculptor Donatello. Create a quiz with the specified number of questions. For each question, provide multiple choice options and ensure the correct answer is one of the provided options, written exactly as it appears among the options. The quiz should be entirely in Portuguese and focused exclusively on the artist, not other figures with the same name.

Respond with ONLY a JSON object of this shape, no commentary:
{"quiz": [{"question": "...", "options": ["...", "..."], "answer": "..."}]}"#;

//=========================================================================================
// Wire Shape of the Model's Reply
//=========================================================================================

#[derive(Debug, Deserialize)]
struct QuizPayload {
    quiz: Vec<QuizItem>,
}

#[derive(Debug, Deserialize)]
struct QuizItem {
    question: String,
    options: Vec<String>,
    answer: String,
}

impl From<QuizItem> for QuizDraft {
    fn from(item: QuizItem) -> Self {
        QuizDraft {
            question: item.question,
            options: item.options,
            answer: item.answer,
        }
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `QuizContentProvider` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiQuizAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiQuizAdapter {
    /// Creates a new `OpenAiQuizAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }

    fn user_prompt(request: &QuizRequest) -> String {
        let mut prompt = String::new();
        if let Some(topic) = &request.topic {
            prompt.push_str(&format!(
                "The quiz should focus on the following topic: {}.\n\n",
                topic
            ));
        }
        prompt.push_str(&format!("Number of questions: {}", request.num_questions));
        prompt
    }
}

/// Pulls the JSON object out of a model reply and validates it.
///
/// Models sometimes wrap the object in a Markdown code fence or add a sentence
/// around it, so the outermost `{ ... }` is used.
pub fn parse_quiz_reply(reply: &str) -> PortResult<Vec<QuizQuestion>> {
    let fence = Regex::new(r"(?s)```(?:json)?\s*(\{.*\})\s*```")
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

    let json = match fence.captures(reply).and_then(|c| c.get(1)) {
        Some(m) => m.as_str(),
        None => match (reply.find('{'), reply.rfind('}')) {
            (Some(start), Some(end)) if start < end => &reply[start..=end],
            _ => {
                return Err(PortError::Unexpected(
                    "Quiz LLM reply did not contain a JSON object.".to_string(),
                ))
            }
        },
    };

    let payload: QuizPayload = serde_json::from_str(json)
        .map_err(|e| PortError::Unexpected(format!("Quiz LLM reply is not a quiz: {}", e)))?;

    Ok(validate_quiz(payload.quiz.into_iter().map(QuizDraft::from))?)
}

//=========================================================================================
// `QuizContentProvider` Trait Implementation
//=========================================================================================

#[async_trait]
impl QuizContentProvider for OpenAiQuizAdapter {
    /// Asks the model for a quiz and runs the reply through schema validation.
    async fn request_quiz(&self, request: &QuizRequest) -> PortResult<Vec<QuizQuestion>> {
        info!(
            "Requesting {} quiz questions (topic: {})",
            request.num_questions,
            request.topic.as_deref().unwrap_or("none")
        );

        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_INSTRUCTIONS)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(Self::user_prompt(request))
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .n(1)
            .temperature(0.8)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // Call the API and manually map the error if it occurs, which respects the orphan rule.
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::Unexpected("Quiz LLM returned no text content.".to_string())
            })?;
        debug!("Quiz LLM reply: {}", content);

        let questions = parse_quiz_reply(&content).map_err(|e| {
            warn!("Rejected quiz LLM reply: {}", e);
            e
        })?;
        info!("Quiz LLM produced {} valid questions", questions.len());
        Ok(questions)
    }
}
