pub mod identity;
pub mod quiz_llm;

pub use identity::FirebaseIdentityAdapter;
pub use quiz_llm::OpenAiQuizAdapter;
