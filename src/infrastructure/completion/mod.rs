mod openai;

pub use openai::OpenAiCompletion;
