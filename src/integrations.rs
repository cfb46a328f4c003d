//! Deep links that open a composed prompt in an assistant.
//!
//! Payloads are percent-encoded with the same rules as JavaScript's
//! `encodeURIComponent`, so links match what the browser build produces.

use clap::ValueEnum;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Characters `encodeURIComponent` leaves alone besides ASCII alphanumerics.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Assistant {
    /// Prompt carried in the URL fragment.
    Chatgpt,
    /// Fixed new-chat URL; the prompt must be pasted.
    Claude,
    /// Prompt carried in the `q` query parameter.
    Gemini,
    /// Prompt carried in the `q` query parameter.
    Perplexity,
    /// Prompt handed to the editor through its custom scheme.
    Cursor,
}

impl Assistant {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Chatgpt => "ChatGPT",
            Self::Claude => "Claude",
            Self::Gemini => "Gemini",
            Self::Perplexity => "Perplexity",
            Self::Cursor => "Cursor",
        }
    }

    /// Whether the link carries the prompt text.
    pub fn carries_prompt(&self) -> bool {
        !matches!(self, Self::Claude)
    }

    pub fn url(&self, prompt: &str) -> String {
        let text = encode_component(prompt);
        match self {
            Self::Chatgpt => format!("https://chat.openai.com/?model=gpt-4o#{text}"),
            Self::Claude => "https://claude.ai/new".to_string(),
            Self::Gemini => format!("https://gemini.google.com/app?q={text}"),
            Self::Perplexity => format!("https://www.perplexity.ai/?q={text}"),
            Self::Cursor => format!("cursor://chat?text={text}"),
        }
    }
}

pub fn encode_component(text: &str) -> String {
    utf8_percent_encode(text, URI_COMPONENT).to_string()
}
