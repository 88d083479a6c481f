use serde::{Deserialize, Serialize};

use crate::encoder::EncodedFrame;

/// Everything needed to build one outbound inference call
#[derive(Debug, Clone)]
pub struct SummaryRequest {
    pub prompt: String,
    /// Frames in the order the model should see them
    pub frames: Vec<EncodedFrame>,
    pub model: String,
    pub max_tokens: u32,
}

// Wire format of the chat-completions endpoint

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: Vec<ContentPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
    pub content: Option<String>,
}

/// Combine a prompt and encoded frames into a single request
pub fn assemble(
    prompt: &str,
    frames: Vec<EncodedFrame>,
    model: &str,
    max_tokens: u32,
) -> SummaryRequest {
    SummaryRequest {
        prompt: prompt.to_string(),
        frames,
        model: model.to_string(),
        max_tokens,
    }
}

impl SummaryRequest {
    /// One user turn: the prompt first, then one image part per frame
    pub fn to_payload(&self) -> ChatCompletionRequest {
        let mut content = Vec::with_capacity(self.frames.len() + 1);
        content.push(ContentPart::Text { text: self.prompt.clone() });
        content.extend(self.frames.iter().map(|frame| ContentPart::ImageUrl {
            image_url: ImageUrl { url: frame.data_uri() },
        }));

        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content,
            }],
            max_tokens: self.max_tokens,
        }
    }

    pub fn is_text_only(&self) -> bool {
        self.frames.is_empty()
    }
}
