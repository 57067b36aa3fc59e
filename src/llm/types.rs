use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(content.into()),
        }
    }

    /// User turn carrying observation text and, optionally, a base64 PNG screenshot.
    pub fn user(text: impl Into<String>, image_base64: Option<&str>) -> Self {
        let text = text.into();
        let content = match image_base64 {
            Some(b64) if !b64.is_empty() => MessageContent::Parts(vec![
                ContentPart::Text { text },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: format!("data:image/png;base64,{b64}"),
                    },
                },
            ]),
            _ => MessageContent::Text(text),
        };
        Self {
            role: Role::User,
            content,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Text(content.into()),
        }
    }

    pub fn has_image(&self) -> bool {
        match &self.content {
            MessageContent::Text(_) => false,
            MessageContent::Parts(parts) => parts
                .iter()
                .any(|p| matches!(p, ContentPart::ImageUrl { .. })),
        }
    }

    /// Concatenated text of the message, images ignored.
    pub fn text(&self) -> String {
        match &self.content {
            MessageContent::Text(t) => t.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::ImageUrl { .. } => None,
                })
                .collect(),
        }
    }

    /// Drops every image part. A single remaining text part collapses to plain text.
    pub fn without_images(&self) -> Self {
        let MessageContent::Parts(parts) = &self.content else {
            return self.clone();
        };
        let mut texts: Vec<ContentPart> = parts
            .iter()
            .filter(|p| matches!(p, ContentPart::Text { .. }))
            .cloned()
            .collect();
        let content = match texts.len() {
            0 => MessageContent::Text(String::new()),
            1 => match texts.remove(0) {
                ContentPart::Text { text } => MessageContent::Text(text),
                other => MessageContent::Parts(vec![other]),
            },
            _ => MessageContent::Parts(texts),
        };
        Self {
            role: self.role,
            content,
        }
    }
}

/// Sampling parameters sent with every model request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
    pub frequency_penalty: f64,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 3000,
            temperature: 0.0,
            top_p: 0.85,
            frequency_penalty: 0.2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stripping_images_keeps_text_byte_for_byte() {
        let text = "任务\n\n** Screen Info **\n\n{\n  \"current_app\": \"微信\"\n}  ";
        let msg = ChatMessage::user(text, Some("iVBORw0KGgo="));
        assert!(msg.has_image());

        let stripped = msg.without_images();
        assert!(!stripped.has_image());
        assert_eq!(stripped.role, Role::User);
        assert_eq!(stripped.content, MessageContent::Text(text.to_string()));
    }

    #[test]
    fn user_without_image_is_plain_text() {
        let msg = ChatMessage::user("hello", None);
        assert_eq!(msg.content, MessageContent::Text("hello".into()));
        let empty = ChatMessage::user("hello", Some(""));
        assert!(!empty.has_image());
        assert_eq!(msg.without_images(), msg);
    }

    #[test]
    fn serializes_in_openai_shape() {
        let msg = ChatMessage::user("look", Some("AAAA"));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"][0]["type"], "text");
        assert_eq!(json["content"][1]["type"], "image_url");
        assert_eq!(
            json["content"][1]["image_url"]["url"],
            "data:image/png;base64,AAAA"
        );
        let sys = serde_json::to_value(ChatMessage::system("s")).unwrap();
        assert_eq!(sys, serde_json::json!({"role": "system", "content": "s"}));
    }
}
