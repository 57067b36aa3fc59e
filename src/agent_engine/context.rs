use crate::llm::types::{ChatMessage, Role};

/// Ordered conversation for one session.
///
/// Only three mutations exist, used in this order each step:
/// `append_observation` → `compact_last_observation` → `append_reply`.
/// Only the newest observation ever holds an image; it is stripped before the
/// model's reply is recorded, so context growth stays text-only.
#[derive(Debug, Default, Clone)]
pub struct SessionContext {
    messages: Vec<ChatMessage>,
    /// Index of the observation still carrying its image.
    pending_observation: Option<usize>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.pending_observation = None;
    }

    /// System prompt; only valid as the first message.
    pub fn append_system(&mut self, prompt: impl Into<String>) {
        if !self.messages.is_empty() {
            tracing::warn!("system prompt appended to a non-empty context");
        }
        self.messages.push(ChatMessage::system(prompt));
    }

    /// User turn with observation text and optional screenshot.
    pub fn append_observation(&mut self, text: impl Into<String>, image_base64: Option<&str>) {
        if self.pending_observation.is_some() {
            tracing::warn!("previous observation was never compacted; compacting now");
            self.compact_last_observation();
        }
        self.messages.push(ChatMessage::user(text, image_base64));
        self.pending_observation = Some(self.messages.len() - 1);
    }

    /// Strip the image from the pending observation. Returns `false` when there
    /// is nothing to compact, so a step can compact at most once.
    pub fn compact_last_observation(&mut self) -> bool {
        let Some(idx) = self.pending_observation.take() else {
            return false;
        };
        let compacted = self.messages[idx].without_images();
        self.messages[idx] = compacted;
        true
    }

    /// Assistant turn recorded after the step's action ran.
    pub fn append_reply(&mut self, content: impl Into<String>) {
        if self.compact_last_observation() {
            tracing::debug!("observation compacted while appending reply");
        }
        self.messages.push(ChatMessage::assistant(content));
    }

    pub fn count_role(&self, role: Role) -> usize {
        self.messages.iter().filter(|m| m.role == role).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::MessageContent;

    #[test]
    fn step_protocol_keeps_context_text_only() {
        let mut ctx = SessionContext::new();
        ctx.append_system("sys");
        ctx.append_observation("task\n\n** Screen Info **", Some("IMG"));
        assert!(ctx.messages()[1].has_image());

        assert!(ctx.compact_last_observation());
        assert!(!ctx.compact_last_observation());
        ctx.append_reply("<think>a</think><answer>b</answer>");

        assert_eq!(ctx.len(), 3);
        assert_eq!(
            ctx.messages()[1].content,
            MessageContent::Text("task\n\n** Screen Info **".into())
        );
        assert!(ctx.messages().iter().all(|m| !m.has_image()));
    }

    #[test]
    fn reply_compacts_a_forgotten_observation() {
        let mut ctx = SessionContext::new();
        ctx.append_observation("obs", Some("IMG"));
        ctx.append_reply("r");
        assert!(!ctx.messages()[0].has_image());
        assert_eq!(ctx.count_role(Role::User), 1);
        assert_eq!(ctx.count_role(Role::Assistant), 1);
    }

    #[test]
    fn new_observation_compacts_the_previous_one() {
        let mut ctx = SessionContext::new();
        ctx.append_observation("one", Some("IMG1"));
        ctx.append_observation("two", Some("IMG2"));
        assert!(!ctx.messages()[0].has_image());
        assert!(ctx.messages()[1].has_image());
    }

    #[test]
    fn clear_resets_everything() {
        let mut ctx = SessionContext::new();
        ctx.append_observation("one", Some("IMG1"));
        ctx.clear();
        assert!(ctx.is_empty());
        assert!(!ctx.compact_last_observation());
    }
}
