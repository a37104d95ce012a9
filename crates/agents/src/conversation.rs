//! Chat transcript of one student.

use advisor_llm::{ChatMessage, Role};
use serde::{Deserialize, Serialize};

/// Messages exchanged with a student, oldest first.
///
/// The first message is the intake system prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    resume_attached: bool,
}

impl Conversation {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::system(system_prompt)],
            resume_attached: false,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Remove the most recent message.
    pub fn pop(&mut self) -> Option<ChatMessage> {
        // The system prompt stays.
        if self.messages.len() > 1 {
            self.messages.pop()
        } else {
            None
        }
    }

    /// Number of messages the student has sent.
    pub fn user_turns(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.role == Role::User)
            .count()
    }

    pub fn has_resume(&self) -> bool {
        self.resume_attached
    }

    pub(crate) fn mark_resume_attached(&mut self) {
        self.resume_attached = true;
    }
}
