// ABOUTME: Append-only transcript of role-tagged chat messages
// Replayed verbatim to the provider on every turn

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Self::System => "System",
            Self::User => "You",
            Self::Assistant => "Assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Ordered messages for one session. Entries are never edited or removed.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with an optional system prompt followed by an optional greeting
    pub fn seeded(system_prompt: Option<&str>, greeting: Option<&str>) -> Self {
        let mut transcript = Self::new();
        if let Some(prompt) = system_prompt.filter(|p| !p.trim().is_empty()) {
            transcript.messages.push(Message::system(prompt));
        }
        if let Some(greeting) = greeting.filter(|g| !g.trim().is_empty()) {
            transcript.messages.push(Message::assistant(greeting));
        }
        transcript
    }

    /// Commit a completed turn: the user prompt then the assistant reply
    pub fn append_exchange(&mut self, user: Message, assistant: Message) -> usize {
        debug_assert_eq!(user.role, Role::User);
        debug_assert_eq!(assistant.role, Role::Assistant);
        self.messages.push(user);
        self.messages.push(assistant);
        self.messages.len() - 1
    }

    /// The messages a request would carry if `pending` were submitted now
    pub fn with_pending(&self, pending: &Message) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.messages.len() + 1);
        messages.extend_from_slice(&self.messages);
        messages.push(pending.clone());
        messages
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Message::assistant("hi")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }

    #[test]
    fn test_seeded_with_greeting_only() {
        let transcript = Transcript::seeded(None, Some("How can I help you?"));
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.messages()[0], Message::assistant("How can I help you?"));
    }

    #[test]
    fn test_seeded_skips_blank_entries() {
        let transcript = Transcript::seeded(Some("  "), Some(""));
        assert!(transcript.is_empty());
    }

    #[test]
    fn test_seeded_system_before_greeting() {
        let transcript = Transcript::seeded(Some("Be brief."), Some("Hello"));
        let roles: Vec<Role> = transcript.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::Assistant]);
    }

    #[test]
    fn test_append_exchange_preserves_order() {
        let mut transcript = Transcript::seeded(None, Some("Hi"));
        let idx = transcript.append_exchange(Message::user("2+2?"), Message::assistant("4"));

        assert_eq!(idx, 2);
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript.messages()[1], Message::user("2+2?"));
        assert_eq!(transcript.messages()[2], Message::assistant("4"));
    }

    #[test]
    fn test_with_pending_does_not_mutate() {
        let transcript = Transcript::seeded(None, Some("Hi"));
        let request = transcript.with_pending(&Message::user("hello"));

        assert_eq!(request.len(), 2);
        assert_eq!(request[1], Message::user("hello"));
        assert_eq!(transcript.len(), 1);
    }
}
