//! Prompt template for recipe extraction.
//!
//! Every chunk is framed by the same two messages: a system message carrying
//! the extraction rules (plus the free-text instruction describing the
//! recipe fields) and a user message carrying the chunk text. Keeping the
//! wording here lets tests inspect the rendered messages without a model.
//!
//! Callers can override the system part via
//! [`crate::config::ExtractionConfig::system_prompt`] and the instruction via
//! [`crate::config::ExtractionConfig::instruction`].

/// Default system prompt.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a top-tier algorithm for extracting information from text. \
Only extract information that is relevant to the provided text. \
If no information is relevant, use the schema and output an empty list where appropriate.";

/// Default description of what to extract.
pub const DEFAULT_INSTRUCTION: &str = "Extract every recipe. Each recipe has a name and a list of ingredients. \
Each ingredient has a name, a numeric amount, and the unit of that amount \
(use an empty string when the ingredient has no unit).";

/// Role of a rendered prompt message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptRole {
    System,
    User,
}

/// One rendered message of the template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptMessage {
    pub role: PromptRole,
    pub content: String,
}

/// The two-message extraction template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    system: String,
    instruction: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT, DEFAULT_INSTRUCTION)
    }
}

impl PromptTemplate {
    pub fn new(system: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            instruction: instruction.into(),
        }
    }

    /// Render the messages for one chunk of text.
    pub fn render(&self, text: &str) -> Vec<PromptMessage> {
        vec![
            PromptMessage {
                role: PromptRole::System,
                content: self.system_message(),
            },
            PromptMessage {
                role: PromptRole::User,
                content: user_message(text),
            },
        ]
    }

    fn system_message(&self) -> String {
        let instruction = self.instruction.trim();
        if instruction.is_empty() {
            self.system.clone()
        } else {
            format!("{}\n\n{}", self.system.trim_end(), instruction)
        }
    }
}

/// Frame the chunk text for the user turn.
pub fn user_message(text: &str) -> String {
    format!("I need to extract information from the following text: ```\n{text}\n```\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_system_then_user() {
        let messages = PromptTemplate::default().render("Pancakes: 2 cups flour");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, PromptRole::System);
        assert!(messages[0].content.starts_with("You are a top-tier algorithm"));
        assert!(messages[0].content.ends_with(DEFAULT_INSTRUCTION));
        assert_eq!(messages[1].role, PromptRole::User);
        assert_eq!(
            messages[1].content,
            "I need to extract information from the following text: ```\nPancakes: 2 cups flour\n```\n"
        );
    }

    #[test]
    fn blank_instruction_keeps_system_prompt_only() {
        let messages = PromptTemplate::new("Extract.", "  ").render("x");
        assert_eq!(messages[0].content, "Extract.");
    }
}
