//! # Prompt
//!
//! Builds the message list sent to the language model for one dialogue turn.
//!
//! ## Format
//!
//! The system message is made of:
//!
//! - **Base instruction**: [`DEFAULT_SYSTEM_MESSAGE`] or a configured override
//! - **Memories** (optional): [`SECTION_MEMORIES`] with experiential and factual bullet lists
//! - **Reference information** (optional): [`SECTION_REFERENCE`] followed by retrieved document contents, one per line
//!
//! It is followed by user/assistant pairs for answered history turns and, last, the current query
//! as a user message.
//!
//! ## External interactions
//!
//! - **AI models**: Output is sent to OpenAI-compatible chat APIs.

/// Chat role, mapped one-to-one onto the OpenAI `role` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// Base instruction when no custom system message is configured.
pub const DEFAULT_SYSTEM_MESSAGE: &str = "Talk naturally. Avoid stiff formality and canned phrases like \"I'd be happy to help\". Keep replies short enough to be read aloud.";

/// Section title introducing what is remembered about the user.
pub const SECTION_MEMORIES: &str = "What you remember about the user:";

/// Subsection title for experiential memories.
pub const SECTION_EXPERIENTIAL: &str = "Experiences:";

/// Subsection title for factual memories.
pub const SECTION_FACTUAL: &str = "Facts:";

/// Section title for retrieved reference documents.
pub const SECTION_REFERENCE: &str = "Reference information:";

/// Builds the system prompt.
///
/// The memory section is omitted when both memory lists are empty; each subsection is omitted
/// when its own list is empty. The reference section is omitted when there are no documents.
///
/// # Arguments
///
/// * `base_instruction` - Leading instruction; falls back to [`DEFAULT_SYSTEM_MESSAGE`] when `None`
/// * `experiential` - Experiential memory contents
/// * `factual` - Factual memory contents
/// * `documents` - Retrieved reference document contents
pub fn build_system_prompt<E, F, D, EI, FI, DI>(
    base_instruction: Option<&str>,
    experiential: E,
    factual: F,
    documents: D,
) -> String
where
    E: IntoIterator<Item = EI>,
    EI: AsRef<str>,
    F: IntoIterator<Item = FI>,
    FI: AsRef<str>,
    D: IntoIterator<Item = DI>,
    DI: AsRef<str>,
{
    let mut out = String::new();
    out.push_str(base_instruction.unwrap_or(DEFAULT_SYSTEM_MESSAGE));
    out.push_str("\n\n");

    let experiential = collect_lines(experiential);
    let factual = collect_lines(factual);
    if !experiential.is_empty() || !factual.is_empty() {
        out.push_str(SECTION_MEMORIES);
        out.push('\n');
        push_bullets(&mut out, SECTION_EXPERIENTIAL, &experiential);
        push_bullets(&mut out, SECTION_FACTUAL, &factual);
        out.push('\n');
    }

    let documents = collect_lines(documents);
    if !documents.is_empty() {
        out.push_str(SECTION_REFERENCE);
        out.push('\n');
        out.push_str(&documents.join("\n"));
        out.push_str("\n\n");
    }

    out
}

/// Builds the full message list for one turn.
///
/// Order: System(system_prompt) → for each `(query, response)` in `history`: User(query), Assistant(response)
/// → User(current_query). Callers pass only answered turns, oldest first.
pub fn build_dialogue_messages<H, Q, R>(
    system_prompt: &str,
    history: H,
    current_query: &str,
) -> Vec<ChatMessage>
where
    H: IntoIterator<Item = (Q, R)>,
    Q: AsRef<str>,
    R: AsRef<str>,
{
    let mut messages = vec![ChatMessage::system(system_prompt)];
    for (query, response) in history {
        messages.push(ChatMessage::user(query.as_ref()));
        messages.push(ChatMessage::assistant(response.as_ref()));
    }
    messages.push(ChatMessage::user(current_query));
    messages
}

fn collect_lines<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|s| s.as_ref().to_string())
        .collect()
}

fn push_bullets(out: &mut String, title: &str, lines: &[String]) {
    if lines.is_empty() {
        return;
    }
    out.push('\n');
    out.push_str(title);
    out.push('\n');
    for line in lines {
        out.push_str("- ");
        out.push_str(line);
        out.push('\n');
    }
}
