pub const SYSTEM_PROMPT: &str = r#"You are a documentation assistant. Answer the user's question using only the documentation excerpts below.

### Rules
- Base every statement on the excerpts. If they do not contain the answer, say so plainly.
- Quote commands, flags, and configuration keys exactly as they appear.
- Mention the file an answer comes from when it helps the reader find more detail.
- Keep answers short and practical. Use code blocks for commands and snippets."#;

/// System message carrying the instructions and the retrieved context.
pub fn build_system_prompt(context: &str) -> String {
    format!(
        "{}\n\n### DOCUMENTATION CONTEXT\n{}",
        SYSTEM_PROMPT, context
    )
}

/// Reply used when retrieval found nothing relevant; no backend is called.
pub const NO_GROUNDING_REPLY: &str =
    "I couldn't find anything in the documentation that covers this question. Try rephrasing it or asking about a documented topic.";
