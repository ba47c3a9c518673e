//! Prompts sent to the vision model.
//!
//! The transcription instructions travel in the *user* message next to the
//! page image; the system prompt is empty unless the caller configures one
//! through [`crate::config::Config::system_prompt`].

/// User message sent with every page image.
pub const IMAGE_TO_MARKDOWN_PROMPT: &str = r#"Please read the content in the image and transcribe it into pure Markdown format. Pay special attention to:
1. Maintain the format of headings, text, formulas, and table rows and columns
2. Output ONLY the pure Markdown content
3. DO NOT wrap the content with ```markdown``` or any other code block markers
4. DO NOT add any explanations or additional text"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_forbids_fences_and_commentary() {
        assert!(IMAGE_TO_MARKDOWN_PROMPT.contains("pure Markdown"));
        assert!(IMAGE_TO_MARKDOWN_PROMPT.contains("DO NOT wrap"));
        assert!(IMAGE_TO_MARKDOWN_PROMPT.contains("DO NOT add any explanations"));
    }
}
