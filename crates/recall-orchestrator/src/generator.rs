use async_trait::async_trait;
use recall_core::{Generator, GeneratorKind, Metadata, RecallError};

/// Maximum characters of joined context text included in a stub answer.
const SUMMARY_CHARS: usize = 600;

/// Extractive fallback generator: lists the sources and echoes the start of
/// their text. Needs no external service and is always healthy.
#[derive(Debug, Clone, Default)]
pub struct StubGenerator;

impl StubGenerator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Generator for StubGenerator {
    async fn generate(&self, _query: &str, contexts: &[Metadata]) -> Result<String, RecallError> {
        let mut lines = vec!["Answer (stub): Based on the following sources:".to_string()];
        for context in contexts {
            let title = context.get_str("title").unwrap_or("Untitled");
            let section = context
                .get_str("section")
                .filter(|s| !s.is_empty())
                .unwrap_or("Section");
            lines.push(format!("- {title} — {section}"));
        }
        lines.push("Summary:".to_string());

        let joined = contexts
            .iter()
            .map(|c| c.get_str("text").unwrap_or(""))
            .collect::<Vec<_>>()
            .join(" ");
        let mut summary: String = joined.chars().take(SUMMARY_CHARS).collect();
        if joined.chars().count() > SUMMARY_CHARS {
            summary.push_str("...");
        }
        lines.push(summary);

        Ok(lines.join("\n"))
    }

    fn kind(&self) -> GeneratorKind {
        GeneratorKind::Stub
    }
}
