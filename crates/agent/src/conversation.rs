//! Deterministic command interpretation for the agent shell. Free text maps
//! onto pipeline tools by keyword; anything ambiguous gets a clarification
//! prompt instead of a guess.

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Interpretation {
    Invoke { tool_name: &'static str },
    Help,
    Clarify { prompt: String },
}

#[derive(Clone, Debug, Default)]
pub struct CommandInterpreter;

impl CommandInterpreter {
    pub fn new() -> Self {
        Self
    }

    pub fn interpret(&self, text: &str) -> Interpretation {
        let normalized = text.to_ascii_lowercase();

        if contains_any(&normalized, &["help", "what can you", "commands", "usage"]) {
            return Interpretation::Help;
        }

        // Summary first: "underwriting summary" must not fall through to the
        // underwrite keywords.
        if contains_any(&normalized, &["summary", "summarize", "report", "results", "breakdown"]) {
            return Interpretation::Invoke { tool_name: "underwriting_summary" };
        }

        if contains_any(&normalized, &["underwrite", "underwriting", "classify", "assess", "evaluate"])
        {
            return Interpretation::Invoke { tool_name: "underwrite_all" };
        }

        if contains_any(&normalized, &["promote", "migrate", "relational", "normalize"]) {
            return Interpretation::Invoke { tool_name: "promote_policies" };
        }

        if contains_any(&normalized, &["fetch", "pull", "download", "ingest"])
            || (normalized.contains("get") && normalized.contains("polic"))
        {
            return Interpretation::Invoke { tool_name: "fetch_policies" };
        }

        Interpretation::Clarify {
            prompt: "I can fetch policies, promote them into the policy store, underwrite all \
                     policies, or show the underwriting summary. Which would you like?"
                .to_string(),
        }
    }
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| text.contains(keyword))
}
