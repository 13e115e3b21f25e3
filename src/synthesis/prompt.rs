//! Meta-prompt construction for the synthesizer

use std::fmt::Write;

use crate::types::AgentId;

const SEPARATOR: &str = "\n\n---\n\n";

const ANALYSIS_FORMAT: &str = "\
When analyzing the responses below, structure your analysis in exactly this format:

## Consensus Points
List facts and conclusions where all models agree. These represent high-confidence information.

## Key Disagreements
Identify where the models conflict or provide different answers. For each disagreement:
- State the conflicting positions
- Evaluate the reasoning quality
- Indicate which position seems most credible (or mark as \"needs verification\")

## Synthesized Answer
Merge the best insights from all responses into a coherent, comprehensive answer.
- Integrate complementary perspectives
- Attribute unique insights when valuable (e.g., \"As noted by one model...\")
- Remove redundancy while preserving nuance

Be concise but thorough.";

/// Build the synthesizer prompt
///
/// Responses are listed in agent-id order regardless of the order given, each
/// under an `<AGENT>'S RESPONSE:` label, so the same inputs always produce
/// the same prompt.
#[must_use]
pub fn build_meta_prompt(prompt: &str, responses: &[(AgentId, String)]) -> String {
    let mut ordered: Vec<&(AgentId, String)> = responses.iter().collect();
    ordered.sort_by(|a, b| a.0.cmp(&b.0));

    let names = ordered
        .iter()
        .map(|(agent, _)| agent.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let mut out = String::new();
    let _ = write!(
        out,
        "You are analyzing responses from {} AI model{}: {names}.\n\n{ANALYSIS_FORMAT}",
        ordered.len(),
        if ordered.len() == 1 { "" } else { "s" },
    );
    out.push_str(SEPARATOR);
    let _ = write!(out, "ORIGINAL QUESTION:\n{}", prompt.trim());

    for (agent, text) in ordered {
        out.push_str(SEPARATOR);
        let _ = write!(
            out,
            "{}'S RESPONSE:\n{}",
            agent.as_str().to_uppercase(),
            text.trim()
        );
    }

    out.push_str(SEPARATOR);
    out.push_str("Now provide your unified analysis:");
    out
}
