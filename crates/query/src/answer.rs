use std::sync::Arc;

use extract::CompletionModel;

use crate::error::GenerationError;

/// Generates the final grounded explanation from the assembled context.
#[derive(Clone)]
pub struct AnswerGenerator {
    llm: Arc<dyn CompletionModel>,
}

impl AnswerGenerator {
    pub fn new(llm: Arc<dyn CompletionModel>) -> Self {
        Self { llm }
    }

    pub async fn generate(
        &self,
        query: &str,
        offense: &str,
        context: &str,
    ) -> Result<String, GenerationError> {
        let prompt = build_answer_prompt(query, offense, context);
        let raw = self.llm.complete(&prompt).await.map_err(GenerationError)?;
        Ok(strip_think_sections(&raw).trim().to_string())
    }
}

fn build_answer_prompt(query: &str, offense: &str, context: &str) -> String {
    format!(
        r#"You are a legal assistant specialized in penal-code interpretation.

Given the matched offense and the retrieved legal context, provide a structured interpretation of the user's situation.

Return the following:
- **Chapter**
- **Section**
- **Punishment Clause(s)**
- **Brief Explanation**

Use ONLY the information provided in the context. Cite chapter and section exactly as given. If the context does not cover the situation, say so.

---

**Matched Offense:** {offense}

**Retrieved Context:**
{context}

**User Situation:**
{query}

---

**Legal Interpretation:**"#
    )
}

/// Reasoning models may wrap deliberation in `<think>...</think>` blocks;
/// only the text after them is the answer.
pub fn strip_think_sections(text: &str) -> String {
    let mut output = String::new();
    let mut rest = text;

    loop {
        match rest.find("<think>") {
            Some(start) => {
                output.push_str(&rest[..start]);
                match rest[start..].find("</think>") {
                    Some(end) => {
                        rest = &rest[start + end + "</think>".len()..];
                    }
                    None => break, // unclosed block: drop the remainder
                }
            }
            None => {
                output.push_str(rest);
                break;
            }
        }
    }

    output
}
