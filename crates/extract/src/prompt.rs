pub fn build_extraction_prompt(chunk_text: &str) -> String {
    format!(
        r#"Extract the offenses defined in the following penal-code text.

INSTRUCTIONS:
1. Identify every distinct offense the text defines or punishes
2. For each offense record the chapter, section and punishment clause
3. Output ONLY valid JSON, nothing else
4. Use the exact schema below

SCHEMA:
[
  {{"offense": "offense name", "chapter": "chapter number or title", "section": "section number", "punishment": "punishment clause text"}}
]

RULES:
- One object per offense, in document order
- Copy the punishment clause verbatim from the text
- If a field is not stated in the text, use the string "unknown"
- Do not invent offenses that the text does not define
- Output ONLY the JSON array, no markdown, no explanations

TEXT:
{}

JSON OUTPUT:"#,
        chunk_text
    )
}

pub fn build_retry_prompt(invalid_output: &str) -> String {
    format!(
        r#"The following output is not valid JSON:

{}

Fix it. Output only a valid JSON array of offense objects with the fields "offense", "chapter", "section" and "punishment". No markdown, no code blocks, no explanations."#,
        invalid_output
    )
}
