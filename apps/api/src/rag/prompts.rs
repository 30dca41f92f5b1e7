// Prompt constants for resume question answering.
//
// The "I don't know" instruction is a request to the model, not something the
// code can enforce. Answers outside the retrieved context are still possible.

pub const ANSWER_SYSTEM: &str =
    "You are a helpful assistant that answers questions based on resume content.";

/// Instruction block placed above the retrieved context.
pub const ANSWER_PREAMBLE: &str = "Use this resume context to answer the question.
If you cannot find the answer in the context, say \"I don't know\".";

/// Builds the user prompt. Formatted in one pass so braces inside the resume
/// text or the question are never treated as placeholders.
pub fn build_answer_prompt(context: &str, question: &str) -> String {
    format!("{ANSWER_PREAMBLE}\n\nCONTEXT:\n{context}\n\nQUESTION: {question}\n\nANSWER:")
}
