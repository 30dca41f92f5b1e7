// Resume question answering: PDF loading, chunking, embedding, vector
// retrieval and answer orchestration. All LLM calls go through llm_client.

pub mod chunker;
pub mod embedder;
pub mod handlers;
pub mod index;
pub mod loader;
pub mod models;
pub mod pipeline;
pub mod prompts;

#[cfg(test)]
pub mod testing;
