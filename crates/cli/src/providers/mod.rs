//! Concrete capability backends used by the binary: a JSON-file policy
//! corpus, an HTTP web-search price source, and an OpenAI-compatible chat
//! endpoint. Everything behind the core traits, so the engine and the
//! agent never see any of this.

pub mod corpus;
pub mod llm;
pub mod price;

pub use corpus::JsonCorpusSearch;
pub use llm::OpenAiChat;
pub use price::HttpPriceDiscovery;
