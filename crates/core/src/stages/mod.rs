pub mod pricing;
pub mod recommendation;
pub mod retrieval;
pub mod validation;
