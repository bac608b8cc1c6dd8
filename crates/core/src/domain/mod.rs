pub mod claim;
pub mod policy;
pub mod trace;
