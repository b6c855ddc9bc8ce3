//! Data models module
//!
//! Request/response structures for the tailoring API and the completion provider

pub mod openai;
pub mod tailor;

pub use tailor::{
    ResponseMetadata, TailorRequest, TailorResponse, TailorResult, Tone, UsageRecord,
};
