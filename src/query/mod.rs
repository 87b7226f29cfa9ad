//! Query parsing and hybrid retrieval.
//!
//! This is the heart of Minne: free-text questions are parsed into an
//! intent plus structured filters, then routed to the retrieval strategy
//! that fits - a date-filtered relational scan, a vector similarity search,
//! or both combined.

pub mod dates;
mod hybrid;
mod parser;

pub use dates::{describe_range, parse_date_expr, DateRange};
pub use hybrid::{HybridSearch, KeywordCounts, RetrievedMemory};
pub use parser::{ParsedQuery, QueryIntent, QueryParser};
