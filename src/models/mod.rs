mod quota;
mod summary;

pub use quota::QuotaRecord;
pub use summary::{Style, SummarizeRequest, SummarizeResponse};
