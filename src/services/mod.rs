mod guest;
mod identity;
mod quota;

pub use guest::{check_guest, cookie_value, guest_used_cookie, GUEST_COOKIE, GUEST_DENIED_MESSAGE};
pub use identity::{bearer_token, Caller, IdentityResolver, IdentityVerifier, SupabaseVerifier};
pub use quota::{QuotaDecision, QuotaLedger, QuotaUnavailable};
