// Thin re-export module: the native token contracts are split into the
// dispatch service, parameter codecs, the account ledger, the unbinding
// schedule and the token method handlers.

pub mod ledger;
pub mod service;
pub mod states;
pub mod token;
pub mod unbind;

pub use service::*;
pub use states::*;
pub use token::{token_info, TokenInfo, GOVERNANCE_TOKEN, UTILITY_TOKEN};
