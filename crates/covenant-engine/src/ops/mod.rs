//! Kind-specific operations. Each submodule adds an `impl ObligationEngine`
//! block plus the request and outcome types of its kind.

pub mod bill;
pub mod contract;
pub mod insurance;
pub mod subscription;
pub mod template;
pub mod verification;
