pub mod accounts;
pub mod captcha;
pub mod derivation;
pub mod directory;
pub mod markup;
pub mod metrics;
pub mod migration;
pub mod redis;
pub mod session_store;
pub mod sites;
