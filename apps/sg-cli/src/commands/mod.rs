pub mod fingerprint;
pub mod register;
pub mod resolve;
pub mod rules;
