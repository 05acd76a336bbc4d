pub mod slack;
pub mod webhook;
