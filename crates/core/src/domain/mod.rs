pub mod action;
pub mod business;
pub mod call;
pub mod record;
