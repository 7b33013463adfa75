pub mod activity;
pub mod attachment;
pub mod submission;
pub mod user;
