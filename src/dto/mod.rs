pub mod activity_dto;
pub mod attachment_dto;
pub mod submission_dto;
