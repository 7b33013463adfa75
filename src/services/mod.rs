pub mod access_gate;
pub mod activity_service;
pub mod reconciler;
pub mod submission_service;

#[cfg(test)]
pub(crate) mod test_support;
