pub mod extract;
pub mod test_utils;
pub mod validation;
