pub mod token;
pub mod translator;
pub mod validation;
