pub mod generate;
pub mod rendition;
pub mod validation;
