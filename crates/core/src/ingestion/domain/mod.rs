pub mod image_decoder;
pub mod image_source;
