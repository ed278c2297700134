pub mod constants;
pub mod model_resolver;
pub mod onnx_session;
pub mod pixel_buffer;
pub mod region;
