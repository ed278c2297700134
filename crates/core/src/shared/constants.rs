use crate::shared::model_resolver::ModelSource;

/// BlazeFace short-range face detector. Not downloadable; place it in the
/// model cache or pass its path.
pub const DETECTOR_MODEL: ModelSource = ModelSource {
    file_name: "blazeface_short_range.onnx",
    url: None,
};

/// FER+ emotion classifier from the ONNX model zoo.
pub const EMOTION_MODEL: ModelSource = ModelSource {
    file_name: "emotion-ferplus-8.onnx",
    url: Some(
        "https://github.com/onnx/models/raw/main/validated/vision/body_analysis/emotion_ferplus/model/emotion-ferplus-8.onnx",
    ),
};

/// Advisory returned with a frame in which no face was found.
pub const NO_FACE_MESSAGE: &str =
    "No faces detected. Ensure good lighting on your face, face the camera directly and keep it in frame.";

pub const NO_FRAME_DATA_MESSAGE: &str = "No frame data";

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp", "gif"];
