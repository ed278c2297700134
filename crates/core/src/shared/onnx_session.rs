use std::path::Path;

use ort::session::Session;

/// Return the preferred ONNX execution providers for the current platform.
///
/// Falls back to CPU if the platform-specific provider is unavailable.
pub fn preferred_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}

/// Opens an ONNX model once at startup for a long-lived capability.
///
/// `intra_threads` bounds the CPU threads a single inference may use.
pub fn load_session(
    model_path: &Path,
    intra_threads: usize,
) -> Result<Session, Box<dyn std::error::Error>> {
    let session = Session::builder()?
        .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
        .with_intra_threads(intra_threads.max(1))?
        .with_execution_providers(preferred_execution_providers())?
        .commit_from_file(model_path)?;
    log::debug!("Loaded ONNX model {}", model_path.display());
    Ok(session)
}
