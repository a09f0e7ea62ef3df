//! Sequence-classification model wrapper for ONNX Runtime inference.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ort::session::{builder::GraphOptimizationLevel, Session, SessionInputValue};
use ort::value::Tensor;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, info};

use super::{InferenceError, SequenceClassifier};

/// Device type for inference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Cuda,
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cpu => write!(f, "CPU"),
            Self::Cuda => write!(f, "CUDA"),
        }
    }
}

/// Locations of the model artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPaths {
    pub model: PathBuf,
    pub tokenizer: PathBuf,
}

impl ModelPaths {
    pub fn new(dir: impl AsRef<Path>, model_file: &str, tokenizer_file: &str) -> Self {
        let dir = dir.as_ref();
        Self {
            model: dir.join(model_file),
            tokenizer: dir.join(tokenizer_file),
        }
    }

    /// Fail early when either artifact is absent
    pub fn verify(&self) -> Result<(), InferenceError> {
        for path in [&self.model, &self.tokenizer] {
            if !path.is_file() {
                return Err(InferenceError::ArtifactMissing(path.display().to_string()));
            }
        }
        Ok(())
    }
}

/// Session and tokenizer settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OnnxOptions {
    pub max_length: usize,
    pub intra_threads: usize,
    pub use_cuda: bool,
}

impl Default for OnnxOptions {
    fn default() -> Self {
        Self {
            max_length: 512,
            intra_threads: 4,
            use_cuda: false,
        }
    }
}

/// Fine-tuned transformer classifier loaded from an ONNX export
pub struct OnnxClassifier {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    input_names: Vec<String>,
    device: Device,
}

impl std::fmt::Debug for OnnxClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxClassifier")
            .field("device", &self.device)
            .field("inputs", &self.input_names)
            .finish()
    }
}

impl OnnxClassifier {
    /// Load the model and tokenizer from disk
    pub fn load(paths: &ModelPaths, options: OnnxOptions) -> Result<Self, InferenceError> {
        paths.verify()?;

        let device = if options.use_cuda {
            Device::Cuda
        } else {
            Device::Cpu
        };

        info!(?device, model = %paths.model.display(), "Loading mood classifier");

        let tokenizer = load_tokenizer(&paths.tokenizer, options.max_length)?;
        let session = create_session(&paths.model, options)?;

        let input_names: Vec<String> = session.inputs.iter().map(|i| i.name.clone()).collect();
        debug!(
            inputs = ?input_names,
            outputs = ?session.outputs.iter().map(|o| &o.name).collect::<Vec<_>>(),
            "Classifier model loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            input_names,
            device,
        })
    }

    fn run_inference(&self, text: &str) -> Result<Vec<f32>, InferenceError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| InferenceError::Tokenizer(e.to_string()))?;

        let seq_len = encoding.get_ids().len();
        if seq_len == 0 {
            return Err(InferenceError::Tokenizer("Empty token sequence".to_string()));
        }

        let widen = |ids: &[u32]| -> Box<[i64]> { ids.iter().map(|&v| v as i64).collect() };

        // Feed only the inputs the exported graph declares
        let mut inputs: Vec<(String, SessionInputValue<'static>)> = Vec::new();
        for name in &self.input_names {
            let data = match name.as_str() {
                "input_ids" => widen(encoding.get_ids()),
                "attention_mask" => widen(encoding.get_attention_mask()),
                "token_type_ids" => widen(encoding.get_type_ids()),
                other => {
                    return Err(InferenceError::Onnx(format!(
                        "Unsupported model input '{other}'"
                    )))
                }
            };
            let tensor = Tensor::from_array(([1usize, seq_len], data))
                .map_err(|e| InferenceError::Onnx(e.to_string()))?;
            inputs.push((name.clone(), tensor.into()));
        }

        // Lock session for inference
        let mut session = self
            .session
            .lock()
            .map_err(|e| InferenceError::Onnx(format!("Session lock error: {e}")))?;

        // Get output name before running (to avoid borrow conflicts)
        let output_name = session.outputs[0].name.clone();

        let outputs = session
            .run(inputs)
            .map_err(|e| InferenceError::Onnx(e.to_string()))?;

        let output = outputs
            .get(output_name.as_str())
            .ok_or_else(|| InferenceError::Onnx(format!("Output '{}' not found", output_name)))?;

        // Logits shaped [1, num_labels]
        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| InferenceError::Onnx(e.to_string()))?;

        debug!(?shape, seq_len, "Classifier output");

        if data.is_empty() {
            return Err(InferenceError::EmptyOutput);
        }

        Ok(data.to_vec())
    }
}

impl SequenceClassifier for OnnxClassifier {
    fn logits(&self, text: &str) -> Result<Vec<f32>, InferenceError> {
        self.run_inference(text)
    }

    fn name(&self) -> &str {
        "onnx"
    }
}

/// Loads the artifact afresh for every call
#[derive(Debug, Clone)]
pub struct ReloadingClassifier {
    paths: ModelPaths,
    options: OnnxOptions,
}

impl ReloadingClassifier {
    /// Loads the artifacts once and discards them, so a missing or corrupt
    /// model still fails at startup
    pub fn new(paths: ModelPaths, options: OnnxOptions) -> Result<Self, InferenceError> {
        drop(OnnxClassifier::load(&paths, options)?);
        Ok(Self { paths, options })
    }
}

impl SequenceClassifier for ReloadingClassifier {
    fn logits(&self, text: &str) -> Result<Vec<f32>, InferenceError> {
        OnnxClassifier::load(&self.paths, self.options)?.run_inference(text)
    }

    fn name(&self) -> &str {
        "onnx-per-call"
    }
}

fn artifact_invalid(path: &Path, reason: impl std::fmt::Display) -> InferenceError {
    InferenceError::ArtifactInvalid {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

fn load_tokenizer(path: &Path, max_length: usize) -> Result<Tokenizer, InferenceError> {
    let mut tokenizer = Tokenizer::from_file(path).map_err(|e| artifact_invalid(path, e))?;

    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length,
            ..Default::default()
        }))
        .map_err(|e| artifact_invalid(path, e))?;
    // Single sequences never need padding
    tokenizer.with_padding(None);

    Ok(tokenizer)
}

fn create_session(model_path: &Path, options: OnnxOptions) -> Result<Session, InferenceError> {
    let model_bytes = std::fs::read(model_path).map_err(|e| artifact_invalid(model_path, e))?;

    let mut builder = Session::builder().map_err(|e| InferenceError::Onnx(e.to_string()))?;

    builder = builder
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| InferenceError::Onnx(e.to_string()))?;

    builder = builder
        .with_intra_threads(options.intra_threads)
        .map_err(|e| InferenceError::Onnx(e.to_string()))?;

    if options.use_cuda {
        #[cfg(feature = "cuda")]
        {
            use ort::execution_providers::CUDAExecutionProvider;
            builder = builder
                .with_execution_providers([CUDAExecutionProvider::default().build()])
                .map_err(|e| InferenceError::Onnx(e.to_string()))?;
        }
        #[cfg(not(feature = "cuda"))]
        {
            tracing::warn!("CUDA requested but not compiled with cuda feature, using CPU");
        }
    }

    builder
        .commit_from_memory(&model_bytes)
        .map_err(|e| artifact_invalid(model_path, e))
}
