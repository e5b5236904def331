//! BLIP captioning model running on candle
//!
//! Loads the vision encoder and text decoder weights from the HuggingFace Hub
//! once, then serves captions through [`Captioner`].

use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use candle_core::{DType, Device, Module, Tensor, D};
use candle_nn::VarBuilder;
use candle_transformers::models::blip;
use hf_hub::{api::sync::Api, Repo, RepoType};
use image::DynamicImage;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use super::beam::{beam_search, BeamSearchConfig};
use super::preprocess;
use super::{Captioner, GenerationConfig};
use crate::config::ModelArgs;
use crate::error::{CaptionError, CaptionResult};

/// `[DEC]` token that starts every caption
pub const DEC_TOKEN_ID: u32 = 30522;

/// `[SEP]` token that ends a caption
pub const SEP_TOKEN_ID: u32 = 102;

/// Size of the pretrained vision tower
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlipVariant {
    Base,
    Large,
}

impl BlipVariant {
    /// Infer the variant from a hub model id
    pub fn from_model_id(model_id: &str) -> Self {
        if model_id.to_ascii_lowercase().contains("large") {
            Self::Large
        } else {
            Self::Base
        }
    }

    pub fn config(self) -> blip::Config {
        let mut config = blip::Config::image_captioning_large();
        if self == Self::Base {
            config.vision_config.hidden_size = 768;
            config.vision_config.intermediate_size = 3072;
            config.vision_config.num_hidden_layers = 12;
            config.vision_config.num_attention_heads = 12;
            config.text_config.encoder_hidden_size = 768;
        }
        config
    }
}

fn select_device(force_cpu: bool) -> CaptionResult<Device> {
    if force_cpu {
        return Ok(Device::Cpu);
    }

    #[cfg(feature = "cuda")]
    {
        if let Ok(device) = Device::cuda_if_available(0) {
            return Ok(device);
        }
    }

    #[cfg(feature = "metal")]
    {
        if let Ok(device) = Device::metal_if_available(0) {
            return Ok(device);
        }
    }

    Ok(Device::Cpu)
}

fn device_label(device: &Device) -> &'static str {
    if device.is_cuda() {
        "cuda"
    } else if device.is_metal() {
        "metal"
    } else {
        "cpu"
    }
}

/// BLIP image-captioning model with its tokenizer
pub struct BlipCaptioner {
    // the text decoder owns a KV cache, hence the lock
    model: Mutex<blip::BlipForConditionalGeneration>,
    tokenizer: Tokenizer,
    device: Device,
    generation: GenerationConfig,
    model_id: String,
}

impl std::fmt::Debug for BlipCaptioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlipCaptioner")
            .field("model_id", &self.model_id)
            .field("device", &device_label(&self.device))
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl BlipCaptioner {
    /// Download (or reuse cached) weights and tokenizer and build the model.
    ///
    /// Blocking; call once at startup.
    pub fn load(args: &ModelArgs) -> CaptionResult<Self> {
        let start = Instant::now();
        let device = select_device(args.force_cpu)?;
        let variant = BlipVariant::from_model_id(&args.model_id);
        info!(
            "Loading BLIP model {} ({:?}, revision {}) on {}",
            args.model_id,
            variant,
            args.revision,
            device_label(&device)
        );

        let api = Api::new()?;
        let repo = api.repo(Repo::with_revision(
            args.model_id.clone(),
            RepoType::Model,
            args.revision.clone(),
        ));
        let weights = repo.get("model.safetensors")?;
        debug!("Weights at {}", weights.display());

        let tokenizer_file = if args.tokenizer_repo() == args.model_id {
            repo.get("tokenizer.json")?
        } else {
            api.model(args.tokenizer_repo().to_string())
                .get("tokenizer.json")?
        };
        let tokenizer = Tokenizer::from_file(&tokenizer_file)
            .map_err(|e| CaptionError::Tokenizer(format!("Tokenizer loading failed: {}", e)))?;

        let config = variant.config();
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights], DType::F32, &device)? };
        let model = blip::BlipForConditionalGeneration::new(&config, vb)?;

        info!(
            "BLIP model loaded in {} ms",
            start.elapsed().as_millis()
        );

        Ok(Self {
            model: Mutex::new(model),
            tokenizer,
            device,
            generation: GenerationConfig::default(),
            model_id: args.model_id.clone(),
        })
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    fn beam_config(&self) -> BeamSearchConfig {
        BeamSearchConfig {
            beam_width: self.generation.num_beams,
            max_length: self.generation.max_length,
            bos_token_id: DEC_TOKEN_ID,
            eos_token_id: SEP_TOKEN_ID,
            length_penalty: 1.0,
        }
    }
}

impl Captioner for BlipCaptioner {
    fn generate(&self, image: &DynamicImage) -> CaptionResult<String> {
        let start = Instant::now();
        let pixels = preprocess::to_tensor(image, &self.device)?;

        // a poisoned lock only means an earlier call panicked; the cache is
        // reset before every forward pass
        let mut model = self.model.lock().unwrap_or_else(PoisonError::into_inner);
        let image_embeds = model.vision_model().forward(&pixels)?;

        let device = &self.device;
        let tokens = beam_search(&self.beam_config(), |sequences| {
            let batch = sequences.len();
            let seq_len = sequences[0].len();
            let input_ids = Tensor::from_vec(sequences.concat(), (batch, seq_len), device)?;
            let embeds = image_embeds.repeat((batch, 1, 1))?;

            model.reset_kv_cache();
            let logits = model.text_decoder().forward(&input_ids, &embeds)?;
            let last = logits.narrow(1, seq_len - 1, 1)?.squeeze(1)?;
            let log_probs = candle_nn::ops::log_softmax(&last, D::Minus1)?;
            Ok(log_probs.to_dtype(DType::F32)?.to_vec2::<f32>()?)
        })?;
        model.reset_kv_cache();
        drop(model);

        let caption = self
            .tokenizer
            .decode(&tokens, true)
            .map_err(|e| CaptionError::Tokenizer(format!("Token decoding failed: {}", e)))?;
        debug!(
            "Generated {} tokens in {} ms",
            tokens.len(),
            start.elapsed().as_millis()
        );

        Ok(caption.trim().to_string())
    }
}
