//! Command-line and environment configuration

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

pub const DEFAULT_MODEL_ID: &str = "Salesforce/blip-image-captioning-base";

#[derive(Parser, Debug, Clone)]
#[command(
    name = "blip-image-analyzer",
    version,
    about = "Caption images with BLIP and report basic image properties"
)]
pub struct Cli {
    #[command(flatten)]
    pub model: ModelArgs,

    #[command(flatten)]
    pub serve: ServeArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// The subcommand to run, `serve` when none was given
    pub fn resolved_command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Serve the upload form and the analysis endpoints
    Serve,
    /// Analyze a single image file and print the result
    Analyze {
        /// Path to the image file
        path: PathBuf,
    },
}

/// Which pretrained captioning weights to load
#[derive(Args, Debug, Clone, PartialEq)]
pub struct ModelArgs {
    /// HuggingFace model repository
    #[arg(long, env = "BLIP_MODEL_ID", default_value = DEFAULT_MODEL_ID)]
    pub model_id: String,

    /// Repository revision (branch, tag or commit)
    #[arg(long, env = "BLIP_REVISION", default_value = "main")]
    pub revision: String,

    /// Repository holding tokenizer.json, defaults to the model repository
    #[arg(long, env = "BLIP_TOKENIZER_REPO")]
    pub tokenizer_repo: Option<String>,

    /// Run on CPU even if an accelerator is available
    #[arg(long = "cpu", env = "BLIP_FORCE_CPU")]
    pub force_cpu: bool,
}

impl ModelArgs {
    pub fn tokenizer_repo(&self) -> &str {
        self.tokenizer_repo.as_deref().unwrap_or(&self.model_id)
    }
}

impl Default for ModelArgs {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.to_string(),
            revision: "main".to_string(),
            tokenizer_repo: None,
            force_cpu: false,
        }
    }
}

/// Server settings, accepted before or after any subcommand
#[derive(Args, Debug, Clone, PartialEq)]
pub struct ServeArgs {
    /// Interface to bind
    #[arg(long, global = true, env = "ANALYZER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, global = true, env = "ANALYZER_PORT", default_value_t = 7860)]
    pub port: u16,

    /// Maximum accepted request body, in megabytes
    #[arg(long, global = true, env = "ANALYZER_MAX_UPLOAD_MB", default_value_t = 20)]
    pub max_upload_mb: usize,
}

impl ServeArgs {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_flags() {
        let cli = Cli::try_parse_from([
            "blip-image-analyzer",
            "--model-id",
            "Salesforce/blip-image-captioning-large",
            "--revision",
            "refs/pr/18",
            "--cpu",
            "serve",
            "--host",
            "127.0.0.1",
            "--port",
            "8080",
            "--max-upload-mb",
            "5",
        ])
        .unwrap();

        assert_eq!(cli.model.model_id, "Salesforce/blip-image-captioning-large");
        assert_eq!(cli.model.revision, "refs/pr/18");
        assert!(cli.model.force_cpu);
        assert_eq!(cli.resolved_command(), Command::Serve);
        assert_eq!(cli.serve.bind_addr(), "127.0.0.1:8080");
        assert_eq!(cli.serve.max_upload_bytes(), 5 * 1024 * 1024);
    }

    #[test]
    fn test_serve_flags_without_subcommand() {
        let cli = Cli::try_parse_from([
            "blip-image-analyzer",
            "--host",
            "127.0.0.1",
            "--max-upload-mb",
            "2",
        ])
        .unwrap();
        assert_eq!(cli.resolved_command(), Command::Serve);
        assert_eq!(cli.serve.host, "127.0.0.1");
        assert_eq!(cli.serve.max_upload_bytes(), 2 * 1024 * 1024);
    }

    #[test]
    fn test_serve_settings_from_env() {
        std::env::set_var("ANALYZER_PORT", "8081");
        let bare = Cli::try_parse_from(["blip-image-analyzer"]);
        let explicit = Cli::try_parse_from(["blip-image-analyzer", "serve"]);
        std::env::remove_var("ANALYZER_PORT");

        assert_eq!(bare.unwrap().serve.port, 8081);
        assert_eq!(explicit.unwrap().serve.port, 8081);
    }

    #[test]
    fn test_analyze_subcommand() {
        let cli = Cli::try_parse_from(["blip-image-analyzer", "analyze", "photo.jpg"]).unwrap();
        assert_eq!(
            cli.resolved_command(),
            Command::Analyze {
                path: PathBuf::from("photo.jpg")
            }
        );
    }

    #[test]
    fn test_no_subcommand_serves() {
        let cli = Cli::try_parse_from(["blip-image-analyzer"]).unwrap();
        assert_eq!(cli.resolved_command(), Command::Serve);
        assert_eq!(cli.serve.max_upload_mb, 20);
    }

    #[test]
    fn test_tokenizer_repo_falls_back_to_model() {
        let mut args = ModelArgs::default();
        assert_eq!(args.tokenizer_repo(), DEFAULT_MODEL_ID);
        args.tokenizer_repo = Some("lmz/candle-blip".to_string());
        assert_eq!(args.tokenizer_repo(), "lmz/candle-blip");
    }
}
