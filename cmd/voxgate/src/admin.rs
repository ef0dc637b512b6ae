//! Voiceprint group administration commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Subcommand};
use serde::Serialize;
use voxgate_audio::{AudioNormalizer, CommandEncoder};
use voxgate_xfyun::VoiceprintService;

use crate::config::{resolve_group, ClientSettings, FileConfig, DEFAULT_ENCODER_TIMEOUT_SECS};
use crate::Cli;

/// Group commands
#[derive(Args, Debug)]
pub struct GroupCommand {
    #[command(subcommand)]
    command: GroupSubcommand,
}

#[derive(Subcommand, Debug)]
enum GroupSubcommand {
    /// Create the group
    Create {
        /// Display name [default: the group id]
        #[arg(short, long)]
        name: Option<String>,

        /// Free-form description
        #[arg(short, long, default_value = "")]
        info: String,
    },
    /// Delete the group and every feature in it
    Delete,
}

/// Feature commands
#[derive(Args, Debug)]
pub struct FeatureCommand {
    #[command(subcommand)]
    command: FeatureSubcommand,
}

#[derive(Subcommand, Debug)]
enum FeatureSubcommand {
    /// List enrolled features
    List,
    /// Enroll a WAV recording under a feature id
    Add {
        /// Feature id
        id: String,

        /// WAV file
        audio: PathBuf,

        /// Feature info [default: the feature id]
        #[arg(short, long)]
        info: Option<String>,
    },
    /// Replace the recording of an enrolled feature
    Update {
        /// Feature id
        id: String,

        /// WAV file
        audio: PathBuf,

        /// Feature info [default: the feature id]
        #[arg(short, long)]
        info: Option<String>,
    },
    /// Remove an enrolled feature
    Delete {
        /// Feature id
        id: String,
    },
    /// Find the closest enrolled voices (1:N)
    Search {
        /// WAV file
        audio: PathBuf,

        /// Number of candidates
        #[arg(short = 'k', long, default_value_t = 1)]
        top_k: u32,
    },
    /// Score a recording against one feature (1:1)
    Score {
        /// Feature id
        id: String,

        /// WAV file
        audio: PathBuf,
    },
}

/// Shared state of one admin invocation.
struct Admin {
    voiceprint: VoiceprintService,
    normalizer: AudioNormalizer,
    group: String,
}

impl Admin {
    fn new(cli: &Cli) -> anyhow::Result<Self> {
        let file = FileConfig::from_cli(cli)?;
        let client = ClientSettings::resolve(cli, &file)?.client()?;
        let encoder = file
            .encoder
            .clone()
            .unwrap_or_else(|| voxgate_audio::DEFAULT_ENCODER_PROGRAM.to_string());
        let encoder = CommandEncoder::ffmpeg(encoder).with_timeout(Duration::from_secs(
            file.encoder_timeout_secs
                .unwrap_or(DEFAULT_ENCODER_TIMEOUT_SECS),
        ));
        Ok(Self {
            voiceprint: client.voiceprint(),
            normalizer: AudioNormalizer::new(Arc::new(encoder)),
            group: resolve_group(cli, &file),
        })
    }

    /// Reads a WAV file and encodes it for the voiceprint engine.
    async fn mp3(&self, path: &Path) -> anyhow::Result<Vec<u8>> {
        let wav = tokio::fs::read(path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to read {}: {}", path.display(), e))?;
        let audio = self.normalizer.normalize(&wav).await?;
        Ok(audio.mp3)
    }
}

#[derive(Debug, Serialize)]
struct Done<'a> {
    group: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    feature: Option<&'a str>,
    action: &'a str,
}

impl GroupCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let admin = Admin::new(cli)?;
        let group = admin.group.as_str();
        match &self.command {
            GroupSubcommand::Create { name, info } => {
                let name = name.as_deref().unwrap_or(group);
                let created = admin.voiceprint.create_group(group, name, info).await?;
                output_result(&created, cli.json)
            }
            GroupSubcommand::Delete => {
                admin.voiceprint.delete_group(group).await?;
                output_result(
                    &Done {
                        group,
                        feature: None,
                        action: "deleted",
                    },
                    cli.json,
                )
            }
        }
    }
}

impl FeatureCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let admin = Admin::new(cli)?;
        let group = admin.group.as_str();
        let vp = &admin.voiceprint;
        match &self.command {
            FeatureSubcommand::List => {
                let features = vp.query_feature_list(group).await?;
                output_result(&features, cli.json)
            }
            FeatureSubcommand::Add { id, audio, info } => {
                let mp3 = admin.mp3(audio).await?;
                let info = info.as_deref().unwrap_or(id);
                let feature = vp.create_feature(group, id, info, &mp3).await?;
                output_result(
                    &Done {
                        group,
                        feature: Some(&feature),
                        action: "created",
                    },
                    cli.json,
                )
            }
            FeatureSubcommand::Update { id, audio, info } => {
                let mp3 = admin.mp3(audio).await?;
                let info = info.as_deref().unwrap_or(id);
                vp.update_feature(group, id, info, &mp3).await?;
                output_result(
                    &Done {
                        group,
                        feature: Some(id),
                        action: "updated",
                    },
                    cli.json,
                )
            }
            FeatureSubcommand::Delete { id } => {
                vp.delete_feature(group, id).await?;
                output_result(
                    &Done {
                        group,
                        feature: Some(id),
                        action: "deleted",
                    },
                    cli.json,
                )
            }
            FeatureSubcommand::Search { audio, top_k } => {
                let mp3 = admin.mp3(audio).await?;
                match vp.search_fea(group, &mp3, *top_k).await {
                    Ok(list) => output_result(&list, cli.json),
                    Err(e) if e.is_no_candidates() => {
                        output_result(&Vec::<voxgate_xfyun::FeatureScore>::new(), cli.json)
                    }
                    Err(e) => Err(e.into()),
                }
            }
            FeatureSubcommand::Score { id, audio } => {
                let mp3 = admin.mp3(audio).await?;
                let hit = vp.search_score_fea(group, id, &mp3).await?;
                output_result(&hit, cli.json)
            }
        }
    }
}

/// Prints result as JSON or YAML.
fn output_result<T: Serialize>(result: &T, as_json: bool) -> anyhow::Result<()> {
    print!("{}", render(result, as_json)?);
    Ok(())
}

fn render<T: Serialize>(result: &T, as_json: bool) -> anyhow::Result<String> {
    if as_json {
        Ok(serde_json::to_string_pretty(result)? + "\n")
    } else {
        Ok(serde_yaml::to_string(result)?)
    }
}
