use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::fs;
use tokio_util::sync::CancellationToken;

use lingokit_core::{
    GeminiClient, KitOptions, LingokitError, ProviderConfig, SrtMode, export_dub_audio,
    export_source_media, export_srt, load_study_kit, mux_command, render_dub_track,
    save_study_kit, speak,
};

/// CLI wrapper for SrtMode (needed for clap ValueEnum)
#[derive(Clone, Default, ValueEnum)]
enum CliSrtMode {
    #[default]
    Bilingual,
    Original,
    Translated,
}

impl From<CliSrtMode> for SrtMode {
    fn from(cli: CliSrtMode) -> Self {
        match cli {
            CliSrtMode::Bilingual => SrtMode::Bilingual,
            CliSrtMode::Original => SrtMode::Original,
            CliSrtMode::Translated => SrtMode::Translated,
        }
    }
}

#[derive(Parser)]
#[command(name = "lingokit")]
#[command(
    about = "Turn a video or audio file into a bilingual study kit: subtitles, notes, flashcards, and a dubbed audio track"
)]
struct Cli {
    /// Media file (video or audio)
    media: PathBuf,

    /// Source language of the media (e.g. "Japanese"). Auto-detected when omitted.
    #[arg(short, long)]
    lang: Option<String>,

    /// Translation target language
    #[arg(short, long, default_value = "en")]
    target_lang: String,

    /// Skip study notes
    #[arg(long)]
    no_notes: bool,

    /// Skip vocabulary flashcards
    #[arg(long)]
    no_flashcards: bool,

    /// Subtitle export mode
    #[arg(short = 'm', long, default_value = "bilingual")]
    srt_mode: CliSrtMode,

    /// Synthesize a dubbed audio track from the translated lines
    #[arg(short, long)]
    dub: bool,

    /// Voice for the dubbed track
    #[arg(long)]
    voice: Option<String>,

    /// Speak one translated line (1-based index) through the local speech tool
    #[arg(long, value_name = "LINE")]
    speak: Option<usize>,

    /// Also export a byte-identical copy of the source media
    #[arg(long)]
    copy_media: bool,

    /// Reuse a previously saved kit JSON instead of calling the AI service
    #[arg(long, value_name = "KIT_JSON")]
    from_kit: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    out: PathBuf,
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    // The AI client is only needed when generating or dubbing; a saved kit
    // can be re-exported without a credential. When it is needed, validate
    // the credential before any work starts.
    let needs_ai = cli.from_kit.is_none() || cli.dub;
    let client = if needs_ai {
        let config = match ProviderConfig::from_env() {
            Ok(mut config) => {
                if let Some(voice) = &cli.voice {
                    config.tts_voice = voice.clone();
                }
                config
            }
            Err(e) => {
                eprintln!("{} {}", style("Error:").red().bold(), e);
                std::process::exit(1);
            }
        };
        Some(GeminiClient::new(config)?)
    } else {
        None
    };

    // Ctrl-C cancels all in-flight work cooperatively
    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_cancel.cancel();
        }
    });

    let opts = KitOptions {
        source_language: cli.lang.clone(),
        target_language: cli.target_lang.clone(),
        notes: !cli.no_notes,
        flashcards: !cli.no_flashcards,
    };

    fs::create_dir_all(&cli.out).await?;
    let stem = cli
        .media
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "media".to_string());

    println!(
        "\n{}  {}\n",
        style("lingokit").cyan().bold(),
        style("Study Kit Generator").dim()
    );

    // Step 1: Generate the kit, or reuse a saved one
    let kit = if let Some(kit_path) = &cli.from_kit {
        let kit = load_study_kit(kit_path).await?;
        println!(
            "{} Loaded: {} subtitles, {} notes, {} flashcards {}",
            style("✓").green().bold(),
            kit.subtitles.len(),
            kit.notes.len(),
            kit.flashcards.len(),
            style("(saved kit)").dim()
        );
        kit
    } else {
        let client = client
            .as_ref()
            .expect("client is built whenever no saved kit is given");
        let spinner = create_spinner("Analyzing media with Gemini...");
        let progress_spinner = spinner.clone();
        let kit = match client
            .generate_study_kit(&cli.media, &opts, &cancel, move |pct| {
                if pct < 100 {
                    progress_spinner.set_message(format!("Processing upload... {pct}%"));
                } else {
                    progress_spinner.set_message("Generating study kit...".to_string());
                }
            })
            .await
        {
            Ok(kit) => kit,
            Err(LingokitError::Cancelled) => {
                spinner.finish_and_clear();
                println!("{}", style("Cancelled.").dim());
                return Ok(());
            }
            Err(e) => {
                spinner.finish_and_clear();
                eprintln!("{} {}", style("Error:").red().bold(), e);
                std::process::exit(1);
            }
        };
        spinner.finish_with_message(format!(
            "{} Generated: {} subtitles, {} notes, {} flashcards",
            style("✓").green().bold(),
            kit.subtitles.len(),
            kit.notes.len(),
            kit.flashcards.len()
        ));
        kit
    };

    // Step 2: Write the kit and subtitles
    if cli.from_kit.is_none() {
        let kit_path = cli.out.join(format!("{stem}.kit.json"));
        save_study_kit(&kit, &kit_path).await?;
        println!(
            "{} Kit saved: {}",
            style("✓").green().bold(),
            style(kit_path.display()).dim()
        );
    }

    let srt_path = cli.out.join(format!("{stem}.srt"));
    export_srt(&kit.subtitles, cli.srt_mode.clone().into(), &srt_path).await?;
    println!(
        "{} Subtitles saved: {}",
        style("✓").green().bold(),
        style(srt_path.display()).dim()
    );

    // Step 3: Optional byte-identical media copy
    if cli.copy_media {
        let copied = export_source_media(&cli.media, &cli.out).await?;
        println!(
            "{} Media copied: {}",
            style("✓").green().bold(),
            style(copied.display()).dim()
        );
    }

    // Step 4: Optional dubbed track
    if cli.dub {
        let total = kit.subtitles.len() as u64;
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{bar:40.cyan/blue} {pos}/{len} lines dubbed")
                .unwrap(),
        );
        let dub_bar = bar.clone();
        let client = client.as_ref().expect("client is built for dubbing");

        let track = match render_dub_track(&kit.subtitles, client, &cancel, move |done, _| {
            dub_bar.set_position(done as u64);
        })
        .await
        {
            Ok(track) => track,
            Err(LingokitError::Cancelled) => {
                bar.finish_and_clear();
                println!("{}", style("Cancelled.").dim());
                return Ok(());
            }
            Err(e) => {
                bar.finish_and_clear();
                eprintln!("{} {}", style("Error:").red().bold(), e);
                std::process::exit(1);
            }
        };
        bar.finish_and_clear();

        let dub_path = cli.out.join(format!("{stem}.dub.wav"));
        export_dub_audio(&track, &dub_path)?;
        println!(
            "{} Dub track saved: {}",
            style("✓").green().bold(),
            style(dub_path.display()).dim()
        );

        let muxed = cli.out.join(format!("{stem}.dubbed.mp4"));
        println!(
            "\n{}\n  {}",
            style("To overlay the dub onto the video, run:").dim(),
            style(mux_command(&cli.media, &dub_path, &muxed)).cyan()
        );
    }

    // Step 5: Optional local playback of one line
    if let Some(line) = cli.speak {
        match kit.subtitles.get(line.saturating_sub(1)) {
            Some(subtitle) => {
                println!(
                    "{} Speaking line {}: {}",
                    style("♪").cyan(),
                    line,
                    style(&subtitle.translation).dim()
                );
                match speak(&subtitle.translation, &cli.target_lang) {
                    Ok(handle) => {
                        if let Err(e) = handle.wait().await {
                            log::warn!("local playback failed: {e}");
                        }
                    }
                    Err(e) => log::warn!("local playback unavailable: {e}"),
                }
            }
            None => eprintln!(
                "{} No subtitle line {} (kit has {})",
                style("Warning:").yellow().bold(),
                line,
                kit.subtitles.len()
            ),
        }
    }

    println!("{}", style("─".repeat(60)).dim());

    Ok(())
}
