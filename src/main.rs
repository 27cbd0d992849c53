use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use stegoframe::border::sample_indices;
use stegoframe::metadata::locate_metadata;
use stegoframe::{
    AeadCipher, BorderCodec, Ffmpeg, FrameSink, FrameSource, KeyHandle, LsbChannel, PngSequence,
    Recovery, SequentialLsb, StegoConfig, VideoStego,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// StegoFrame - dual-channel video steganography
///
/// Hides a message in a video twice: in the colour pattern of a corner block
/// of every frame, and encrypted in the LSBs of the leading frames.
#[derive(Parser)]
#[command(name = "stegoframe")]
#[command(version)]
#[command(about = "Dual-channel video steganography", long_about = None)]
struct Cli {
    /// Key file (created on first use)
    #[arg(long, global = true, default_value = "data/stego.key")]
    key: PathBuf,

    /// JSON file overriding codec settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// ffmpeg binary used for video containers
    #[arg(long, global = true, default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Hide a message in a video or PNG frame directory
    Hide {
        /// Input video, or a directory of PNG frames
        #[arg(short, long)]
        input: PathBuf,

        /// Output video (FFV1, e.g. .mkv), or a directory for PNG frames
        #[arg(short, long)]
        output: PathBuf,

        /// Secret message (text)
        #[arg(short, long, conflicts_with = "file")]
        message: Option<String>,

        /// Secret message file path
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Also write a lossy H.264 playback copy (does not keep the LSB channel)
        #[arg(long)]
        preview: Option<PathBuf>,
    },
    /// Recover a hidden message
    Recover {
        /// Encoded video or PNG frame directory
        #[arg(short, long)]
        input: PathBuf,

        /// Output file for the recovered message (optional)
        #[arg(short = 'O', long)]
        output: Option<PathBuf>,
    },
    /// Show what each channel can see in a video
    Inspect {
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Create a new key file
    Keygen {
        /// Replace an existing key
        #[arg(long)]
        force: bool,
    },
}

fn print_banner() {
    println!("╔══════════════════════════════════════════╗");
    println!("║   StegoFrame Video Steganography         ║");
    println!("║   Border + LSB dual channel              ║");
    println!("╚══════════════════════════════════════════╝");
    println!();
}

/// Directories (existing, or extension-less outputs) are PNG sequences.
fn is_png_sequence(path: &Path) -> bool {
    path.is_dir() || (!path.exists() && path.extension().is_none())
}

fn source_for<'a>(path: &Path, ffmpeg: &'a Ffmpeg) -> &'a dyn FrameSource {
    if is_png_sequence(path) {
        &PngSequence
    } else {
        ffmpeg
    }
}

fn sink_for<'a>(path: &Path, ffmpeg: &'a Ffmpeg) -> &'a dyn FrameSink {
    if is_png_sequence(path) {
        &PngSequence
    } else {
        ffmpeg
    }
}

/// Reject lossy output containers up front; they would destroy the LSB channel.
fn validate_lossless_output(path: &Path) -> anyhow::Result<()> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase());
    match ext.as_deref() {
        None | Some("mkv") | Some("avi") | Some("nut") => Ok(()),
        Some("mp4") | Some("webm") | Some("mov") => Err(anyhow::anyhow!(
            "'.{}' output would be re-encoded lossily and lose the hidden data.\n\
             Use an .mkv output (FFV1) or a directory of PNG frames, and --preview for an mp4 copy.",
            ext.unwrap_or_default()
        )),
        Some(other) => {
            eprintln!("[!] Unknown container '.{}'; make sure it stores FFV1 losslessly", other);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<StegoConfig> {
    match path {
        Some(p) => {
            println!("[*] Loading config: {}", p.display());
            Ok(StegoConfig::from_json_file(p)?)
        }
        None => Ok(StegoConfig::default()),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    print_banner();

    let cli = Cli::parse();
    let ffmpeg = Ffmpeg::new(&cli.ffmpeg, std::env::temp_dir().join("stegoframe"));

    match cli.command {
        Commands::Keygen { force } => {
            if cli.key.exists() && !force {
                return Err(anyhow::anyhow!(
                    "Key {} already exists; pass --force to replace it",
                    cli.key.display()
                ));
            }
            let key = KeyHandle::generate();
            key.save(&cli.key)?;
            println!("[✓] Key written to {}", cli.key.display());
            println!("[*] Fingerprint: {}", key.fingerprint());
        }

        Commands::Hide {
            input,
            output,
            message,
            file,
            preview,
        } => {
            validate_lossless_output(&output)?;

            let message = if let Some(msg) = message {
                msg
            } else if let Some(file_path) = file {
                println!("[*] Reading message from file: {}", file_path.display());
                fs::read_to_string(file_path)?
            } else {
                return Err(anyhow::anyhow!("Please provide either --message or --file"));
            };
            println!("[*] Message size: {} chars", message.chars().count());

            let config = load_config(cli.config.as_deref())?;
            let key = KeyHandle::load_or_generate(&cli.key)?;
            println!("[*] Using key {} ({})", cli.key.display(), key.fingerprint());
            let stego = VideoStego::new(config, AeadCipher::new(&key))?;

            println!("[*] Hiding message in: {}", input.display());
            let report = stego.hide_video(
                source_for(&input, &ffmpeg),
                sink_for(&output, &ffmpeg),
                &input,
                &output,
                &message,
            )?;
            println!(
                "[✓] Border channel written to {}/{} frames",
                report.border_frames,
                report.frames.len() - 1
            );
            println!(
                "[✓] {} of {} shards in frames {:?}",
                report.shard_frames.len(),
                report.shard_count,
                report.shard_frames
            );
            if report.dropped_shards > 0 {
                println!(
                    "[!] {} shards dropped: the video is too short for the LSB channel, \
                     only the border channel will recover the message",
                    report.dropped_shards
                );
            }
            println!("[✓] Saved lossless output: {}", output.display());

            if let Some(preview) = preview {
                println!("[*] Writing playback copy: {}", preview.display());
                match ffmpeg.transcode_preview(&output, &preview) {
                    Ok(()) => println!("[✓] Playback copy written (hidden data not preserved)"),
                    Err(e) => println!("[!] Playback copy failed: {}", e),
                }
            }
        }

        Commands::Recover { input, output } => {
            let config = load_config(cli.config.as_deref())?;
            let key = KeyHandle::load_or_generate(&cli.key)?;
            let stego = VideoStego::new(config, AeadCipher::new(&key))?;

            println!("[*] Reading frames: {}", input.display());
            let recovery = stego.recover_video(source_for(&input, &ffmpeg), &input)?;

            let text = match &recovery {
                Recovery::NotFound => {
                    println!("[!] No hidden text found");
                    return Ok(());
                }
                Recovery::Decrypted(t) => {
                    println!("[✓] Decrypted from the LSB channel");
                    t
                }
                Recovery::Border(t) => {
                    println!("[✓] Recovered from the border channel");
                    t
                }
                Recovery::Raw(t) => {
                    println!("[!] LSB text could not be decrypted; showing it raw");
                    t
                }
            };

            if let Some(out_path) = output {
                fs::write(&out_path, text)?;
                println!("[✓] Message saved to {}", out_path.display());
            } else {
                println!("\n╔═══════════════════════════════════════╗");
                println!("║         Recovered Message:            ║");
                println!("╚═══════════════════════════════════════╝");
                println!("{}", text);
            }
        }

        Commands::Inspect { input } => {
            let config = load_config(cli.config.as_deref())?;
            config.validate()?;
            let border = BorderCodec::new(&config);
            let lsb = LsbChannel::new(SequentialLsb);

            println!("[*] Analyzing: {}", input.display());
            let frames = source_for(&input, &ffmpeg).extract_bounded(&input, config.max_frames)?;
            let Some(first) = frames.first() else {
                println!("[!] No frames");
                return Ok(());
            };

            println!("\n╔═══════════════════════════════════════╗");
            println!("║         Video Information:            ║");
            println!("╠═══════════════════════════════════════╣");
            println!("║ Frames:     {}", frames.len());
            println!("║ Dimensions: {}x{}", first.width(), first.height());
            match border.layout(&first.image) {
                Ok(layout) => println!("║ Border capacity: {} chars", layout.capacity_bits() / 8),
                Err(e) => println!("║ Border channel unavailable: {}", e),
            }
            let detected: Vec<usize> = sample_indices(frames.len(), config.sample_frames)
                .into_iter()
                .filter(|&i| border.detect_border_in_frame(&frames[i].image))
                .collect();
            println!("║ Border detected in sampled frames: {:?}", detected);
            match locate_metadata(&frames, &lsb, config.metadata_scan_depth) {
                Some(record) => println!("║ Metadata shard frames: {:?}", record.indices()),
                None => println!("║ Metadata frame: not found"),
            }
            println!("╚═══════════════════════════════════════╝");
        }
    }

    Ok(())
}
