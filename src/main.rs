use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use colorcrypt::chunk;
use colorcrypt::codec::{self, CodecError, DecodedFile};
use colorcrypt::config::{format_size, Limits};
use colorcrypt::png_io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "colorcrypt", about = "Store files inside PNG images and get them back")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a file into one PNG image (or several, for large files)
    Crypt {
        input: PathBuf,
        /// Output image (default: <name>_encrypted.png in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Encrypt with AES-256-CBC (PBKDF2-SHA256 key derivation)
        #[arg(short, long)]
        password: Option<String>,
        /// JSON limits file (chunk_size, max_chunks, enable_auto_chunking)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Always write a single image, whatever the file size
        #[arg(long)]
        no_chunk: bool,
    },
    /// Recover files from one or more PNG images; parts are joined automatically
    Decrypt {
        #[arg(required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,
        #[arg(short = 'C', long, default_value = ".")]
        output_dir: PathBuf,
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Show the header stored in an image
    Info {
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    match Cli::parse().command {

        // ── Crypt ────────────────────────────────────────────────────────────
        Commands::Crypt { input, output, password, config, no_chunk } => {
            let limits = match config {
                Some(path) => Limits::from_json_file(&path)
                    .with_context(|| format!("reading limits from {}", path.display()))?,
                None => Limits::default(),
            };
            let data = std::fs::read(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            let name = input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| anyhow!("{} has no file name", input.display()))?;
            let output = output.unwrap_or_else(|| default_output(&input));

            let chunked = limits.enable_auto_chunking && !no_chunk;
            if chunked {
                limits.check_file_size(data.len() as u64).with_context(|| {
                    format!(
                        "{} is {}; the limit is {}",
                        input.display(),
                        format_size(data.len() as u64),
                        format_size(limits.max_file_size()),
                    )
                })?;
            }
            let chunk_size = if chunked {
                usize::try_from(limits.chunk_size).unwrap_or(usize::MAX)
            } else {
                usize::MAX
            };
            let parts = chunk::split(&data, chunk_size, limits.max_chunks)?;
            let total = parts.len();
            if total > 1 {
                info!(parts = total, chunk_size = %format_size(limits.chunk_size), "splitting input");
            }

            for (i, part) in parts.iter().enumerate() {
                let part_name = chunk::part_name(&name, i, total);
                let path = part_output_path(&output, i, total);
                let image = codec::encode(part, &part_name, password.as_deref())?;
                png_io::write_png(&image, &path)
                    .with_context(|| format!("writing {}", path.display()))?;
                println!("  packed  {} ({})", path.display(), format_size(part.len() as u64));
            }
            println!("✓ OK: '{}' -> {} image(s)", input.display(), total);
        }

        // ── Decrypt ──────────────────────────────────────────────────────────
        Commands::Decrypt { inputs, output_dir, password } => {
            let mut decoded = Vec::with_capacity(inputs.len());
            for path in &inputs {
                let image = png_io::read_png(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                let file = match codec::decode(&image, password.as_deref()) {
                    Err(CodecError::PasswordRequired) => {
                        bail!("{} is password-protected; pass --password", path.display())
                    }
                    other => other.with_context(|| format!("decoding {}", path.display()))?,
                };
                decoded.push(file);
            }

            std::fs::create_dir_all(&output_dir)
                .with_context(|| format!("creating {}", output_dir.display()))?;
            for file in chunk::collect(decoded)? {
                let saved = save(&output_dir, &file)?;
                println!("✓ OK: -> '{}' ({})", saved.display(), format_size(file.file_bytes.len() as u64));
            }
        }

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input } => {
            let image = png_io::read_png(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            let header = codec::inspect(&image)?;
            let fields = header.fields();

            println!("── ColorCrypt image ─────────────────────────────────────");
            println!("  Path           {}", input.display());
            println!("  Dimensions     {}x{}", image.width(), image.height());
            println!("  Encrypted      {}", header.is_encrypted());
            println!("  File name      {}", fields.file_name);
            println!("  Payload        {} ({} B)", format_size(fields.payload_len), fields.payload_len);
            println!("  SHA-1          {}", hex::encode(fields.digest));
            if let colorcrypt::Header::Encrypted { salt, iv, .. } = &header {
                println!("  Salt           {}", hex::encode(salt));
                println!("  IV             {}", hex::encode(iv));
            }
            if let Some((base, index, total)) = chunk::parse_part_name(&fields.file_name) {
                println!("  Part           {index} of {total} of '{base}'");
            }
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".into());
    PathBuf::from(format!("{stem}_encrypted.png"))
}

/// `out.png` → `out.part002of005.png` for multi-part output.
fn part_output_path(output: &Path, index: usize, total: usize) -> PathBuf {
    if total <= 1 {
        return output.to_path_buf();
    }
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = output
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "png".into());
    output.with_file_name(format!("{}.{ext}", chunk::part_name(&stem, index, total)))
}

/// Write `file` under `dir`, keeping only the last component of the embedded
/// name so it cannot escape `dir`.
fn save(dir: &Path, file: &DecodedFile) -> Result<PathBuf> {
    let name = Path::new(&file.file_name)
        .file_name()
        .ok_or_else(|| anyhow!("refusing to write unsafe file name '{}'", file.file_name))?;
    if name != file.file_name.as_str() {
        warn!(embedded = %file.file_name, "stripped directories from embedded file name");
    }
    let path = dir.join(name);
    std::fs::write(&path, &file.file_bytes)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}
