use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use vipstitch::codec::{CodecId, DEFAULT_COMPRESSION_LEVEL, DEFAULT_WINDOW};
use vipstitch::file::{inspect, read_vip, recode, ReadOptions, WriteOptions};

#[derive(Parser)]
#[command(name = "vip", about = "Inspect and recode VIP embroidery designs")]
struct Cli {
    /// Codec the stream payloads were written with: zstd (default), lz4, brotli, lzma, none
    #[arg(short, long, global = true, default_value = "zstd")]
    codec: String,
    /// Compressor window parameter
    #[arg(short, long, global = true, default_value_t = DEFAULT_WINDOW)]
    window: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show header, stream layout and palette
    Info {
        input: PathBuf,
    },
    /// Print the decoded stitch list
    Dump {
        input: PathBuf,
        /// Emit the whole design as JSON
        #[arg(long)]
        json: bool,
    },
    /// Rewrite the stream payloads with another codec
    Recode {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Target codec
        #[arg(long, default_value = "zstd")]
        to: String,
        /// Compression level (zstd 1-19; brotli 0-11; ignored otherwise)
        #[arg(short, long, default_value_t = DEFAULT_COMPRESSION_LEVEL)]
        level: i32,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let read_opts = ReadOptions { codec: parse_codec(&cli.codec), window: cli.window };

    match cli.command {

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input } => {
            let info = inspect(&input)?;
            let h = &info.header;
            println!("── VIP design ───────────────────────────────────────────");
            println!("  Path           {}", input.display());
            println!("  Magic          {:#010x}", h.magic);
            println!("  Stitches       {}", h.stitch_count);
            println!("  Colors         {}", h.color_count);
            println!("  Hoop +X/+Y     {} / {}", h.hoop.positive_x, h.hoop.positive_y);
            println!("  Hoop -X/-Y     {} / {}", h.hoop.negative_x, h.hoop.negative_y);
            println!("  Attribute      {:#x}..{:#x}", info.layout.attribute.start, info.layout.attribute.end);
            println!("  X deltas       {:#x}..{:#x}", info.layout.x.start, info.layout.x.end);
            println!("  Y deltas       {:#x}..{:#x}", info.layout.y.start, info.layout.y.end);
            println!("  Reserved       {}", hex::encode(h.reserved_string));
            println!("  File length    {} B", info.file_len);
            println!("  Palette ({}):", info.palette.len());
            for (i, t) in info.palette.iter().enumerate() {
                println!("    {:>2}  #{}  flag={:#04x}",
                    i, hex::encode([t.color.r, t.color.g, t.color.b]), t.flag);
            }
        }

        // ── Dump ─────────────────────────────────────────────────────────────
        Commands::Dump { input, json } => {
            let pattern = read_vip(&input, &read_opts)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&pattern)?);
            } else {
                println!("{:>6} {:>8} {:>8}  Type", "#", "dx", "dy");
                for (i, (dx, dy, kind)) in pattern.relative_moves().enumerate() {
                    println!("{:>6} {:>8.1} {:>8.1}  {:?}", i, dx, dy, kind);
                }
            }
        }

        // ── Recode ───────────────────────────────────────────────────────────
        Commands::Recode { input, output, to, level } => {
            let write_opts = WriteOptions {
                codec: parse_codec(&to),
                level,
                window: cli.window,
                ..WriteOptions::default()
            };
            let pattern = recode(&input, &output, &read_opts, &write_opts)?;
            println!("Recoded {} stitches → {}", pattern.stitch_count(), output.display());
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn parse_codec(s: &str) -> CodecId {
    CodecId::from_name(s).unwrap_or_else(|| {
        eprintln!("Unknown codec '{}', defaulting to zstd", s);
        CodecId::Zstd
    })
}
