use std::io;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser as ClapParser;
use log::info;

use subread::{serialiser, source, Format, HitStatus, Timeline};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match run() {
        Ok(()) => (),
        Err(err) => {
            eprintln!("An error occurred: {}", err);
            for cause in err.chain().skip(1) {
                eprintln!("    {}", cause);
            }
            std::process::exit(1);
        }
    }
}

#[derive(ClapParser)]
#[command(about = "Convert SAMI and SRT subtitles to SRT")]
struct Cli {
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "The file to read from. If not supplied, the subtitles will be read from standard input.",
        default_value = "-"
    )]
    input: String,
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "The file to write to. If not supplied, the subtitles will be written to standard output.",
        default_value = "-"
    )]
    output: String,
    #[arg(
        short,
        long,
        value_name = "FORMAT",
        help = "The input format (sami or srt). If not supplied, it is guessed from the file extension."
    )]
    format: Option<Format>,
    #[arg(long, help = "Remove tags such as <font> and <i> from the caption text.")]
    strip_markup: bool,
    #[arg(
        long,
        value_name = "MS",
        help = "Print the caption shown at the given time in milliseconds instead of converting."
    )]
    at: Option<u64>,
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let data = source::read_input(&cli.input)
        .context(format!("Failed to read input: '{}'", cli.input))?;
    let format = cli.format.unwrap_or_else(|| Format::from_path(&cli.input));
    info!("reading '{}' as {:?}", cli.input, format);

    let timeline = source::decode(format, &data)
        .context(format!("Failed to parse {:?} file: '{}'", format, cli.input))?;
    if timeline.is_empty() {
        return Err(anyhow!("You appear to have supplied an empty file."));
    }
    let timeline = if cli.strip_markup {
        timeline.without_markup()
    } else {
        timeline
    };

    if let Some(ms) = cli.at {
        print_caption_at(&timeline, Duration::from_millis(ms));
        return Ok(());
    }

    if cli.output == "-" {
        serialiser::serialise(&timeline, io::stdout().lock())?;
    } else {
        let dst = std::fs::File::create(&cli.output)
            .context(format!("Failed to create output file: '{}'", cli.output))?;
        serialiser::serialise(&timeline, dst).context("Failed to write to output file.")?;
    }

    Ok(())
}

fn print_caption_at(timeline: &Timeline, ts: Duration) {
    if let Some(caption) = timeline.caption_at(ts) {
        println!("{}", caption.text);
        return;
    }
    match timeline.find(ts) {
        Some(next) if next.check_hit(ts) == HitStatus::Early => {
            eprintln!("Nothing shown at {:?}; next caption at {:?}.", ts, next.start)
        }
        _ => eprintln!("Nothing shown at {:?}.", ts),
    }
}
