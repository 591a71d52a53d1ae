use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Settings file (defaults to an optional ./clocksync.toml)
    #[arg(long)]
    pub config: Option<String>,

    /// Host sample rate in Hz
    #[arg(long)]
    pub sample_rate: Option<u32>,

    /// Frames per audio block
    #[arg(long)]
    pub block_size: Option<u32>,

    /// Tempo of the internal clock source
    #[arg(short, long)]
    pub bpm: Option<f64>,

    /// Run as if the host refused timebase master
    #[arg(long)]
    pub no_timebase: bool,

    /// Mirror the log to stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// Do not draw the status inspector
    #[arg(long)]
    pub headless: bool,
}
