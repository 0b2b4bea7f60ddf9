use clap::Parser;
use saleae_socket_client::{DEFAULT_HOST, DEFAULT_PORT};
use saleae_uart_logger::workflow::{Settings, DEFAULT_SAMPLE_RATE};
use std::path::PathBuf;
use std::time::Duration;

/// Repeatedly capture with a Logic device and export every analyzer to timestamped CSV files
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Host of the Logic socket service.
    #[clap(long, default_value = DEFAULT_HOST, env = "SALEAE_HOST")]
    host: String,

    /// Port of the Logic socket service.
    #[clap(long, default_value_t = DEFAULT_PORT, env = "SALEAE_PORT")]
    port: u16,

    /// Digital sample rate to select, in samples per second.
    #[clap(long, default_value_t = DEFAULT_SAMPLE_RATE)]
    sample_rate: u32,

    /// Directory the per channel output directories are created in [default: current directory]
    #[clap(long)]
    output_dir: Option<PathBuf>,

    /// Pause after every capture, in milliseconds.
    #[clap(long, default_value = "0")]
    settle_ms: u64,
}

#[derive(Debug, Clone)]
pub struct Cli {
    pub host: String,
    pub port: u16,
    pub settings: Settings,
}

pub fn cli() -> anyhow::Result<Cli> {
    from_args(Args::parse())
}

fn from_args(args: Args) -> anyhow::Result<Cli> {
    let output_dir = match args.output_dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    let mut settings = Settings::new(output_dir);
    settings.sample_rate = args.sample_rate;
    settings.settle = Duration::from_millis(args.settle_ms);

    Ok(Cli {
        host: args.host,
        port: args.port,
        settings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let argv = std::iter::once("saleae-uart-logger").chain(args.iter().copied());
        let args = Args::try_parse_from(argv).unwrap();
        from_args(args).unwrap()
    }

    #[test]
    fn settle_is_given_in_milliseconds() {
        let cli = parse(&["--settle-ms", "1000", "--output-dir", "/data"]);
        assert_eq!(cli.settings.settle, Duration::from_secs(1));
        assert_eq!(cli.settings.output_dir, PathBuf::from("/data"));
    }

    #[test]
    fn defaults() {
        let cli = parse(&[]);
        assert_eq!(cli.settings.settle, Duration::ZERO);
        assert_eq!(cli.settings.sample_rate, DEFAULT_SAMPLE_RATE);
        assert_eq!(cli.settings.output_dir, std::env::current_dir().unwrap());
    }

    #[test]
    fn sample_rate_override() {
        let cli = parse(&["--sample-rate", "500000000"]);
        assert_eq!(cli.settings.sample_rate, 500_000_000);
    }
}
