//! Argument parsing for running from the command line

use clap::Parser;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// UIO device node for the converter's register window
    #[clap(long, default_value = "/dev/uio0")]
    pub adc_uio: String,
    /// UIO device node for the RX DMA engine's register window
    #[clap(long, default_value = "/dev/uio1")]
    pub dma_uio: String,
    /// Physical address of the receive buffer (hex, sans leading 0x)
    #[clap(short, long, value_parser = valid_phys_addr, default_value = "8000000")]
    pub buffer_addr: u32,
    /// Samples to capture; each fills two buffer words (one I/Q pair per
    /// converter channel pair)
    #[clap(short, long, default_value_t = 16384)]
    #[clap(value_parser = clap::value_parser!(u32).range(1..))]
    pub samples: u32,
    /// Output CSV path (defaults to a timestamped name)
    #[clap(short, long)]
    pub out: Option<String>,
    /// Give up on a wedged transfer after this many milliseconds (0 polls
    /// forever)
    #[clap(short, long, default_value_t = 5000)]
    pub timeout_ms: u64,
    #[clap(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity,
}

/// Match verbosity filter with tracing subscriber log levels
pub fn convert_filter(filter: log::LevelFilter) -> tracing_subscriber::filter::LevelFilter {
    match filter {
        log::LevelFilter::Off => tracing_subscriber::filter::LevelFilter::OFF,
        log::LevelFilter::Error => tracing_subscriber::filter::LevelFilter::ERROR,
        log::LevelFilter::Warn => tracing_subscriber::filter::LevelFilter::WARN,
        log::LevelFilter::Info => tracing_subscriber::filter::LevelFilter::INFO,
        log::LevelFilter::Debug => tracing_subscriber::filter::LevelFilter::DEBUG,
        log::LevelFilter::Trace => tracing_subscriber::filter::LevelFilter::TRACE,
    }
}

fn valid_phys_addr(s: &str) -> Result<u32, String> {
    u32::from_str_radix(s, 16).map_err(|_| "Invalid hex litteral".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_addr_parses_as_hex() {
        assert_eq!(valid_phys_addr("8000000"), Ok(0x0800_0000));
        assert!(valid_phys_addr("0xgg").is_err());
    }
}
