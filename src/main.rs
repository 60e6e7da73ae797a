use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use byte_slice_cast::AsSliceOf;
use clap::Parser;
use iq_slurper::adc::AdcCore;
use iq_slurper::args::{convert_filter, Args};
use iq_slurper::dma::DmaEngine;
use iq_slurper::{exfil, mapping, regs, unpack, GROUP_BYTES};
use tracing::info;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(convert_filter(args.verbose.log_level_filter()))
        .init();

    // Ctrl-C raises the abort flag; the capture waits check it every pass
    let abort = Arc::new(AtomicBool::new(false));
    let handler_flag = abort.clone();
    ctrlc::set_handler(move || handler_flag.store(true, Ordering::Relaxed))
        .expect("Error setting Ctrl-C handler");

    // Bring the converter out of reset; it streams from here on
    let adc_regs = mapping::UioRegisters::map(&args.adc_uio, regs::adi::MAP_BYTES)?;
    AdcCore::new(adc_regs).initialize();

    // Arm and run the one-shot transfer
    let dma_regs = mapping::UioRegisters::map(&args.dma_uio, regs::dmac::MAP_BYTES)?;
    let mut engine = DmaEngine::new(dma_regs).with_abort_flag(abort);
    if args.timeout_ms > 0 {
        engine = engine.with_timeout(Duration::from_millis(args.timeout_ms));
    }
    engine.capture(args.samples, args.buffer_addr)?;

    // The window is stable once capture returns; map it and decode
    let byte_len = args.samples as usize * GROUP_BYTES;
    let buffer = mapping::RxBuffer::map(args.buffer_addr, byte_len)?;
    let words = buffer
        .as_bytes()
        .as_slice_of::<u32>()
        .context("receive buffer is not word aligned")?;

    let path = args.out.unwrap_or_else(exfil::default_filename);
    let file = File::create(&path).with_context(|| format!("can't create {path}"))?;
    let mut sink = BufWriter::new(file);
    // Two decoded samples per buffer word pair, over the whole window
    exfil::write_records(&mut sink, unpack::records(words, args.samples as usize * 2))?;
    sink.flush()?;

    info!(samples = args.samples, path = path.as_str(), "capture written");
    Ok(())
}
