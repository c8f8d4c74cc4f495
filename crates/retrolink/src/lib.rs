mod sink;

use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use retrolink_net::TcpTransport;
use retrolink_sio::mobile::CONFIG_SIZE;
use retrolink_sio::{Accessory, LinkConfig, RegisterFile, SerialLink};

pub use sink::FileSink;

/// How long to keep polling for the peer before giving up.
const CONNECT_DEADLINE: Duration = Duration::from_secs(30);
const POLL_INTERVAL: Duration = Duration::from_millis(10);
/// Bound on a single byte exchange with a live peer.
const EXCHANGE_TIMEOUT: Duration = Duration::from_secs(5);
/// Cycles advanced per step while waiting for the peer to clock us.
const PASSIVE_STEP: u32 = 512;

pub enum Command {
    /// Shift a capture into a printer; pages land in `out_dir`.
    Printer { capture: PathBuf, out_dir: PathBuf },
    /// Shift a capture into a mobile adapter, optionally loading and saving
    /// its configuration store.
    Mobile {
        capture: PathBuf,
        config: Option<PathBuf>,
    },
    /// Link with another instance. With `bytes` we clock them out as
    /// master; without, we answer whatever the peer clocks in.
    Peer {
        server_port: u16,
        host: String,
        client_port: u16,
        bytes: Vec<u8>,
    },
}

pub fn run(command: Command) -> Result<()> {
    match command {
        Command::Printer { capture, out_dir } => {
            let capture = read_capture(&capture)?;
            run_printer(&capture, &out_dir)?;
        }
        Command::Mobile { capture, config } => {
            let capture = read_capture(&capture)?;
            run_mobile(&capture, config.as_deref())?;
        }
        Command::Peer {
            server_port,
            host,
            client_port,
            bytes,
        } => {
            run_peer(server_port, host, client_port, &bytes)?;
        }
    }
    Ok(())
}

fn read_capture(path: &Path) -> Result<Vec<u8>> {
    log::info!("Replaying capture '{}'", path.display());
    std::fs::read(path).with_context(|| format!("Failed to read capture '{}'", path.display()))
}

/// Clock every byte out as the master console and collect the replies.
fn replay(link: &mut SerialLink, capture: &[u8]) -> Result<Vec<u8>> {
    let mut regs = RegisterFile::default();
    let mut replies = Vec::with_capacity(capture.len());
    for &byte in capture {
        replies.push(link.transfer(&mut regs, byte)?);
    }
    Ok(replies)
}

pub fn run_printer(capture: &[u8], out_dir: &Path) -> Result<()> {
    let config = LinkConfig::builder().accessory(Accessory::Printer).build();
    let mut link = SerialLink::new(config, Box::new(FileSink::new(out_dir)), None);
    let replies = replay(&mut link, capture)?;

    if let Some(printer) = link.printer() {
        println!(
            "Shifted {} bytes, printer status 0x{:02X}, {} strips pending",
            replies.len(),
            printer.status().bits(),
            printer.strip_count()
        );
    }
    Ok(())
}

pub fn run_mobile(capture: &[u8], config_path: Option<&Path>) -> Result<()> {
    let config = LinkConfig::builder()
        .accessory(Accessory::MobileAdapter)
        .build();
    let mut link = SerialLink::new(config, Box::<retrolink_sio::MemorySink>::default(), None);

    if let Some(path) = config_path.filter(|path| path.exists()) {
        let store = load_mobile_config(path)?;
        link.load_mobile_config(store);
    }

    let replies = replay(&mut link, capture)?;
    println!("{}", hex_line(&replies));

    if let (Some(path), Some(adapter)) = (config_path, link.mobile_adapter()) {
        std::fs::write(path, adapter.config_store())
            .with_context(|| format!("Failed to write '{}'", path.display()))?;
        log::info!("Saved mobile adapter config to '{}'", path.display());
    }
    Ok(())
}

fn load_mobile_config(path: &Path) -> Result<[u8; CONFIG_SIZE]> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read '{}'", path.display()))?;
    let Ok(store) = <[u8; CONFIG_SIZE]>::try_from(bytes.as_slice()) else {
        bail!(
            "'{}' holds {} bytes; a mobile adapter config is {CONFIG_SIZE}",
            path.display(),
            bytes.len()
        );
    };
    log::info!("Loaded mobile adapter config from '{}'", path.display());
    Ok(store)
}

pub fn run_peer(server_port: u16, host: String, client_port: u16, bytes: &[u8]) -> Result<()> {
    let config = LinkConfig::builder()
        .accessory(Accessory::PeerLink)
        .server_port(server_port)
        .client_host(host)
        .client_port(client_port)
        .exchange_timeout(EXCHANGE_TIMEOUT)
        .build();
    let transport = TcpTransport::from_config(&config)
        .with_context(|| format!("Failed to listen on port {server_port}"))?;
    let mut link = SerialLink::new(
        config,
        Box::<retrolink_sio::MemorySink>::default(),
        Some(Box::new(transport)),
    );

    let deadline = Instant::now() + CONNECT_DEADLINE;
    loop {
        link.process_network_communication();
        if link.link().is_connected() {
            break;
        }
        if Instant::now() >= deadline {
            bail!("Peer did not connect within {CONNECT_DEADLINE:?}");
        }
        thread::sleep(POLL_INTERVAL);
    }

    if bytes.is_empty() {
        answer_peer(&mut link)
    } else {
        let replies = replay(&mut link, bytes)?;
        println!("{}", hex_line(&replies));
        Ok(())
    }
}

/// Wait as the clocked side, echoing SB back, until the peer hangs up.
fn answer_peer(link: &mut SerialLink) -> Result<()> {
    let mut regs = RegisterFile {
        sc: 0x80,
        ..RegisterFile::default()
    };
    link.write_control(&regs);

    while !link.link().is_terminated() {
        link.tick(PASSIVE_STEP, &mut regs)?;
        if regs.take_interrupt() {
            println!("{:02X}", regs.sb);
            regs.sc = 0x80;
            link.write_control(&regs);
        } else {
            thread::sleep(Duration::from_millis(1));
        }
    }
    log::info!("Peer closed the link");
    Ok(())
}

fn hex_line(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("retrolink_{name}_{}", rand::random::<u32>()))
    }

    #[test]
    fn mobile_config_is_saved_after_a_write() {
        let path = scratch("mobile");
        // Write-config of 0xAB at offset 3, then both acknowledge bytes.
        let mut capture = vec![0x99, 0x66, 0x1A, 0x00, 0x00, 0x02, 0x03, 0xAB];
        let sum: u16 = capture[2..].iter().map(|&b| b as u16).sum();
        capture.extend_from_slice(&sum.to_be_bytes());
        capture.extend_from_slice(&[0x80, 0x00]);

        run_mobile(&capture, Some(&path)).unwrap();
        let saved = std::fs::read(&path).unwrap();
        assert_eq!(saved.len(), CONFIG_SIZE);
        assert_eq!(saved[3], 0xAB);

        // The saved store is picked up again next time.
        run_mobile(&[], Some(&path)).unwrap();
        assert_eq!(std::fs::read(&path).unwrap()[3], 0xAB);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn truncated_mobile_config_is_rejected() {
        let path = scratch("short");
        std::fs::write(&path, [0u8; 10]).unwrap();
        assert!(load_mobile_config(&path).is_err());
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn hex_line_formats_replies() {
        assert_eq!(hex_line(&[0x81, 0x0F, 0x00]), "81 0F 00");
        assert_eq!(hex_line(&[]), "");
    }
}
