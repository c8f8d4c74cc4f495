use std::path::PathBuf;

use retrolink::Command;

const USAGE: &str = "Usage:\n  \
    retrolink printer <capture> [out_dir]\n  \
    retrolink mobile <capture> [config.bin]\n  \
    retrolink peer <server_port> <host> <client_port> [bytes...]";

fn usage() -> ! {
    eprintln!("{USAGE}");
    std::process::exit(2);
}

fn parse_port(value: Option<String>) -> u16 {
    let value = value.unwrap_or_else(|| usage());
    value.parse().unwrap_or_else(|_| {
        eprintln!("Invalid port '{value}'.");
        std::process::exit(2);
    })
}

fn parse_byte(value: &str) -> u8 {
    let digits = value.trim_start_matches("0x").trim_start_matches("0X");
    u8::from_str_radix(digits, 16).unwrap_or_else(|_| {
        eprintln!("Invalid byte '{value}'; expected hex such as 0x42.");
        std::process::exit(2);
    })
}

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let mode = args.next().unwrap_or_else(|| usage());

    let command = match mode.as_str() {
        "printer" => Command::Printer {
            capture: args.next().map(PathBuf::from).unwrap_or_else(|| usage()),
            out_dir: args.next().map(PathBuf::from).unwrap_or_else(|| PathBuf::from(".")),
        },
        "mobile" => Command::Mobile {
            capture: args.next().map(PathBuf::from).unwrap_or_else(|| usage()),
            config: args.next().map(PathBuf::from),
        },
        "peer" => Command::Peer {
            server_port: parse_port(args.next()),
            host: args.next().unwrap_or_else(|| usage()),
            client_port: parse_port(args.next()),
            bytes: args.map(|arg| parse_byte(&arg)).collect(),
        },
        other => {
            eprintln!("Unknown mode '{}'. Supported: printer, mobile, peer", other);
            std::process::exit(1);
        }
    };

    if let Err(err) = retrolink::run(command) {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}
