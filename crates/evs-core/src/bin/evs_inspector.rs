//! EVS payload and SDP inspector
//!
//! Decodes EVS RTP payload headers and negotiates `a=fmtp` lines from the
//! command line, to help with interop debugging.

use rvoip_evs_core::bitstream::header::{is_header_type, parse_cmr, BandwidthClass};
use rvoip_evs_core::{negotiate, parse_payload, BitOrder, CapabilityRecord, Perspective};

fn usage(program: &str) -> ! {
    eprintln!("Usage:");
    eprintln!("  {} fmtp <params>                parse and regenerate an fmtp line", program);
    eprintln!("  {} joint <local> <remote>       negotiate two fmtp lines", program);
    eprintln!("  {} toc <hex payload>            decode payload headers", program);
    eprintln!("Example: {} joint \"br=13.2-24.4;bw=nb-swb\" \"br=7.2-16.4\"", program);
    std::process::exit(1);
}

fn parse_hex(text: &str) -> Option<Vec<u8>> {
    let digits: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.len() % 2 != 0 {
        return None;
    }
    digits
        .chunks(2)
        .map(|pair| {
            let byte: String = pair.iter().collect();
            u8::from_str_radix(&byte, 16).ok()
        })
        .collect()
}

fn parse_local(text: &str) -> CapabilityRecord {
    match text.parse() {
        Ok(record) => record,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_record(label: &str, record: &CapabilityRecord) {
    println!("{}:", label);
    println!("  evs-mode-switch: {:?}", record.evs_mode_switch);
    println!("  dtx:             {:?} (send {}, recv {})", record.dtx, record.dtx_send, record.dtx_recv);
    println!("  cmr:             {:?}", record.cmr);
    println!("  br-send:         {:?}", record.br_send);
    println!("  br-recv:         {:?}", record.br_recv);
    println!("  bw-send:         {:?}", record.bw_send);
    println!("  bw-recv:         {:?}", record.bw_recv);
    println!("  ch-aw:           send {}, recv {}", record.ch_aw_send, record.ch_aw_recv);
    println!("  mode-set:        {:?}", record.mode_set);
    println!("  fmtp:            {}", record);
}

fn inspect_payload(packet: &[u8]) {
    println!("Payload: {} bytes", packet.len());
    if let Some(&first) = packet.first() {
        if is_header_type(first) {
            match parse_cmr(first) {
                Some(mode) => println!(
                    "  CMR:  0x{:02X} -> request 0x{:02X} ({:?}, rate index {})",
                    first,
                    mode,
                    BandwidthClass::from_mode(mode),
                    mode & 0x0f
                ),
                None => println!("  CMR:  0x{:02X} -> no request", first),
            }
        }
    }

    match parse_payload(packet, &BitOrder::amr_wb_io()) {
        Ok(parsed) => {
            println!(
                "  ToC:  0x{:02X} -> {} index {}{}",
                parsed.toc.to_byte(),
                parsed.toc.family,
                parsed.toc.rate_index,
                if parsed.bad_frame { " (bad frame)" } else { "" }
            );
            println!("  Rate: {:?}, {} bps, {} bits", parsed.info.bucket, parsed.info.bit_rate, parsed.bit_count);
            if let Some(sid) = parsed.info.sid {
                println!("  SID:  {:?}, CMI {:?}", sid, parsed.info.cmi);
            }
        }
        Err(e) => println!("  Error: {}", e),
    }
}

fn main() {
    let _ = rvoip_evs_core::init();

    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map_or("evs_inspector", String::as_str);

    match args.get(1).map(String::as_str) {
        Some("fmtp") if args.len() >= 3 => {
            let local = parse_local(&args[2]);
            print_record("Local", &local);
            let remote = rvoip_evs_core::parse_fmtp(&args[2], Perspective::Remote);
            print_record("As remote", &remote);
        }
        Some("joint") if args.len() >= 4 => {
            let local = parse_local(&args[2]);
            match negotiate(&local, &args[3]) {
                Ok(joint) => {
                    print_record("Joint", &joint);
                    if let Some(line) = joint.sdp_fmtp_line(96) {
                        print!("{}", line);
                    }
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(2);
                }
            }
        }
        Some("toc") if args.len() >= 3 => match parse_hex(&args[2..].join("")) {
            Some(packet) => inspect_payload(&packet),
            None => {
                eprintln!("Error: '{}' is not a hex string", args[2..].join(" "));
                std::process::exit(1);
            }
        },
        _ => usage(program),
    }
}
