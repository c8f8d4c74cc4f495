use super::scripted::ScriptedTransport;
use super::*;
use crate::config::{Accessory, ConsoleGeneration, LinkConfig};
use crate::error::LinkError;
use crate::registers::{RegisterFile, SerialControl, RP_NO_SIGNAL, SERIAL_INTERRUPT};

fn peer_config() -> LinkConfig {
    LinkConfig::builder()
        .accessory(Accessory::PeerLink)
        .generation(ConsoleGeneration::Cgb)
        .build()
}

fn connected(config: &LinkConfig) -> (LinkController, ScriptedTransport) {
    let transport = ScriptedTransport::new();
    let mut link = LinkController::new(config, Some(transport.boxed()));
    link.process_network_communication();
    assert!(link.is_connected());
    (link, transport)
}

#[test]
fn connection_needs_both_halves() {
    let transport = ScriptedTransport::new();
    transport.0.borrow_mut().accept = false;
    let mut link = LinkController::new(&peer_config(), Some(transport.boxed()));

    link.process_network_communication();
    assert!(!link.is_connected());
    assert_eq!(link.status().device_kind, DeviceKind::None);

    // The outbound half stays up while we keep polling for the inbound one.
    transport.0.borrow_mut().connect = false;
    transport.0.borrow_mut().accept = true;
    link.process_network_communication();
    assert!(link.is_connected());
    assert_eq!(
        link.status().device_kind,
        DeviceKind::PeerLink(ConsoleGeneration::Cgb)
    );
}

#[test]
fn send_byte_exchanges_with_peer() {
    let (mut link, transport) = connected(&peer_config());
    let mut regs = RegisterFile::default();
    link.start_transfer(SerialControl::TRANSFER_START | SerialControl::INTERNAL_CLOCK, 0x11);
    transport.queue(Message::data(0x42));

    link.send_byte(&mut regs).unwrap();

    assert_eq!(transport.sent(), vec![Message::data(0x11)]);
    assert_eq!(regs.sb, 0x42);
    assert_eq!(link.status().transfer_byte, 0x42);
    assert_eq!(regs.if_reg & SERIAL_INTERRUPT, SERIAL_INTERRUPT);
}

#[test]
fn short_send_drops_the_link_for_good() {
    let (mut link, transport) = connected(&peer_config());
    let mut regs = RegisterFile::default();
    transport.0.borrow_mut().short_send = true;

    let err = link.send_byte(&mut regs).unwrap_err();
    assert!(matches!(
        err,
        LinkError::ShortSend {
            written: 1,
            expected: 2
        }
    ));
    assert!(!link.is_connected());
    assert!(link.is_terminated());
    assert_eq!(regs.if_reg & SERIAL_INTERRUPT, 0);

    // No automatic retry.
    transport.0.borrow_mut().short_send = false;
    link.process_network_communication();
    assert!(!link.is_connected());
}

#[test]
fn silent_peer_times_out() {
    let config = LinkConfig::builder()
        .accessory(Accessory::PeerLink)
        .exchange_timeout(std::time::Duration::from_millis(5))
        .build();
    let (mut link, _transport) = connected(&config);
    let mut regs = RegisterFile::default();

    let err = link.send_byte(&mut regs).unwrap_err();
    assert!(matches!(err, LinkError::Timeout));
    assert!(!link.is_connected());
}

#[test]
fn crossing_sync_is_consumed_while_waiting() {
    let (mut link, transport) = connected(&peer_config());
    let mut regs = RegisterFile::default();
    link.status.sync = true;
    link.status.sync_counter = 40;
    transport.queue(Message::sync());
    transport.queue(Message::data(0x7E));

    link.send_byte(&mut regs).unwrap();
    assert_eq!(regs.sb, 0x7E);
    assert!(!link.status().sync);
    assert_eq!(link.status().sync_counter, 0);
}

#[test]
fn received_data_is_answered_with_previous_sb() {
    let (mut link, transport) = connected(&peer_config());
    let mut regs = RegisterFile {
        sb: 0x55,
        sc: 0x80,
        ..RegisterFile::default()
    };
    transport.queue(Message::data(0x99));

    link.receive_byte(&mut regs).unwrap();

    assert_eq!(regs.sb, 0x99);
    assert_eq!(regs.sc & 0x80, 0);
    assert_eq!(regs.if_reg & SERIAL_INTERRUPT, SERIAL_INTERRUPT);
    assert_eq!(link.status().transfer_byte, 0x99);
    assert_eq!(transport.sent(), vec![Message::data(0x55)]);
}

#[test]
fn failed_echo_disconnects() {
    let (mut link, transport) = connected(&peer_config());
    let mut regs = RegisterFile::default();
    transport.queue(Message::data(0x01));
    transport.0.borrow_mut().short_send = true;

    assert!(link.receive_byte(&mut regs).is_err());
    assert!(!link.is_connected());
}

#[test]
fn receive_is_a_no_op_without_traffic() {
    let (mut link, transport) = connected(&peer_config());
    let mut regs = RegisterFile::default();
    link.receive_byte(&mut regs).unwrap();
    assert_eq!(regs, RegisterFile::default());
    assert!(transport.sent().is_empty());
}

#[test]
fn sync_message_releases_barrier() {
    let (mut link, transport) = connected(&peer_config());
    let mut regs = RegisterFile::default();
    link.status.sync = true;
    link.status.sync_counter = 33;
    transport.queue(Message::sync());

    link.receive_byte(&mut regs).unwrap();
    assert!(!link.status().sync);
    assert_eq!(link.status().sync_counter, 0);
    assert_eq!(regs.if_reg, 0);
}

#[test]
fn disconnect_notice_is_terminal() {
    let (mut link, transport) = connected(&peer_config());
    let mut regs = RegisterFile::default();
    transport.queue(Message::disconnect());

    link.receive_byte(&mut regs).unwrap();
    assert!(!link.is_connected());
    assert!(link.is_terminated());

    link.process_network_communication();
    assert!(!link.is_connected());

    link.reset(&peer_config());
    assert!(!link.is_terminated());
}

#[test]
fn infrared_signal_is_acknowledged_without_interrupt() {
    let (mut link, transport) = connected(&peer_config());
    let mut regs = RegisterFile::default();

    transport.queue(Message::infrared(1));
    link.receive_byte(&mut regs).unwrap();
    assert_eq!(regs.rp & RP_NO_SIGNAL, 0);
    assert_eq!(regs.if_reg, 0);
    assert_eq!(transport.sent(), vec![Message::infrared_ack(1)]);

    transport.queue(Message::infrared(0));
    link.receive_byte(&mut regs).unwrap();
    assert_eq!(regs.rp & RP_NO_SIGNAL, RP_NO_SIGNAL);
}

#[test]
fn unknown_tags_are_ignored() {
    let (mut link, transport) = connected(&peer_config());
    let mut regs = RegisterFile::default();
    transport.queue(Message::new(0x12, MessageTag::Other(0x33)));
    transport.queue(Message::infrared_ack(0));

    link.receive_byte(&mut regs).unwrap();
    link.receive_byte(&mut regs).unwrap();
    assert!(link.is_connected());
    assert_eq!(regs, RegisterFile::default());
    assert!(transport.sent().is_empty());
}

#[test]
fn ir_send_clears_pending_flag() {
    let (mut link, transport) = connected(&peer_config());
    let mut regs = RegisterFile {
        ir_signal: 1,
        ir_send: true,
        ..RegisterFile::default()
    };
    transport.queue(Message::infrared_ack(1));

    link.send_ir_signal(&mut regs).unwrap();
    assert!(!regs.ir_send);
    assert_eq!(regs.if_reg, 0);
    assert_eq!(transport.sent(), vec![Message::infrared(1)]);
}

#[test]
fn request_sync_does_not_wait() {
    let (mut link, transport) = connected(&peer_config());
    link.request_sync().unwrap();
    assert!(link.status().sync);
    assert_eq!(transport.sent(), vec![Message::sync()]);
}

#[test]
fn sync_barrier_fires_after_sync_clock() {
    let config = LinkConfig::builder()
        .accessory(Accessory::PeerLink)
        .hard_sync(true)
        .build();
    let (mut link, transport) = connected(&config);

    link.tick_sync(31).unwrap();
    assert!(!link.status().sync);
    link.tick_sync(1).unwrap();
    assert!(link.status().sync);
    assert_eq!(transport.sent(), vec![Message::sync()]);

    // Waiting: no further requests until the peer answers.
    link.tick_sync(100).unwrap();
    assert_eq!(transport.sent().len(), 1);
}

#[test]
fn internal_clock_completes_after_eight_bits() {
    let mut link = LinkController::new(&LinkConfig::default(), None);
    link.start_transfer(SerialControl::TRANSFER_START | SerialControl::INTERNAL_CLOCK, 0xAB);
    assert_eq!(link.status().shift_clock, 512);

    assert!(!link.tick_shift(512 * 8 - 1));
    assert_eq!(link.status().shifts_left, 1);
    assert!(link.tick_shift(1));
    assert!(!link.status().active_transfer);
    assert!(!link.tick_shift(10_000));
}

#[test]
fn external_clock_waits_for_peer() {
    let mut link = LinkController::new(&LinkConfig::default(), None);
    link.start_transfer(SerialControl::TRANSFER_START, 0xAB);
    assert!(!link.tick_shift(1_000_000));
    assert!(link.status().active_transfer);
}

#[test]
fn fast_clock_only_on_cgb() {
    let mut dmg = LinkController::new(&LinkConfig::default(), None);
    dmg.start_transfer(SerialControl::all(), 0);
    assert_eq!(dmg.status().shift_clock, 512);

    let mut cgb = LinkController::new(&peer_config(), None);
    cgb.start_transfer(SerialControl::all(), 0);
    assert_eq!(cgb.status().shift_clock, 16);

    cgb.set_double_speed(true);
    cgb.start_transfer(SerialControl::all(), 0);
    assert_eq!(cgb.status().shift_clock, 8);
}

#[test]
fn reset_sends_disconnect_and_reinitializes() {
    let (mut link, transport) = connected(&peer_config());
    link.status.transfer_byte = 0x44;

    link.reset(&peer_config());

    assert_eq!(transport.sent(), vec![Message::disconnect()]);
    assert!(transport.0.borrow().closed);
    assert_eq!(link.status(), &LinkStatus::new(&peer_config()));
}

#[test]
fn drop_sends_disconnect() {
    let (link, transport) = connected(&peer_config());
    drop(link);
    assert_eq!(transport.sent(), vec![Message::disconnect()]);
}

#[test]
fn wire_tags_round_trip() {
    for tag in [0x00u8, 0xFF, 0x40, 0x41, 0x80, 0x12] {
        assert_eq!(MessageTag::from_byte(tag).to_byte(), tag);
    }
    assert_eq!(Message::disconnect().to_bytes(), [0x00, 0x80]);
    assert_eq!(Message::sync().to_bytes(), [0x00, 0xFF]);
}
