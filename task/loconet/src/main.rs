//! Minimal host-side wiring for `loconet-core`: a loopback transport and an
//! in-memory config store, standing in for the UART/EEPROM a real driver
//! task would own. Useful for exercising the core's event flow without
//! any hardware attached.

use loconet_core::{
    AckCode, ClockTime, ConfigStore, CoreError, EventMask, Handlers, LoconetCore, MessageBuilder,
    Transport,
};

struct LoopbackTransport {
    armed_us: Option<u32>,
    rx: heapless::Deque<u8, 64>,
    tx_in_flight: Option<u8>,
}

impl LoopbackTransport {
    fn new() -> Self {
        Self { armed_us: None, rx: heapless::Deque::new(), tx_in_flight: None }
    }
}

impl Transport for LoopbackTransport {
    fn arm_timer(&mut self, micros: u32) {
        self.armed_us = Some(micros);
    }

    fn transmit_byte(&mut self, byte: u8) {
        // Loop the byte straight back as its own echo, the way a quiet
        // bus with no other node transmitting would.
        self.tx_in_flight = Some(byte);
        let _ = self.rx.push_back(byte);
    }

    fn enable_dre_interrupt(&mut self) {}
    fn disable_dre_interrupt(&mut self) {}
    fn assert_line_break(&mut self) {}
    fn release_line_break(&mut self) {}

    fn take_rx_byte(&mut self) -> Option<u8> {
        self.rx.pop_front()
    }

    fn wait_events(&mut self, mask: EventMask) -> EventMask {
        mask
    }
}

struct EepromStore {
    values: [Option<u16>; 240],
}

impl EepromStore {
    fn formatted(address: u16, device_class: u16) -> Self {
        let mut values = [None; 240];
        values[0] = Some(address);
        values[1] = Some(device_class);
        Self { values }
    }
}

impl ConfigStore for EepromStore {
    fn read_lncv(&self, number: u16) -> Option<u16> {
        self.values[number as usize]
    }

    fn write_lncv(&mut self, number: u16, value: u16) -> Result<(), CoreError> {
        self.values[number as usize] = Some(value);
        Ok(())
    }

    fn format(&mut self) -> Result<(), CoreError> {
        self.values = [None; 240];
        Ok(())
    }
}

fn on_switch_req(sub_address: u8, data: u8) {
    println!("switch request: sub_address={sub_address} data={data:#04x}");
}

fn on_fast_clock_update(time: ClockTime) {
    println!("fast clock: day={} {:02}:{:02}", time.day, time.hour, time.minute);
}

fn accept_all_lncv_writes(_number: u16, _value: u16) -> AckCode {
    AckCode::Ok
}

fn main() {
    let transport = LoopbackTransport::new();
    let config = EepromStore::formatted(/* address */ 5, /* device_class */ 7);

    let mut handlers = Handlers::default();
    handlers.on_switch_req = on_switch_req;
    handlers.on_fast_clock_update = on_fast_clock_update;
    handlers.write_allowed = accept_all_lncv_writes;

    let mut core = LoconetCore::new(transport, config, handlers).expect("EEPROM already formatted");

    core.enqueue(MessageBuilder::two(0x85, 1)).expect("queue has room on startup");

    for _ in 0..16 {
        core.run_once();
    }
}
