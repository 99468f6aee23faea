#![no_std]
#![no_main]

#[cfg(feature = "defmt")]
use defmt_rtt as _;

// Panic handler
use panic_halt as _;

use core::cell::RefCell;
use critical_section::Mutex;
use heapless::spsc::Queue;
use riscv_rt::entry;
use static_cell::StaticCell;
use usb_device::bus::UsbBusAllocator;
use usbd_hid::descriptor::KeyboardReport;

use adapter_core::{
    default_config, AdapterShared, ControlPanel, MorseKeyAdapter, PinControlPanel, Synthesizer,
};
use morse_adapter_firmware::ch32v203_hardware::{self as hw, pins};
use morse_adapter_firmware::usb::{self, Bus};
use morse_adapter_firmware::{Adc1, GpioInput, HidKeyEmitter, Tim1Pwm, UsbKeyboard};

/// Reports in flight towards the USB endpoint
const REPORT_QUEUE_LEN: usize = 16;

/// RISC-V critical section using mstatus.MIE
struct RiscvCriticalSection;
critical_section::set_impl!(RiscvCriticalSection);

unsafe impl critical_section::Impl for RiscvCriticalSection {
    unsafe fn acquire() -> critical_section::RawRestoreState {
        let mstatus = riscv::register::mstatus::read();
        riscv::register::mstatus::clear_mie();
        mstatus.mie()
    }

    unsafe fn release(was_enabled: critical_section::RawRestoreState) {
        if was_enabled {
            riscv::register::mstatus::set_mie();
        }
    }
}

// Interrupt <-> poll loop state
static SHARED: AdapterShared = AdapterShared::new();
static SYNTH: Mutex<RefCell<Synthesizer<'static>>> =
    Mutex::new(RefCell::new(Synthesizer::new(&SHARED.tone, &SHARED.timebase)));
static REPORTS: StaticCell<Queue<KeyboardReport, REPORT_QUEUE_LEN>> = StaticCell::new();
static USB_BUS: StaticCell<UsbBusAllocator<Bus>> = StaticCell::new();
static USB_KEYBOARD: Mutex<RefCell<Option<UsbKeyboard<REPORT_QUEUE_LEN>>>> =
    Mutex::new(RefCell::new(None));

/// Sidetone sample and timebase advance, once per timer period
fn on_timer_tick() {
    let sample = critical_section::with(|cs| SYNTH.borrow(cs).borrow_mut().tick());
    Tim1Pwm::write_compare(sample);
}

fn halt() -> ! {
    loop {
        unsafe { riscv::asm::wfi() };
    }
}

#[entry]
fn main() -> ! {
    hw::configure_system_clock();
    hw::enable_peripheral_clocks();
    hw::configure_analog_and_pwm_pins();

    let tip = GpioInput::new(pins::TIP);
    let ring = GpioInput::new(pins::RING);
    let ptt = GpioInput::new(pins::PTT);
    let automatic = GpioInput::new(pins::AUTOMATIC);
    let iambic = GpioInput::new(pins::IAMBIC);
    let inverted = GpioInput::new(pins::INVERTED);
    for pin in [&tip, &ring, &ptt, &automatic, &iambic, &inverted] {
        pin.init_pull_up();
    }

    let mut panel = PinControlPanel::new(automatic, iambic, inverted, Adc1::new());

    // route the jack before the first edge arrives
    if let Ok(switches) = panel.mode_switches() {
        SHARED.lines.publish_switches(&switches);
    }
    SHARED.lines.on_tip_change(tip.level());
    SHARED.lines.on_ring_change(ring.level());
    SHARED.lines.on_ptt_change(ptt.level());
    hw::configure_exti();

    let mut adapter = MorseKeyAdapter::new(default_config());
    let mut timer = Tim1Pwm::new();
    if adapter.start(&mut timer, &SHARED, on_timer_tick).is_err() {
        #[cfg(feature = "defmt")]
        defmt::error!("tone timer failed to start");
        halt();
    }

    let (producer, consumer) = REPORTS.init(Queue::new()).split();
    let bus = USB_BUS.init(usb::bus_allocator());
    match UsbKeyboard::new(bus, consumer) {
        Ok(keyboard) => {
            critical_section::with(|cs| USB_KEYBOARD.borrow(cs).replace(Some(keyboard)));
        }
        Err(_) => {
            #[cfg(feature = "defmt")]
            defmt::error!("USB device setup failed");
            halt();
        }
    }
    hw::enable_irq(hw::IRQ_USB_LP);
    let mut emitter = HidKeyEmitter::new(producer);

    #[cfg(feature = "defmt")]
    defmt::info!("Morse key adapter v{} ready", adapter_core::VERSION);

    unsafe {
        riscv::register::mstatus::set_mie();
    }

    loop {
        adapter.poll(&SHARED, &mut panel, &mut emitter);
        // an idle endpoint raises no interrupt, so new reports are pushed from here
        service_usb();
    }
}

#[no_mangle]
extern "C" fn TIM1_UP_IRQHandler() {
    Tim1Pwm::on_update_interrupt();
}

#[no_mangle]
extern "C" fn EXTI0_IRQHandler() {
    hw::service_exti(pins::PTT.1, &SHARED.lines);
}

#[no_mangle]
extern "C" fn EXTI2_IRQHandler() {
    hw::service_exti(pins::RING.1, &SHARED.lines);
}

#[no_mangle]
extern "C" fn EXTI3_IRQHandler() {
    hw::service_exti(pins::TIP.1, &SHARED.lines);
}

fn service_usb() {
    critical_section::with(|cs| {
        if let Some(keyboard) = USB_KEYBOARD.borrow(cs).borrow_mut().as_mut() {
            keyboard.poll();
        }
    });
}

#[no_mangle]
extern "C" fn USB_LP_CAN1_RX0_IRQHandler() {
    service_usb();
}
