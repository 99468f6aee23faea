//! USB full-speed device: HID keyboard on the CH32V203 USBD block
//!
//! The USBD peripheral is register-compatible with the STM32F103 one, so
//! `stm32-usbd` supplies the `usb-device` bus driver and `usbd-hid` the
//! keyboard class. Reports queued by [`HidKeyEmitter`](crate::HidKeyEmitter)
//! leave the queue only once the IN endpoint has accepted them.

use heapless::spsc::Consumer;
use stm32_usbd::{UsbBus, UsbPeripheral};
use usb_device::bus::UsbBusAllocator;
use usb_device::device::{StringDescriptors, UsbDevice, UsbDeviceBuilder, UsbDeviceState, UsbVidPid};
use usb_device::UsbError;
use usbd_hid::descriptor::{KeyboardReport, SerializedDescriptor};
use usbd_hid::hid_class::HIDClass;

use adapter_core::HalError;

const USBD_BASE: u32 = 0x4000_5C00;
const USBD_PMA_BASE: u32 = 0x4000_6000;
const RCC_APB1PCENR: u32 = 0x4002_101C;
const EXTEN_CTR: u32 = 0x4002_3800;

/// pid.codes test VID/PID
pub const VID_PID: UsbVidPid = UsbVidPid(0x1209, 0x0001);

/// HID interrupt endpoint polling interval
const POLL_MS: u8 = 10;

/// The USBD register block and its 512-byte packet memory
pub struct Usbd;

unsafe impl UsbPeripheral for Usbd {
    const REGISTERS: *const () = USBD_BASE as *const ();
    // pull-up lives in EXTEN_CTR, not in a BCDR register
    const DP_PULL_UP_FEATURE: bool = false;
    const EP_MEMORY: *const () = USBD_PMA_BASE as *const ();
    const EP_MEMORY_SIZE: usize = 512;
    const EP_MEMORY_ACCESS_2X16: bool = false;

    fn enable() {
        unsafe {
            let apb1 = RCC_APB1PCENR as *mut u32;
            core::ptr::write_volatile(apb1, core::ptr::read_volatile(apb1) | (1 << 23));
            // USBD_PU_EN: internal 1.5k pull-up on D+
            let exten = EXTEN_CTR as *mut u32;
            core::ptr::write_volatile(exten, core::ptr::read_volatile(exten) | (1 << 1));
        }
    }

    fn startup_delay() {
        // tSTARTUP is 1 us; 48 cycles at 48 MHz
        for _ in 0..48 {
            core::hint::spin_loop();
        }
    }
}

pub type Bus = UsbBus<Usbd>;

/// Bus allocator for the USBD block; must live for the rest of the program
pub fn bus_allocator() -> UsbBusAllocator<Bus> {
    UsbBus::new(Usbd)
}

/// USB device, keyboard class and the consumer end of the report queue
pub struct UsbKeyboard<const N: usize> {
    device: UsbDevice<'static, Bus>,
    class: HIDClass<'static, Bus>,
    reports: Consumer<'static, KeyboardReport, N>,
}

impl<const N: usize> UsbKeyboard<N> {
    pub fn new(
        bus: &'static UsbBusAllocator<Bus>,
        reports: Consumer<'static, KeyboardReport, N>,
    ) -> Result<Self, HalError> {
        let class = HIDClass::new(bus, KeyboardReport::desc(), POLL_MS);
        let device = UsbDeviceBuilder::new(bus, VID_PID)
            .strings(&[StringDescriptors::default()
                .manufacturer("WRC")
                .product("Morse Key Adapter")])
            .map_err(|_| HalError::UsbError)?
            .build();
        Ok(Self { device, class, reports })
    }

    /// Service the bus, then hand queued reports to the IN endpoint.
    ///
    /// A report stays queued until the endpoint accepts it, so a busy
    /// endpoint delays key events instead of dropping them.
    pub fn poll(&mut self) {
        self.device.poll(&mut [&mut self.class]);
        if self.device.state() != UsbDeviceState::Configured {
            return;
        }
        drain_reports(&mut self.reports, |report| self.class.push_input(report));
    }
}

/// Push queued reports until the endpoint stops taking them.
///
/// A report is dequeued only after `push` accepted it. Returns how many went out.
pub fn drain_reports<const N: usize>(
    reports: &mut Consumer<'_, KeyboardReport, N>,
    mut push: impl FnMut(&KeyboardReport) -> usb_device::Result<usize>,
) -> usize {
    let mut sent = 0;
    while let Some(report) = reports.peek() {
        match push(report) {
            Ok(_) => {
                reports.dequeue();
                sent += 1;
            }
            Err(UsbError::WouldBlock) => break,
            Err(_) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("HID report rejected");
                break;
            }
        }
    }
    sent
}
