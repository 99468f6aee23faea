//! CH32V203 Hardware Implementation
//!
//! Register-level drivers for the adapter board: TIM1 as the tone timer,
//! ADC1 for the pots, GPIO inputs with pull-ups and EXTI pin-change routing.

use core::cell::Cell;
use core::convert::Infallible;
use critical_section::Mutex;
use embedded_hal::digital::{ErrorType, InputPin};

use adapter_core::{AnalogChannel, AnalogSource, HalError, HardwareTimer, InputLines, TimerMode};

/// CH32V203 Memory Map and Register Base Addresses
const RCC_BASE: u32 = 0x4002_1000;
pub const GPIOA_BASE: u32 = 0x4001_0800;
pub const GPIOB_BASE: u32 = 0x4001_0C00;
const AFIO_BASE: u32 = 0x4001_0000;
const EXTI_BASE: u32 = 0x4001_0400;
const ADC1_BASE: u32 = 0x4001_2400;
const TIM1_BASE: u32 = 0x4001_2C00;
const PFIC_BASE: u32 = 0xE000_E000;

/// RCC Register offsets
const RCC_CTLR: u32 = 0x00;
const RCC_CFGR0: u32 = 0x04;
const RCC_APB2PCENR: u32 = 0x18;

/// GPIO Register offsets
const GPIO_CFGLR: u32 = 0x00;
const GPIO_CFGHR: u32 = 0x04;
const GPIO_INDR: u32 = 0x08;
const GPIO_OUTDR: u32 = 0x0C;

/// AFIO Register offsets
const AFIO_EXTICR1: u32 = 0x08;

/// EXTI Register offsets
const EXTI_INTENR: u32 = 0x00;
const EXTI_RTENR: u32 = 0x08;
const EXTI_FTENR: u32 = 0x0C;
const EXTI_INTFR: u32 = 0x14;

/// ADC Register offsets
const ADC_STATR: u32 = 0x00;
const ADC_CTLR2: u32 = 0x08;
const ADC_SAMPTR2: u32 = 0x10;
const ADC_RSQR3: u32 = 0x34;
const ADC_RDATAR: u32 = 0x4C;

/// TIM1 Register offsets
const TIM_CTLR1: u32 = 0x00;
const TIM_DMAINTENR: u32 = 0x0C;
const TIM_INTFR: u32 = 0x10;
const TIM_CHCTLR1: u32 = 0x18;
const TIM_CCER: u32 = 0x20;
const TIM_PSC: u32 = 0x28;
const TIM_ATRLR: u32 = 0x2C;
const TIM_RPTCR: u32 = 0x30;
const TIM_CH1CVR: u32 = 0x34;
const TIM_BDTR: u32 = 0x44;

/// PFIC interrupt enable registers (IRQ 0-31, 32-63)
const PFIC_IENR1: u32 = 0x100;
const PFIC_IENR2: u32 = 0x104;

/// Interrupt numbers
pub const IRQ_EXTI0: u32 = 22;
pub const IRQ_EXTI2: u32 = 24;
pub const IRQ_EXTI3: u32 = 25;
pub const IRQ_USB_LP: u32 = 36;
pub const IRQ_TIM1_UP: u32 = 41;

/// Spins to wait for one ADC conversion before giving up
const ADC_TIMEOUT_SPINS: u32 = 10_000;

#[inline(always)]
fn read_reg(addr: u32) -> u32 {
    unsafe { core::ptr::read_volatile(addr as *const u32) }
}

#[inline(always)]
fn write_reg(addr: u32, value: u32) {
    unsafe { core::ptr::write_volatile(addr as *mut u32, value) }
}

#[inline(always)]
fn modify_reg(addr: u32, f: impl FnOnce(u32) -> u32) {
    write_reg(addr, f(read_reg(addr)));
}

/// Board pin assignments
pub mod pins {
    use super::{GPIOA_BASE, GPIOB_BASE};

    /// PTT input (PA0, EXTI0)
    pub const PTT: (u32, u8) = (GPIOA_BASE, 0);
    /// Jack ring contact (PA2, EXTI2)
    pub const RING: (u32, u8) = (GPIOA_BASE, 2);
    /// Jack tip contact (PA3, EXTI3)
    pub const TIP: (u32, u8) = (GPIOA_BASE, 3);
    /// Speed pot (PA4, ADC_IN4)
    pub const SPEED_CHANNEL: u32 = 4;
    /// Pitch pot (PA5, ADC_IN5)
    pub const PITCH_CHANNEL: u32 = 5;
    /// Sidetone PWM output (PA8, TIM1_CH1)
    pub const SIDETONE: (u32, u8) = (GPIOA_BASE, 8);
    /// Mode switches
    pub const AUTOMATIC: (u32, u8) = (GPIOB_BASE, 12);
    pub const IAMBIC: (u32, u8) = (GPIOB_BASE, 13);
    pub const INVERTED: (u32, u8) = (GPIOB_BASE, 14);
}

/// SYSCLK = HSI 8 MHz through the PLL (x6) = 48 MHz, as the USB block requires
pub const SYSCLK_HZ: u32 = 48_000_000;

/// TIM1 runs from SYSCLK; this divides it down to the 16 MHz tone reference
const TIMER_REFERENCE_DIVIDER: u32 = SYSCLK_HZ / 16_000_000;

const FLASH_ACTLR: u32 = 0x4002_2000;

pub fn configure_system_clock() {
    // one wait state above 24 MHz
    modify_reg(FLASH_ACTLR, |v| (v & !0x3) | 0x1);
    // PLLSRC = HSI, PLLMUL = x6, USBPRE = /1, ADCPRE = /6 (8 MHz, under the 14 MHz limit)
    modify_reg(RCC_BASE + RCC_CFGR0, |v| {
        (v & !((1 << 16) | (0xF << 18) | (0x3 << 22) | (0x3 << 14))) | (0x4 << 18) | (0x2 << 14)
    });
    modify_reg(RCC_BASE + RCC_CTLR, |v| v | (1 << 24));
    while read_reg(RCC_BASE + RCC_CTLR) & (1 << 25) == 0 {}
    // SW = PLL
    modify_reg(RCC_BASE + RCC_CFGR0, |v| (v & !0x3) | 0x2);
    while (read_reg(RCC_BASE + RCC_CFGR0) >> 2) & 0x3 != 0x2 {}
}

/// Enable clocks for AFIO, GPIOA, GPIOB, ADC1 and TIM1
pub fn enable_peripheral_clocks() {
    // Bit 0 = AFIO, 2 = GPIOA, 3 = GPIOB, 9 = ADC1, 11 = TIM1
    modify_reg(RCC_BASE + RCC_APB2PCENR, |v| {
        v | (1 << 0) | (1 << 2) | (1 << 3) | (1 << 9) | (1 << 11)
    });
}

fn configure_pin(port: u32, pin: u8, config: u32) {
    let (reg, shift) = if pin < 8 {
        (port + GPIO_CFGLR, pin as u32 * 4)
    } else {
        (port + GPIO_CFGHR, (pin as u32 - 8) * 4)
    };
    modify_reg(reg, |v| (v & !(0xF << shift)) | (config << shift));
}

pub fn enable_irq(irq: u32) {
    if irq < 32 {
        write_reg(PFIC_BASE + PFIC_IENR1, 1 << irq);
    } else {
        write_reg(PFIC_BASE + PFIC_IENR2, 1 << (irq - 32));
    }
}

/// Digital input with pull-up
#[derive(Copy, Clone, Debug)]
pub struct GpioInput {
    port: u32,
    pin: u8,
}

impl GpioInput {
    pub const fn new((port, pin): (u32, u8)) -> Self {
        Self { port, pin }
    }

    /// Configure as input with pull-up (CNF=10, MODE=00, ODR=1)
    pub fn init_pull_up(&self) {
        configure_pin(self.port, self.pin, 0x8);
        modify_reg(self.port + GPIO_OUTDR, |v| v | (1 << self.pin));
    }

    #[inline]
    pub fn level(&self) -> bool {
        read_reg(self.port + GPIO_INDR) & (1 << self.pin) != 0
    }
}

impl ErrorType for GpioInput {
    type Error = Infallible;
}

impl InputPin for GpioInput {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.level())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.level())
    }
}

/// PA8 as alternate-function push-pull for TIM1_CH1, PA4/PA5 as analog inputs
pub fn configure_analog_and_pwm_pins() {
    let (port, pin) = pins::SIDETONE;
    configure_pin(port, pin, 0xB);
    configure_pin(GPIOA_BASE, pins::SPEED_CHANNEL as u8, 0x0);
    configure_pin(GPIOA_BASE, pins::PITCH_CHANNEL as u8, 0x0);
}

/// Route tip, ring and PTT to EXTI on both edges
pub fn configure_exti() {
    // EXTI0..3 on port A
    modify_reg(AFIO_BASE + AFIO_EXTICR1, |v| v & !0xFFFF);

    let mask = (1 << pins::PTT.1) | (1 << pins::RING.1) | (1 << pins::TIP.1);
    modify_reg(EXTI_BASE + EXTI_RTENR, |v| v | mask);
    modify_reg(EXTI_BASE + EXTI_FTENR, |v| v | mask);
    modify_reg(EXTI_BASE + EXTI_INTENR, |v| v | mask);

    enable_irq(IRQ_EXTI0);
    enable_irq(IRQ_EXTI2);
    enable_irq(IRQ_EXTI3);
}

/// Clear the pending EXTI `line` and forward the pin level to `lines`
pub fn service_exti(line: u8, lines: &InputLines) {
    let pending = read_reg(EXTI_BASE + EXTI_INTFR);
    if pending & (1 << line) == 0 {
        return;
    }
    write_reg(EXTI_BASE + EXTI_INTFR, 1 << line);

    match line {
        l if l == pins::TIP.1 => lines.on_tip_change(GpioInput::new(pins::TIP).level()),
        l if l == pins::RING.1 => lines.on_ring_change(GpioInput::new(pins::RING).level()),
        l if l == pins::PTT.1 => lines.on_ptt_change(GpioInput::new(pins::PTT).level()),
        _ => {}
    }
}

/// ADC1 in single-conversion software-triggered mode
pub struct Adc1 {
    _private: (),
}

impl Adc1 {
    /// Power up and calibrate
    pub fn new() -> Self {
        // ADON, then software trigger select (EXTSEL = SWSTART, EXTTRIG)
        write_reg(ADC1_BASE + ADC_CTLR2, 1 << 0);
        modify_reg(ADC1_BASE + ADC_CTLR2, |v| v | (0x7 << 17) | (1 << 20));
        // longest sample time on channels 4 and 5, the pots are high impedance
        modify_reg(ADC1_BASE + ADC_SAMPTR2, |v| v | (0x7 << 12) | (0x7 << 15));
        // RSTCAL then CAL
        modify_reg(ADC1_BASE + ADC_CTLR2, |v| v | (1 << 3));
        while read_reg(ADC1_BASE + ADC_CTLR2) & (1 << 3) != 0 {}
        modify_reg(ADC1_BASE + ADC_CTLR2, |v| v | (1 << 2));
        while read_reg(ADC1_BASE + ADC_CTLR2) & (1 << 2) != 0 {}
        Self { _private: () }
    }
}

impl AnalogSource for Adc1 {
    type Error = HalError;

    fn read(&mut self, channel: AnalogChannel) -> Result<u16, Self::Error> {
        let input = match channel {
            AnalogChannel::Speed => pins::SPEED_CHANNEL,
            AnalogChannel::Pitch => pins::PITCH_CHANNEL,
        };
        write_reg(ADC1_BASE + ADC_RSQR3, input);
        modify_reg(ADC1_BASE + ADC_CTLR2, |v| v | (1 << 22));

        let mut spins = 0;
        while read_reg(ADC1_BASE + ADC_STATR) & (1 << 1) == 0 {
            spins += 1;
            if spins > ADC_TIMEOUT_SPINS {
                return Err(HalError::AdcError);
            }
        }
        // 12-bit result scaled to the 10-bit range the pot mapping expects
        Ok((read_reg(ADC1_BASE + ADC_RDATAR) as u16 & 0x0FFF) >> 2)
    }
}

/// Per-tick callback registered by `HardwareTimer::on_tick`
static TICK_CALLBACK: Mutex<Cell<Option<fn()>>> = Mutex::new(Cell::new(None));

/// TIM1 driving the sidetone PWM on CH1; ARR = 255 gives an 8-bit duty range
pub struct Tim1Pwm {
    _private: (),
}

impl Tim1Pwm {
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Write the duty value directly, used from the update interrupt
    #[inline(always)]
    pub fn write_compare(level: u8) {
        write_reg(TIM1_BASE + TIM_CH1CVR, level as u32);
    }

    /// Update interrupt body: acknowledge and run the registered callback
    #[inline(always)]
    pub fn on_update_interrupt() {
        write_reg(TIM1_BASE + TIM_INTFR, !1);
        let callback = critical_section::with(|cs| TICK_CALLBACK.borrow(cs).get());
        if let Some(callback) = callback {
            callback();
        }
    }
}

impl HardwareTimer for Tim1Pwm {
    type Error = HalError;

    fn configure(&mut self, prescaler: u16, mode: TimerMode) -> Result<(), Self::Error> {
        if prescaler == 0 {
            return Err(HalError::InvalidConfig);
        }
        write_reg(TIM1_BASE + TIM_CTLR1, 0);
        write_reg(TIM1_BASE + TIM_PSC, prescaler as u32 * TIMER_REFERENCE_DIVIDER - 1);
        write_reg(TIM1_BASE + TIM_ATRLR, 255);
        write_reg(TIM1_BASE + TIM_CH1CVR, 0);

        let ctlr1 = match mode {
            // centre-aligned mode 1; one update per up/down cycle via the repetition counter
            TimerMode::PhaseCorrectPwm => {
                write_reg(TIM1_BASE + TIM_RPTCR, 1);
                (1 << 7) | (0x1 << 5)
            }
            TimerMode::FastPwm => {
                write_reg(TIM1_BASE + TIM_RPTCR, 0);
                1 << 7
            }
        };
        // PWM mode 1 with preload on CH1
        write_reg(TIM1_BASE + TIM_CHCTLR1, (0x6 << 4) | (1 << 3));
        write_reg(TIM1_BASE + TIM_CCER, 1);
        write_reg(TIM1_BASE + TIM_BDTR, 1 << 15);
        write_reg(TIM1_BASE + TIM_CTLR1, ctlr1);
        Ok(())
    }

    fn on_tick(&mut self, callback: fn()) -> Result<(), Self::Error> {
        if read_reg(TIM1_BASE + TIM_ATRLR) != 255 {
            return Err(HalError::NotInitialized);
        }
        critical_section::with(|cs| TICK_CALLBACK.borrow(cs).set(Some(callback)));
        write_reg(TIM1_BASE + TIM_DMAINTENR, 1);
        enable_irq(IRQ_TIM1_UP);
        modify_reg(TIM1_BASE + TIM_CTLR1, |v| v | 1);
        Ok(())
    }

    fn set_output_level(&mut self, level: u8) {
        Self::write_compare(level);
    }
}
