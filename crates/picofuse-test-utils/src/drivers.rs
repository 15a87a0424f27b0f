//! Mock peripheral drivers.
//!
//! - [`GpioType`]: a pin with a mode and a level.
//! - [`AdcType`]: owns one GPIO child per analog channel; only one ADC may
//!   exist per registration.
//! - [`FailingType`]: a constructor that always fails, optionally after
//!   creating a child it must clean up.

use std::fmt::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use picofuse_core::Tag;
use picofuse_runtime::{Application, Body, InitArgs, ValueError, ValueRef, ValueType};
use smallvec::SmallVec;

// ── GPIO ───────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GpioMode {
    Input,
    Output,
    Adc,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GpioConfig {
    pub pin: u8,
    pub mode: GpioMode,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GpioState {
    pub pin: u8,
    pub mode: GpioMode,
    pub level: bool,
}

#[derive(Debug, Default)]
pub struct GpioType;

/// Highest pin number on the target board.
pub const GPIO_MAX_PIN: u8 = 29;

impl ValueType for GpioType {
    fn name(&self) -> &'static str {
        "gpio"
    }

    fn size(&self) -> usize {
        std::mem::size_of::<GpioState>()
    }

    fn construct(
        &self,
        _app: &mut Application,
        _this: ValueRef,
        args: InitArgs<'_>,
    ) -> Result<Body, ValueError> {
        let InitArgs::Any(config) = args else {
            return Err(ValueError::construct(self.name(), "expected GpioConfig"));
        };
        let Some(config) = config.downcast_ref::<GpioConfig>() else {
            return Err(ValueError::construct(self.name(), "expected GpioConfig"));
        };
        if config.pin > GPIO_MAX_PIN {
            return Err(ValueError::construct(
                self.name(),
                format!("pin {} out of range", config.pin),
            ));
        }
        Ok(Body::Custom(Box::new(GpioState {
            pin: config.pin,
            mode: config.mode,
            level: false,
        })))
    }

    fn render(
        &self,
        _app: &Application,
        _this: ValueRef,
        body: &Body,
        out: &mut String,
    ) -> Result<(), ValueError> {
        if let Body::Custom(state) = body {
            if let Some(gpio) = state.downcast_ref::<GpioState>() {
                write!(out, "GPIO{}", gpio.pin)?;
            }
        }
        Ok(())
    }

    fn render_quoted(
        &self,
        app: &Application,
        this: ValueRef,
        body: &Body,
        out: &mut String,
    ) -> Result<(), ValueError> {
        out.push('"');
        self.render(app, this, body, out)?;
        out.push('"');
        Ok(())
    }
}

/// Build a GPIO value, registering the type on first use.
#[track_caller]
pub fn new_gpio(app: &mut Application, pin: u8, mode: GpioMode) -> Result<ValueRef, ValueError> {
    if !app.is_registered(Tag::GPIO) {
        app.register_type(Tag::GPIO, Arc::new(GpioType));
    }
    app.new_value(Tag::GPIO, InitArgs::Any(&GpioConfig { pin, mode }))
}

// ── ADC ────────────────────────────────────────────────────────────

/// Channel wired to the on-die temperature sensor; it has no GPIO.
pub const ADC_TEMP_CHANNEL: u8 = 4;

/// First GPIO pin with an analog function; channel `n` uses pin `26 + n`.
const ADC_FIRST_PIN: u8 = 26;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AdcConfig {
    /// Bit `n` enables channel `n`. Must be non-zero.
    pub channel_mask: u8,
}

#[derive(Debug)]
pub struct AdcState {
    pub channel_mask: u8,
    pub gpio: SmallVec<[ValueRef; 4]>,
    pub temp_sensor: bool,
}

/// ADC descriptor. The instance flag is shared by every ADC built from
/// this registration, so a second live ADC is rejected.
#[derive(Debug, Default)]
pub struct AdcType {
    instance: Arc<AtomicBool>,
}

impl AdcType {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an ADC built from this descriptor is currently live.
    pub fn instance_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.instance)
    }
}

impl ValueType for AdcType {
    fn name(&self) -> &'static str {
        "adc"
    }

    fn size(&self) -> usize {
        std::mem::size_of::<AdcState>()
    }

    fn construct(
        &self,
        app: &mut Application,
        _this: ValueRef,
        args: InitArgs<'_>,
    ) -> Result<Body, ValueError> {
        let config = match args {
            InitArgs::Any(any) => any.downcast_ref::<AdcConfig>().copied(),
            _ => None,
        }
        .ok_or_else(|| ValueError::construct(self.name(), "expected AdcConfig"))?;

        if config.channel_mask == 0 {
            tracing::debug!("no ADC channels selected");
            return Err(ValueError::construct(self.name(), "no channels selected"));
        }
        if self.instance.load(Ordering::Acquire) {
            return Err(ValueError::construct(self.name(), "ADC already initialised"));
        }

        let mut state = AdcState {
            channel_mask: config.channel_mask,
            gpio: SmallVec::new(),
            temp_sensor: false,
        };
        for channel in 0..8u8 {
            if config.channel_mask & (1 << channel) == 0 {
                continue;
            }
            let created = if channel == ADC_TEMP_CHANNEL {
                state.temp_sensor = true;
                continue;
            } else if channel < ADC_TEMP_CHANNEL {
                new_gpio(app, ADC_FIRST_PIN + channel, GpioMode::Adc)
            } else {
                Err(ValueError::construct(
                    self.name(),
                    format!("invalid channel {channel}"),
                ))
            };
            match created {
                Ok(gpio) => state.gpio.push(gpio),
                Err(e) => {
                    for gpio in state.gpio {
                        app.free_value(gpio)?;
                    }
                    return Err(e);
                }
            }
        }

        for gpio in &state.gpio {
            app.retain(*gpio);
        }
        self.instance.store(true, Ordering::Release);
        Ok(Body::Custom(Box::new(state)))
    }

    fn destroy(&self, app: &mut Application, _this: ValueRef, body: Body) {
        if let Body::Custom(state) = body {
            if let Ok(state) = state.downcast::<AdcState>() {
                for gpio in state.gpio {
                    app.release(gpio);
                }
            }
        }
        self.instance.store(false, Ordering::Release);
    }

    fn render(
        &self,
        _app: &Application,
        _this: ValueRef,
        body: &Body,
        out: &mut String,
    ) -> Result<(), ValueError> {
        if let Body::Custom(state) = body {
            if let Some(adc) = state.downcast_ref::<AdcState>() {
                write!(out, "ADC(mask={:#04x})", adc.channel_mask)?;
            }
        }
        Ok(())
    }
}

/// Build an ADC value, registering `AdcType` on first use.
#[track_caller]
pub fn new_adc(app: &mut Application, config: AdcConfig) -> Result<ValueRef, ValueError> {
    if !app.is_registered(Tag::ADC) {
        app.register_type(Tag::ADC, Arc::new(AdcType::new()));
    }
    app.new_value(Tag::ADC, InitArgs::Any(&config))
}

// ── failing ────────────────────────────────────────────────────────

/// A type whose constructor always fails.
///
/// With `with_child` set it first creates a GPIO child and frees it again
/// before failing, the way a driver unwinds a half-built object.
#[derive(Debug, Default)]
pub struct FailingType {
    pub with_child: bool,
}

impl ValueType for FailingType {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn size(&self) -> usize {
        16
    }

    fn construct(
        &self,
        app: &mut Application,
        _this: ValueRef,
        _args: InitArgs<'_>,
    ) -> Result<Body, ValueError> {
        if self.with_child {
            let child = new_gpio(app, 0, GpioMode::Input)?;
            app.free_value(child)?;
        }
        Err(ValueError::construct(self.name(), "always fails"))
    }
}

/// Register a [`FailingType`] under `tag` (if free) and try to build one.
#[track_caller]
pub fn new_failing(
    app: &mut Application,
    tag: Tag,
    with_child: bool,
) -> Result<ValueRef, ValueError> {
    app.register_type(tag, Arc::new(FailingType { with_child }));
    app.new_value(tag, InitArgs::None)
}
