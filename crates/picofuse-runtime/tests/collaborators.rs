//! Collaborator drivers: lazy registration, child values and constructor
//! failure.

use picofuse_core::{Tag, EXIT_SUCCESS};
use picofuse_runtime::{InitArgs, ValueError};
use picofuse_test_utils::{new_adc, new_failing, new_gpio, test_app, AdcConfig, GpioMode};

fn live(app: &picofuse_runtime::Application) -> u32 {
    app.metrics().pool.live_blocks
}

#[test]
fn unregistered_tag_fails() {
    let mut app = test_app();
    let before = live(&app);
    let err = app.new_value(Tag::SPI, InitArgs::None).unwrap_err();
    assert_eq!(err, ValueError::UnregisteredTag(Tag::SPI));
    assert_eq!(live(&app), before);
}

#[test]
fn failing_constructor_leaves_block_count_unchanged() {
    let mut app = test_app();
    let before = live(&app);
    let err = new_failing(&mut app, Tag::FIRST_USER, false).unwrap_err();
    assert!(matches!(err, ValueError::Construct { type_name: "failing", .. }));
    assert_eq!(live(&app), before);
}

#[test]
fn failing_constructor_cleans_up_children() {
    let mut app = test_app();
    let before = live(&app);
    assert!(new_failing(&mut app, Tag::FIRST_USER, true).is_err());
    assert_eq!(live(&app), before);
    assert_eq!(app.destroy(), EXIT_SUCCESS);
}

#[test]
fn drivers_register_lazily() {
    let mut app = test_app();
    assert!(!app.is_registered(Tag::GPIO));
    let _ = new_gpio(&mut app, 3, GpioMode::Output).unwrap();
    assert!(app.is_registered(Tag::GPIO));
    let _ = new_gpio(&mut app, 4, GpioMode::Input).unwrap();
    assert_eq!(app.registry().iter().filter(|(t, _)| *t == Tag::GPIO).count(), 1);
}

#[test]
fn adc_rejects_empty_mask() {
    let mut app = test_app();
    let before = live(&app);
    let err = new_adc(&mut app, AdcConfig { channel_mask: 0 }).unwrap_err();
    assert!(matches!(err, ValueError::Construct { type_name: "adc", .. }));
    assert_eq!(live(&app), before);
}

#[test]
fn adc_retains_one_gpio_per_analog_channel() {
    let mut app = test_app();
    let before = live(&app);
    // Channels 0, 1 and the temperature sensor.
    let adc = new_adc(&mut app, AdcConfig { channel_mask: 0b1_0011 }).unwrap();
    assert_eq!(live(&app), before + 3);
    let gpio: Vec<_> = app
        .custom::<picofuse_test_utils::drivers::AdcState>(adc)
        .unwrap()
        .gpio
        .to_vec();
    assert_eq!(gpio.len(), 2);
    for g in &gpio {
        assert_eq!(app.ref_count(*g).unwrap(), 1);
        assert_eq!(app.type_name(*g).unwrap(), "gpio");
    }
    assert_eq!(app.render(gpio[1], false).unwrap(), "GPIO27");
    assert_eq!(app.destroy(), EXIT_SUCCESS);
}

#[test]
fn only_one_adc_at_a_time() {
    let mut app = test_app();
    let first = new_adc(&mut app, AdcConfig { channel_mask: 0x01 }).unwrap();
    app.retain(first);
    let before = live(&app);
    assert!(new_adc(&mut app, AdcConfig { channel_mask: 0x02 }).is_err());
    assert_eq!(live(&app), before);

    // Once the first is reclaimed, a new one may be built.
    app.release(first);
    app.drain_all();
    let second = new_adc(&mut app, AdcConfig { channel_mask: 0x02 }).unwrap();
    assert!(app.contains(second));
    assert_eq!(app.destroy(), EXIT_SUCCESS);
}

#[test]
fn adc_invalid_channel_unwinds_created_gpio() {
    let mut app = test_app();
    let before = live(&app);
    // Channel 0 succeeds, channel 6 does not exist.
    assert!(new_adc(&mut app, AdcConfig { channel_mask: 0b100_0001 }).is_err());
    assert_eq!(live(&app), before);
    // The failed attempt did not claim the instance slot.
    assert!(new_adc(&mut app, AdcConfig { channel_mask: 0x01 }).is_ok());
}

#[test]
fn adc_children_are_reclaimed_with_it() {
    let mut app = test_app();
    let before = live(&app);
    let adc = new_adc(&mut app, AdcConfig { channel_mask: 0x0F }).unwrap();
    assert_eq!(live(&app), before + 5);
    let _ = adc;
    assert_eq!(app.drain_all(), 5);
    assert_eq!(live(&app), before);
}
