#![no_main]

use feedfollow_web::boot_config;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(json) = std::str::from_utf8(data) else {
        return;
    };
    let (config, err) = boot_config::load(Some(json));
    // Whatever comes in, the config handed to the controller is valid.
    assert!(config.validate().is_ok());
    if err.is_some() {
        assert_eq!(config, feedfollow_core::FollowConfig::default());
    }
});
