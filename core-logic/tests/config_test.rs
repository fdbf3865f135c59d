use core_logic::{
    AmountRange, ConfigError, CredentialScope, DelayRange, DispatchConfig, DispatchError,
    ScheduleConfig,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;

#[test]
fn test_default_schedule() {
    let schedule = ScheduleConfig::default();
    assert_eq!(schedule.daily_transfers, 100);
    assert_eq!(schedule.session_pause, Duration::from_secs(65 * 60));
    assert_eq!(schedule.wake_at.to_string(), "07:30:00");
    assert_eq!(schedule.plan().counts(), [20, 10, 50, 20]);
}

#[test]
fn test_wake_time_parsing() {
    assert!(ScheduleConfig::parse_wake_at("06:15").is_ok());
    assert!(matches!(
        ScheduleConfig::parse_wake_at("25:00"),
        Err(ConfigError::InvalidValue { .. })
    ));
}

#[test]
fn test_equal_amount_bounds_yield_that_amount() {
    let range = AmountRange::new(1.5, 1.5).unwrap();
    let mut rng = StdRng::seed_from_u64(1);
    assert_eq!(range.sample(&mut rng, 2).unwrap().as_str(), "1.50");
}

#[test]
fn test_dispatch_config_needs_an_account() {
    let result = DispatchConfig::new(
        Vec::new(),
        AmountRange::new(1.0, 2.0).unwrap(),
        DelayRange::new(0, 1).unwrap(),
        ScheduleConfig::default(),
        CredentialScope::First,
    );
    assert!(matches!(result, Err(DispatchError::NoAccounts)));
}
