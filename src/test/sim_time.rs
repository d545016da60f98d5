use crate::sim::SimTime;

#[test]
fn sim_time_unit_conversions() {
    assert_eq!(SimTime::from_micros(1), SimTime(1_000));
    assert_eq!(SimTime::from_millis(1), SimTime(1_000_000));
    assert_eq!(SimTime::from_secs(1), SimTime(1_000_000_000));
}

#[test]
fn sim_time_unit_conversions_saturate_on_overflow() {
    assert_eq!(SimTime::from_micros(u64::MAX), SimTime(u64::MAX));
    assert_eq!(SimTime::from_millis(u64::MAX), SimTime(u64::MAX));
    assert_eq!(SimTime::from_secs(u64::MAX), SimTime(u64::MAX));
}

#[test]
fn sim_time_scaled_millis_divides_by_speed() {
    assert_eq!(SimTime::from_millis_scaled(1000, 1.0), SimTime::from_millis(1000));
    assert_eq!(SimTime::from_millis_scaled(1000, 2.0), SimTime::from_millis(500));
    assert_eq!(SimTime::from_millis_scaled(300, 0.5), SimTime::from_millis(600));
    assert_eq!(SimTime::from_millis_scaled(0, 3.0), SimTime::ZERO);
}

#[test]
fn sim_time_scaled_millis_rounds_to_nanoseconds() {
    // 1ms / 3 = 333_333.33..ns
    assert_eq!(SimTime::from_millis_scaled(1, 3.0), SimTime(333_333));
}

#[test]
fn sim_time_saturating_arithmetic() {
    assert_eq!(SimTime(5).saturating_sub(SimTime(10)), SimTime::ZERO);
    assert_eq!(SimTime(u64::MAX).saturating_add(SimTime(1)), SimTime(u64::MAX));
    assert_eq!(SimTime::from_millis(3).as_millis_f64(), 3.0);
}
