/// Bounds `value` into `[0, capacity]`.
///
/// Zero is `T::default()`. `capacity` is assumed non-negative; the catalog
/// rejects negative capacities before anything reaches here.
pub fn clamp<T>(value: T, capacity: T) -> T
where
    T: PartialOrd + Default + Copy,
{
    let zero = T::default();
    if value < zero {
        zero
    } else if value > capacity {
        capacity
    } else {
        value
    }
}

/// `estimate / capacity` bounded into `[0, 1]`. Zero-capacity stations are
/// always at rate 0.
pub fn occupancy_rate(estimate: f64, capacity: u32) -> f64 {
    if capacity == 0 {
        return 0.0;
    }
    clamp(estimate / f64::from(capacity), 1.0)
}
