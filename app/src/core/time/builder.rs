/// Shorthand for timestamps and durations, e.g. `t!(now)`, `t!(10 seconds)`, `t!(3 seconds ago)`.
#[macro_export]
macro_rules! t {
    (now) => {{
        $crate::core::time::DateTime::now()
    }};

    ($amount:literal millis) => {{
        $crate::core::time::Duration::millis($amount)
    }};
    ($amount:literal seconds) => {{
        $crate::core::time::Duration::seconds($amount)
    }};

    ($amount:literal seconds ago) => {{
        $crate::t!(now) - $crate::t!($amount seconds)
    }};
}

#[cfg(test)]
mod tests {
    use crate::core::time::*;

    #[test]
    fn durations() {
        assert_eq!(t!(1500 millis), Duration::from_secs_f64(1.5));
        assert_eq!(t!(10 seconds), Duration::millis(10_000));
    }

    #[test]
    fn seconds_ago_is_relative_to_fixed_now() {
        let fake_now = DateTime::from_iso("2025-06-01T12:00:10Z").unwrap();

        let dt = FIXED_NOW.sync_scope(fake_now, || t!(10 seconds ago));

        assert_eq!(dt, DateTime::from_iso("2025-06-01T12:00:00Z").unwrap());
    }
}
