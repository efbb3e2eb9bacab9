//! Threshold band properties and override semantics.

use gridshift::resolve::CookieSignals;
use gridshift::theme::Intensity;

#[test]
fn percentages_below_fifty_are_high_intensity() {
    for p in 0..50 {
        assert_eq!(
            Intensity::from_low_carbon_percentage(f64::from(p)),
            Intensity::High,
            "p={p}"
        );
    }
}

#[test]
fn percentages_fifty_to_seventy_are_moderate() {
    for p in 50..70 {
        assert_eq!(
            Intensity::from_low_carbon_percentage(f64::from(p)),
            Intensity::Moderate,
            "p={p}"
        );
    }
}

#[test]
fn percentages_seventy_to_hundred_are_low_intensity() {
    for p in 70..=100 {
        assert_eq!(
            Intensity::from_low_carbon_percentage(f64::from(p)),
            Intensity::Low,
            "p={p}"
        );
    }
}

#[test]
fn every_percentage_lands_in_exactly_one_band() {
    for p in 0..=100 {
        let intensity = Intensity::from_low_carbon_percentage(f64::from(p));
        assert_ne!(intensity, Intensity::Unknown, "p={p} must map to a band");
    }
}

#[test]
fn override_cookie_yields_matching_theme() {
    for (value, expected) in [
        ("low", Intensity::Low),
        ("moderate", Intensity::Moderate),
        ("high", Intensity::High),
    ] {
        let signals =
            CookieSignals::from_header(Some(&format!("selected-intensity={value}")));
        assert_eq!(signals.override_intensity, Some(expected));
    }
}

#[test]
fn live_and_absent_cookie_both_fall_through() {
    let live = CookieSignals::from_header(Some("selected-intensity=live"));
    assert_eq!(live.override_intensity, None);
    assert!(!live.disabled);

    let absent = CookieSignals::from_header(None);
    assert_eq!(absent.override_intensity, None);
    assert!(!absent.disabled);
}
