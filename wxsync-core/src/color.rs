//! Display colours for alerts and outlook categories.

/// Fill colour for an alert event, following the NWS hazard palette for the
/// common products and falling back on the product type suffix.
pub fn alert_color(event: &str) -> &'static str {
    const TABLE: &[(&str, &str)] = &[
        ("Tornado Warning", "#FF0000"),
        ("Extreme Wind Warning", "#FF8C00"),
        ("Severe Thunderstorm Warning", "#FFA500"),
        ("Flash Flood Warning", "#8B0000"),
        ("Flash Flood Emergency", "#8B0000"),
        ("Hurricane Warning", "#DC143C"),
        ("Blizzard Warning", "#FF4500"),
        ("Ice Storm Warning", "#8B008B"),
        ("Winter Storm Warning", "#FF69B4"),
        ("Flood Warning", "#00FF00"),
        ("Excessive Heat Warning", "#C71585"),
        ("Red Flag Warning", "#FF1493"),
        ("Tornado Watch", "#FFFF00"),
        ("Severe Thunderstorm Watch", "#DB7093"),
        ("Flash Flood Watch", "#2E8B57"),
        ("Winter Storm Watch", "#4682B4"),
        ("Winter Weather Advisory", "#7B68EE"),
        ("Heat Advisory", "#FF7F50"),
        ("Wind Advisory", "#D2B48C"),
        ("Dense Fog Advisory", "#708090"),
        ("Flood Advisory", "#00FF7F"),
        ("Special Weather Statement", "#FFE4B5"),
    ];

    let event = event.trim();
    if let Some((_, color)) = TABLE.iter().find(|(name, _)| name.eq_ignore_ascii_case(event)) {
        return color;
    }

    let lower = event.to_lowercase();
    if lower.ends_with("warning") || lower.ends_with("emergency") {
        "#FF0000"
    } else if lower.ends_with("watch") {
        "#FFD700"
    } else if lower.ends_with("advisory") {
        "#FFA07A"
    } else {
        "#C0C0C0"
    }
}

/// Readable text colour over `hex` by YIQ luminance: black on light fills,
/// white on dark ones. Unparseable input gets white.
pub fn contrast_text(hex: &str) -> &'static str {
    let digits = hex.trim().trim_start_matches('#');
    let channel = |i: usize| {
        digits
            .get(i..i + 2)
            .and_then(|c| u8::from_str_radix(c, 16).ok())
            .map_or(0.0, f64::from)
    };
    if digits.len() != 6 {
        return "white";
    }
    let yiq = (channel(0) * 299.0 + channel(2) * 587.0 + channel(4) * 114.0) / 1000.0;
    if yiq >= 128.0 { "black" } else { "white" }
}
