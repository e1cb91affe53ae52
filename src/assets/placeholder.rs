//! Placeholder and bundled default visuals.
//!
//! DESIGN
//! ======
//! Two tiers of locally available images, neither needing the network:
//! - Placeholder: a flat schematic synthesized from the subject alone. It is
//!   the resolution floor and is never written to the store.
//! - Bundled default: the hand-authored isometric SVG set compiled into the
//!   binary. `seed_defaults` and `reset` write these into the store.
//!
//! Both are pure functions of the subject, so repeated calls return the same
//! bytes.

use std::fmt::Write;

use super::datauri;
use super::key::{ProcessType, ProductType, Subject};

const SVG_MIME: &str = "image/svg+xml";

const PANEL_FILL: &str = "#0b1120";
const PANEL_STROKE: &str = "#1e293b";
const LABEL_FILL: &str = "#94a3b8";

// =============================================================================
// PLACEHOLDER
// =============================================================================

/// Accent colour per archetype.
fn accent(subject: Subject) -> &'static str {
    match subject {
        Subject::Process(ProcessType::Stamping) => "#facc15",
        Subject::Process(ProcessType::Molding) => "#3b82f6",
        Subject::Process(ProcessType::Plating) => "#06b6d4",
        Subject::Process(ProcessType::Assembly) => "#f97316",
        Subject::Product(ProductType::HvConnectorHsg) => "#ea580c",
        Subject::Product(ProductType::BusbarClip) => "#d97706",
        Subject::Product(ProductType::SensorTerminal) => "#eab308",
    }
}

/// Simple glyph drawn in the centre of the panel.
fn glyph(subject: Subject, color: &str) -> String {
    match subject {
        Subject::Process(ProcessType::Stamping) => format!(
            r#"<rect x="60" y="50" width="80" height="16" fill="{color}"/><rect x="66" y="66" width="10" height="60" fill="{color}" fill-opacity="0.6"/><rect x="124" y="66" width="10" height="60" fill="{color}" fill-opacity="0.6"/><rect x="84" y="70" width="32" height="24" fill="{color}"/><rect x="56" y="126" width="88" height="12" fill="{color}" fill-opacity="0.8"/>"#
        ),
        Subject::Process(ProcessType::Molding) => format!(
            r#"<rect x="40" y="100" width="120" height="30" fill="{color}" fill-opacity="0.6"/><rect x="60" y="70" width="30" height="30" fill="{color}"/><path d="M120 70 L140 40 L155 40 L140 70 Z" fill="{color}"/>"#
        ),
        Subject::Process(ProcessType::Plating) => format!(
            r#"<rect x="40" y="90" width="50" height="40" fill="{color}" fill-opacity="0.6"/><rect x="110" y="90" width="50" height="40" fill="{color}" fill-opacity="0.6"/><path d="M35 60 L165 60" stroke="{color}" stroke-width="4"/>"#
        ),
        Subject::Process(ProcessType::Assembly) => format!(
            r#"<ellipse cx="100" cy="130" rx="28" ry="10" fill="{color}" fill-opacity="0.6"/><path d="M100 130 L100 85 L135 60" stroke="{color}" stroke-width="6" fill="none"/><circle cx="100" cy="85" r="7" fill="{color}"/>"#
        ),
        Subject::Product(_) => format!(
            r#"<path d="M100 50 L145 72 L145 118 L100 140 L55 118 L55 72 Z" fill="none" stroke="{color}" stroke-width="3"/><path d="M55 72 L100 94 L145 72 M100 94 L100 140" stroke="{color}" stroke-width="2" fill="none"/>"#
        ),
    }
}

/// SVG source of the placeholder for `subject`.
#[must_use]
pub fn placeholder_svg(subject: Subject) -> String {
    let color = accent(subject);
    let mut svg = String::with_capacity(768);
    let _ = write!(
        svg,
        r#"<svg viewBox="0 0 200 200" xmlns="http://www.w3.org/2000/svg"><rect x="4" y="4" width="192" height="192" rx="16" fill="{PANEL_FILL}" stroke="{PANEL_STROKE}" stroke-width="2"/>"#
    );
    svg.push_str(&glyph(subject, color));
    let _ = write!(
        svg,
        r#"<text x="100" y="176" text-anchor="middle" font-family="monospace" font-size="11" fill="{LABEL_FILL}">{}</text></svg>"#,
        subject.display_name().to_uppercase()
    );
    svg
}

/// Placeholder encoded as a data URI.
#[must_use]
pub fn placeholder(subject: Subject) -> String {
    datauri::encode(SVG_MIME, placeholder_svg(subject).as_bytes())
}

// =============================================================================
// BUNDLED DEFAULTS
// =============================================================================

/// SVG source of the bundled default for `subject`.
#[must_use]
pub fn bundled_svg(subject: Subject) -> &'static str {
    match subject {
        Subject::Process(ProcessType::Stamping) => include_str!("../../assets/stamping.svg"),
        Subject::Process(ProcessType::Molding) => include_str!("../../assets/molding.svg"),
        Subject::Process(ProcessType::Plating) => include_str!("../../assets/plating.svg"),
        Subject::Process(ProcessType::Assembly) => include_str!("../../assets/assembly.svg"),
        Subject::Product(ProductType::HvConnectorHsg) => include_str!("../../assets/hv-connector-hsg.svg"),
        Subject::Product(ProductType::BusbarClip) => include_str!("../../assets/busbar-clip.svg"),
        Subject::Product(ProductType::SensorTerminal) => include_str!("../../assets/sensor-terminal.svg"),
    }
}

/// Bundled default encoded as a data URI.
#[must_use]
pub fn bundled(subject: Subject) -> String {
    datauri::encode(SVG_MIME, bundled_svg(subject).trim().as_bytes())
}
