//! Violation kinds
//!
//! The closed set of rule-break signals a session reacts to. Detection of
//! each signal happens outside the state machine; adapters translate raw
//! environment events into one of these kinds and call
//! `MonitoredSession::record_violation`.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A detected rule-break signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// The page became hidden (tab switch, minimize).
    TabSwitch,
    /// The window lost focus.
    FocusLoss,
    /// Copy shortcut blocked.
    CopyBlocked,
    /// Paste shortcut blocked.
    PasteBlocked,
    /// Context menu blocked.
    RightClickBlocked,
    /// F12 blocked.
    F12Blocked,
    /// Developer tools shortcut blocked.
    DevToolsBlocked,
    /// Console shortcut blocked.
    ConsoleBlocked,
    /// View-source shortcut blocked.
    ViewSourceBlocked,
    /// Save-page shortcut blocked.
    SaveBlocked,
    /// Select-all shortcut blocked.
    SelectAllBlocked,
    /// Window resized to an extreme aspect ratio.
    SuspiciousResize,
    /// Docked developer tools detected from window geometry.
    DevToolsDetected,
}

impl ViolationKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 13] = [
        Self::TabSwitch,
        Self::FocusLoss,
        Self::CopyBlocked,
        Self::PasteBlocked,
        Self::RightClickBlocked,
        Self::F12Blocked,
        Self::DevToolsBlocked,
        Self::ConsoleBlocked,
        Self::ViewSourceBlocked,
        Self::SaveBlocked,
        Self::SelectAllBlocked,
        Self::SuspiciousResize,
        Self::DevToolsDetected,
    ];

    /// Wire name, as stored in the event log.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TabSwitch => "tab_switch",
            Self::FocusLoss => "focus_loss",
            Self::CopyBlocked => "copy_blocked",
            Self::PasteBlocked => "paste_blocked",
            Self::RightClickBlocked => "right_click_blocked",
            Self::F12Blocked => "f12_blocked",
            Self::DevToolsBlocked => "dev_tools_blocked",
            Self::ConsoleBlocked => "console_blocked",
            Self::ViewSourceBlocked => "view_source_blocked",
            Self::SaveBlocked => "save_blocked",
            Self::SelectAllBlocked => "select_all_blocked",
            Self::SuspiciousResize => "suspicious_resize",
            Self::DevToolsDetected => "dev_tools_detected",
        }
    }

    /// Label for reports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::TabSwitch => "Tab Switch",
            Self::FocusLoss => "Focus Loss",
            Self::CopyBlocked => "Copy Text",
            Self::PasteBlocked => "Paste Text",
            Self::RightClickBlocked => "Right Click",
            Self::F12Blocked => "F12 Key",
            Self::DevToolsBlocked => "Dev Tools",
            Self::ConsoleBlocked => "Console Access",
            Self::ViewSourceBlocked => "View Source",
            Self::SaveBlocked => "Save Page",
            Self::SelectAllBlocked => "Select All",
            Self::SuspiciousResize => "Window Resize",
            Self::DevToolsDetected => "Dev Tools Detected",
        }
    }
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no known violation kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown violation kind '{0}'")]
pub struct UnknownViolation(pub String);

impl FromStr for ViolationKind {
    type Err = UnknownViolation;

    /// Parses a wire name; `-` is accepted in place of `_` and case is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| UnknownViolation(s.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_names_match_as_str() {
        for kind in ViolationKind::ALL {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, kind.as_str());
        }
    }

    #[test]
    fn test_parse_variants() {
        assert_eq!("tab_switch".parse(), Ok(ViolationKind::TabSwitch));
        assert_eq!("Focus-Loss".parse(), Ok(ViolationKind::FocusLoss));
        assert_eq!(" f12_blocked ".parse(), Ok(ViolationKind::F12Blocked));
        assert_eq!(
            "teleport".parse::<ViolationKind>(),
            Err(UnknownViolation("teleport".to_string()))
        );
    }

    #[test]
    fn test_labels() {
        assert_eq!(ViolationKind::CopyBlocked.label(), "Copy Text");
        assert_eq!(ViolationKind::DevToolsDetected.to_string(), "dev_tools_detected");
    }
}
