//! # Focus monitor
//!
//! ## Responsibility
//! Turns the page-level events a browser host observes (visibility, blur,
//! key-downs, context menu, unload, fullscreen) into anti-cheat policy:
//! a cumulative violation counter and a blocking modal.
//!
//! ## Policy
//! | event                         | violation | modal | host action      |
//! |-------------------------------|-----------|-------|------------------|
//! | page hidden                   | +1        | show  | none             |
//! | window blur                   | +1        | show  | none             |
//! | blocked shortcut              | +1        | show  | prevent default  |
//! | context menu                  |           |       | prevent default  |
//! | before unload                 |           |       | confirm prompt   |
//! | fullscreen exited             |           |       | none (tracked)   |
//!
//! Every infraction that raises the modal counts once, shortcuts included.
//!
//! ## Lifecycle
//! One owner calls [`FocusMonitor::start`] once the participant has joined
//! an active challenge and [`FocusMonitor::stop`] when that stops being
//! true. Events outside that window are passed through untouched.

use serde::Serialize;
use tokio::sync::watch;
use tracing::info;

use crate::keys::{Key, KeyCombo};

pub const UNLOAD_PROMPT: &str =
    "Leaving this page during an active challenge may lose your work. Leave anyway?";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusEvent {
    VisibilityChanged { hidden: bool },
    WindowBlur,
    WindowFocus,
    KeyDown(KeyCombo),
    ContextMenu,
    BeforeUnload,
    FullscreenChanged { active: bool },
}

/// Why a violation was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    TabHidden,
    WindowBlur,
    BlockedShortcut,
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViolationKind::TabHidden => write!(f, "tab hidden"),
            ViolationKind::WindowBlur => write!(f, "window lost focus"),
            ViolationKind::BlockedShortcut => write!(f, "blocked shortcut"),
        }
    }
}

/// What the host must do with the native event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Allow,
    PreventDefault,
    /// Ask the user to confirm leaving; browsers may show their own text.
    ConfirmUnload(&'static str),
}

/// Follow-up the host performs after the modal is acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    RequestFullscreen,
}

/// Tab/window management shortcuts blocked during a challenge.
pub fn is_blocked_shortcut(key: &KeyCombo) -> bool {
    let primary = key.ctrl || key.meta;
    let new_or_close = ['t', 'n', 'w'].iter().any(|c| key.is_letter(*c));
    (primary && new_or_close)
        || (key.ctrl && key.key == Key::Tab)
        || (key.alt && key.key == Key::Tab)
}

#[derive(Debug)]
pub struct FocusMonitor {
    active: bool,
    violations: watch::Sender<u32>,
    modal: watch::Sender<bool>,
    fullscreen: bool,
    last_violation: Option<ViolationKind>,
}

impl Default for FocusMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl FocusMonitor {
    pub fn new() -> Self {
        let (violations, _) = watch::channel(0);
        let (modal, _) = watch::channel(false);
        Self {
            active: false,
            violations,
            modal,
            fullscreen: false,
            last_violation: None,
        }
    }

    pub fn start(&mut self) {
        if !self.active {
            info!("focus monitor started");
        }
        self.active = true;
    }

    /// Stop reacting to events. The counter is kept.
    pub fn stop(&mut self) {
        if self.active {
            info!(violations = self.violation_count(), "focus monitor stopped");
        }
        self.active = false;
        self.modal.send_replace(false);
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn violation_count(&self) -> u32 {
        *self.violations.borrow()
    }

    pub fn modal_visible(&self) -> bool {
        *self.modal.borrow()
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn last_violation(&self) -> Option<ViolationKind> {
        self.last_violation
    }

    pub fn subscribe_violations(&self) -> watch::Receiver<u32> {
        self.violations.subscribe()
    }

    pub fn subscribe_modal(&self) -> watch::Receiver<bool> {
        self.modal.subscribe()
    }

    pub fn handle(&mut self, event: &FocusEvent) -> Disposition {
        if !self.active {
            return Disposition::Allow;
        }
        match event {
            FocusEvent::VisibilityChanged { hidden: true } => {
                self.violation(ViolationKind::TabHidden);
                Disposition::Allow
            }
            FocusEvent::WindowBlur => {
                self.violation(ViolationKind::WindowBlur);
                Disposition::Allow
            }
            FocusEvent::KeyDown(key) if is_blocked_shortcut(key) => {
                self.violation(ViolationKind::BlockedShortcut);
                Disposition::PreventDefault
            }
            FocusEvent::ContextMenu => Disposition::PreventDefault,
            FocusEvent::BeforeUnload => Disposition::ConfirmUnload(UNLOAD_PROMPT),
            FocusEvent::FullscreenChanged { active } => {
                self.fullscreen = *active;
                Disposition::Allow
            }
            FocusEvent::VisibilityChanged { hidden: false }
            | FocusEvent::WindowFocus
            | FocusEvent::KeyDown(_) => Disposition::Allow,
        }
    }

    /// Close the modal and ask the host to re-enter fullscreen. The
    /// violation counter is not touched.
    pub fn acknowledge(&mut self) -> Directive {
        self.modal.send_replace(false);
        Directive::RequestFullscreen
    }

    fn violation(&mut self, kind: ViolationKind) {
        self.violations.send_modify(|n| *n = n.saturating_add(1));
        self.modal.send_replace(true);
        self.last_violation = Some(kind);
        info!(kind = %kind, total = self.violation_count(), "focus violation");
    }
}
