//! Menu-side collaborators: the logical actions a key can be bound to, the
//! navigation engine those actions drive, and the status surface the
//! calibration wizard prints its prompts on.
//!
//! This crate never renders a menu itself. Hosts implement [`Navigator`] and
//! [`StatusDisplay`] on top of whatever menu engine and screen they own.

use serde::Serialize;
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;
use tracing::warn;

/// One of the three operations a physical key can trigger.
///
/// Parsed with [`FromStr`], which also accepts the legacy camel-case names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MenuAction {
    PreviousItem,
    NextItem,
    SelectItem,
}

impl MenuAction {
    /// Capture order used by the calibration wizard.
    pub const CAPTURE_ORDER: [MenuAction; 3] = [
        MenuAction::NextItem,
        MenuAction::PreviousItem,
        MenuAction::SelectItem,
    ];

    /// Name as written to calibration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            MenuAction::PreviousItem => "previous-item",
            MenuAction::NextItem => "next-item",
            MenuAction::SelectItem => "select-item",
        }
    }

    /// Invoke the matching operation on `nav`.
    pub fn dispatch(self, nav: &dyn Navigator) {
        match self {
            MenuAction::PreviousItem => nav.previous_item(),
            MenuAction::NextItem => nav.next_item(),
            MenuAction::SelectItem => nav.select_item(),
        }
    }
}

impl fmt::Display for MenuAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names none of the three actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAction(pub String);

impl FromStr for MenuAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "previous-item" | "prevItem" => Ok(MenuAction::PreviousItem),
            "next-item" | "nextItem" => Ok(MenuAction::NextItem),
            "select-item" | "selectItem" => Ok(MenuAction::SelectItem),
            other => Err(UnknownAction(other.to_string())),
        }
    }
}

/// The menu navigation engine, as seen by key bindings.
///
/// Methods are invoked from listener threads, one thread per device, so
/// implementations must synchronize internally.
pub trait Navigator: Send + Sync {
    fn previous_item(&self);
    fn next_item(&self);
    fn select_item(&self);
}

/// Text surface used for wizard prompts.
pub trait StatusDisplay {
    fn clear(&mut self);
    fn print_line(&mut self, line: &str);
}

/// [`StatusDisplay`] that writes to stdout, clearing with ANSI escapes.
#[derive(Debug, Default)]
pub struct TerminalStatus;

impl StatusDisplay for TerminalStatus {
    fn clear(&mut self) {
        if let Err(e) = clear_screen(&mut io::stdout().lock()) {
            warn!("cannot clear terminal: {e}");
        }
    }

    fn print_line(&mut self, line: &str) {
        println!("{line}");
    }
}

fn clear_screen(out: &mut impl Write) -> io::Result<()> {
    out.write_all(b"\x1b[2J\x1b[H")?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<&'static str>>);

    impl Navigator for Recorder {
        fn previous_item(&self) {
            self.0.lock().unwrap().push("prev");
        }
        fn next_item(&self) {
            self.0.lock().unwrap().push("next");
        }
        fn select_item(&self) {
            self.0.lock().unwrap().push("select");
        }
    }

    #[test]
    fn parses_current_and_legacy_names() {
        assert_eq!("next-item".parse(), Ok(MenuAction::NextItem));
        assert_eq!("prevItem".parse(), Ok(MenuAction::PreviousItem));
        assert_eq!("selectItem".parse(), Ok(MenuAction::SelectItem));
        assert_eq!(
            "doSomethingUnknown".parse::<MenuAction>(),
            Err(UnknownAction("doSomethingUnknown".into()))
        );
    }

    #[test]
    fn display_matches_file_spelling() {
        for action in MenuAction::CAPTURE_ORDER {
            let json = serde_json::to_string(&action).unwrap();
            assert_eq!(json, format!("\"{action}\""));
        }
    }

    #[test]
    fn dispatch_calls_matching_method() {
        let nav = Recorder::default();
        MenuAction::SelectItem.dispatch(&nav);
        MenuAction::PreviousItem.dispatch(&nav);
        MenuAction::NextItem.dispatch(&nav);
        assert_eq!(*nav.0.lock().unwrap(), vec!["select", "prev", "next"]);
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn clear_screen_writes_escape_and_reports_failures() {
        let mut buf = Vec::new();
        clear_screen(&mut buf).unwrap();
        assert_eq!(buf, b"\x1b[2J\x1b[H");

        let err = clear_screen(&mut ClosedPipe).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
