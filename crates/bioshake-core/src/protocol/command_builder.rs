//! Command Builder
//!
//! Builds request frames for the BioShake ASCII protocol.
//!
//! A frame is the command name followed by each argument in its `Display`
//! form, with no separators, terminated by a single carriage return:
//!
//! ```text
//! setShakeTargetSpeed1000\r
//! shakeOnWithRuntime30\r
//! ```
//!
//! Arguments are not escaped; callers must not pass values containing the
//! terminator.

use std::fmt::{Display, Write};

/// Request frame terminator
pub const FRAME_TERMINATOR: u8 = b'\r';

/// Build a request frame from a command name and its arguments
pub fn build_frame(command: &str, args: &[&dyn Display]) -> Vec<u8> {
    let mut text = String::from(command);
    for arg in args {
        // Writing into a String cannot fail
        let _ = write!(text, "{}", arg);
    }
    let mut frame = text.into_bytes();
    frame.push(FRAME_TERMINATOR);
    frame
}

/// Recover the command text of a frame, without its terminator
pub fn command_text(frame: &[u8]) -> String {
    String::from_utf8_lossy(frame).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_without_args() {
        assert_eq!(build_frame("getVersion", &[]), b"getVersion\r".to_vec());
    }

    #[test]
    fn test_frame_with_integer_arg() {
        assert_eq!(
            build_frame("shakeOnWithRuntime", &[&30u32]),
            b"shakeOnWithRuntime30\r".to_vec()
        );
    }

    #[test]
    fn test_frame_concatenates_multiple_args() {
        let frame = build_frame("cmd", &[&1u8, &"ab", &-7i32]);
        assert_eq!(frame, b"cmd1ab-7\r".to_vec());
    }

    #[test]
    fn test_single_terminator() {
        let frame = build_frame("setShakeTargetSpeed", &[&1000u32]);
        let terminators = frame.iter().filter(|b| **b == FRAME_TERMINATOR).count();
        assert_eq!(terminators, 1);
        assert_eq!(frame.last(), Some(&FRAME_TERMINATOR));
    }

    #[test]
    fn test_command_text_strips_terminator() {
        let frame = build_frame("shakeOnWithRuntime", &[&99999u32]);
        assert_eq!(command_text(&frame), "shakeOnWithRuntime99999");
    }
}
