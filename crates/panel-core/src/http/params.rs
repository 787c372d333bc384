//! Query-string decoding into actuator commands.
//!
//! Tokens decode left-to-right with last-token-wins per key, so a query
//! carrying both `red=1` and `red=0` resolves deterministically to the later
//! token. Unknown tokens are ignored; decoding never fails.

use heapless::Vec;

use crate::actuator::ActuatorId;

/// One per actuator plus the alarm pseudo-actuator.
pub const MAX_COMMANDS: usize = ActuatorId::COUNT + 1;

/// A decoded mutation. `Alarm` is the pseudo-actuator whose levels mean
/// engage/disengage the oscillator rather than a direct output write.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Command {
    Set(ActuatorId, bool),
    Alarm(bool),
}

pub fn decode_query(query: &str) -> Vec<Command, MAX_COMMANDS> {
    let mut red = None;
    let mut green = None;
    let mut blue = None;

    // Fast path: the panel's common form, all three levels in one atomic
    // command. Anything after the triple still goes through the independent
    // buzzer/alarm scan below, but cannot override the triple.
    if let Some((r, g, b)) = decode_rgb_triple(query) {
        red = Some(r);
        green = Some(g);
        blue = Some(b);
    } else {
        for token in query.split('&') {
            let Some((key, value)) = token.split_once('=') else {
                continue;
            };
            let Some(level) = parse_level(value) else {
                continue;
            };
            match key {
                "red" => red = Some(level),
                "green" => green = Some(level),
                "blue" => blue = Some(level),
                _ => {}
            }
        }
    }

    // Buzzer and alarm decode independently of the color form in use.
    let mut buzzer = None;
    let mut alarm = None;
    for token in query.split('&') {
        let Some((key, value)) = token.split_once('=') else {
            continue;
        };
        let Some(level) = parse_level(value) else {
            continue;
        };
        match key {
            "buzzer" => buzzer = Some(level),
            "alarm" => alarm = Some(level),
            _ => {}
        }
    }

    let mut commands = Vec::new();
    for (id, level) in [
        (ActuatorId::Red, red),
        (ActuatorId::Green, green),
        (ActuatorId::Blue, blue),
        (ActuatorId::Buzzer, buzzer),
    ] {
        if let Some(level) = level {
            let _ = commands.push(Command::Set(id, level));
        }
    }
    if let Some(level) = alarm {
        let _ = commands.push(Command::Alarm(level));
    }
    commands
}

/// Matches the leading `red=<int>&green=<int>&blue=<int>` token run, in that
/// order. Any nonzero integer level means on.
fn decode_rgb_triple(query: &str) -> Option<(bool, bool, bool)> {
    let mut tokens = query.split('&');
    let r = parse_int_token(tokens.next()?, "red")?;
    let g = parse_int_token(tokens.next()?, "green")?;
    let b = parse_int_token(tokens.next()?, "blue")?;
    Some((r, g, b))
}

fn parse_int_token(token: &str, key: &str) -> Option<bool> {
    let (token_key, value) = token.split_once('=')?;
    if token_key != key {
        return None;
    }
    value.parse::<i32>().ok().map(|level| level != 0)
}

/// Single-toggle tokens only accept the literal levels `0` and `1`.
fn parse_level(value: &str) -> Option<bool> {
    match value {
        "0" => Some(false),
        "1" => Some(true),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoded(query: &str) -> Vec<Command, MAX_COMMANDS> {
        decode_query(query)
    }

    #[test]
    fn rgb_triple_decodes_atomically() {
        let commands = decoded("red=1&green=0&blue=1");
        assert_eq!(
            commands.as_slice(),
            &[
                Command::Set(ActuatorId::Red, true),
                Command::Set(ActuatorId::Green, false),
                Command::Set(ActuatorId::Blue, true),
            ]
        );
    }

    #[test]
    fn triple_accepts_any_integer_level() {
        let commands = decoded("red=7&green=0&blue=1");
        assert_eq!(commands[0], Command::Set(ActuatorId::Red, true));
    }

    #[test]
    fn single_toggle_decodes() {
        assert_eq!(
            decoded("green=1").as_slice(),
            &[Command::Set(ActuatorId::Green, true)]
        );
    }

    #[test]
    fn conflicting_tokens_resolve_last_wins() {
        assert_eq!(
            decoded("red=1&red=0").as_slice(),
            &[Command::Set(ActuatorId::Red, false)]
        );
        assert_eq!(
            decoded("red=0&red=1").as_slice(),
            &[Command::Set(ActuatorId::Red, true)]
        );
    }

    #[test]
    fn buzzer_and_alarm_decode_alongside_the_triple() {
        let commands = decoded("red=1&green=1&blue=1&buzzer=1&alarm=1");
        assert_eq!(commands.len(), 5);
        assert_eq!(commands[3], Command::Set(ActuatorId::Buzzer, true));
        assert_eq!(commands[4], Command::Alarm(true));
    }

    #[test]
    fn triple_is_not_overridden_by_trailing_color_tokens() {
        let commands = decoded("red=1&green=1&blue=1&red=0");
        assert_eq!(commands[0], Command::Set(ActuatorId::Red, true));
    }

    #[test]
    fn unknown_tokens_and_garbage_are_ignored() {
        assert!(decoded("volume=3&red&=&x").is_empty());
        assert_eq!(
            decoded("volume=3&blue=0").as_slice(),
            &[Command::Set(ActuatorId::Blue, false)]
        );
    }

    #[test]
    fn non_binary_single_toggle_levels_are_ignored() {
        assert!(decoded("red=2").is_empty());
        assert!(decoded("alarm=yes").is_empty());
    }

    #[test]
    fn alarm_disengage_decodes() {
        assert_eq!(decoded("alarm=0").as_slice(), &[Command::Alarm(false)]);
    }
}
