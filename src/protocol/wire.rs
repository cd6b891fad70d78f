//! Parsing of the `CMD:<command>:<payload>` wire format and formatting of
//! `RSP:`/`ACK:`/`ERR:` responses.

/// A parsed command line: `CMD:<name>[:<payload>]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub payload: String,
}

/// Parses a `CMD:` line, splitting on the first colon only so a JSON
/// payload containing colons is preserved intact. Returns `None` if the
/// line isn't a `CMD:` message at all.
pub fn parse_command(line: &str) -> Option<Command> {
    let rest = line.strip_prefix("CMD:")?;
    let (name, payload) = match rest.find(':') {
        Some(index) => (&rest[..index], &rest[index + 1..]),
        None => (rest, ""),
    };
    Some(Command {
        name: name.trim().to_ascii_lowercase(),
        payload: payload.to_string(),
    })
}

/// Formats a successful response carrying a JSON body: `RSP:<name>:<json>`.
pub fn response(name: &str, json: &str) -> String {
    format!("RSP:{name}:{json}")
}

/// Formats a bare acknowledgement: `ACK:<name>:<detail>`.
pub fn ack(name: &str, detail: impl std::fmt::Display) -> String {
    format!("ACK:{name}:{detail}")
}

/// Formats an error response: `ERR:<name>:<message>`.
pub fn err(name: &str, message: impl std::fmt::Display) -> String {
    format!("ERR:{name}:{message}")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(
        "CMD:note:{\"content\":\"a:b\"}",
        Some(Command { name: "note".to_string(), payload: "{\"content\":\"a:b\"}".to_string() })
    )]
    #[case("CMD:ping", Some(Command { name: "ping".to_string(), payload: String::new() }))]
    #[case("RSP:pong", None)]
    fn parse_command_splits_on_first_colon_only(
        #[case] input: &str,
        #[case] expected: Option<Command>,
    ) {
        assert_eq!(expected, parse_command(input));
    }

    #[test]
    fn parse_command_lowercases_and_trims_name() {
        let parsed = parse_command("CMD: Note :{}").expect("parsed");
        assert_eq!("note", parsed.name);
    }

    #[test]
    fn formatters_produce_expected_wire_strings() {
        assert_eq!("RSP:status:{}", response("status", "{}"));
        assert_eq!("ACK:note:42", ack("note", 42));
        assert_eq!("ERR:note:missing content field", err("note", "missing content field"));
    }
}
