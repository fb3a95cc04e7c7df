mod client;
mod codec;
mod connection;
mod folder;
#[cfg(test)]
pub mod mock_connection;
mod probe;
mod response_stream;
mod send_command;
mod session;
mod tag_generator;

pub use client::Client;
pub use connection::Connection;
pub use folder::RemoteFolder;
pub use probe::CheckOutcome;
pub use probe::check_connection;
pub use send_command::SendCommand;
pub use session::Session;

/// Quotes an astring for transmission inside a command line.
pub(crate) fn quoted(value: &str) -> String {
    let escaped = value.replace('\\', r"\\").replace('"', r#"\""#);
    format!("\"{escaped}\"")
}

#[cfg(test)]
mod tests {
    use rstest::*;

    use super::*;

    #[rstest]
    #[case(r#""INBOX""#, "INBOX")]
    #[case(r#""a \"b\" c""#, r#"a "b" c"#)]
    #[case(r#""back\\slash""#, r"back\slash")]
    fn test_quoted_escapes_specials(#[case] expected: &str, #[case] input: &str) {
        assert_eq!(expected, quoted(input));
    }
}
