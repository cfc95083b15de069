/// A prefixed message split into a command word and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Lower-cased command name. Empty for a bare prefix.
    pub command: String,
    pub args: Vec<String>,
}

/// Parse `text` as a command. `None` unless the text starts with `prefix`.
pub fn parse_invocation(text: &str, prefix: &str) -> Option<Invocation> {
    if prefix.is_empty() {
        return None;
    }
    let rest = text.strip_prefix(prefix)?;
    let mut words = rest.split_whitespace();
    let command = words.next().unwrap_or_default().to_lowercase();
    Some(Invocation {
        command,
        args: words.map(str::to_string).collect(),
    })
}

/// Fill `{prefix}`, `{command}` and `{seconds}` in a notice template.
pub fn render_notice(template: &str, prefix: &str, command: &str, seconds: u64) -> String {
    template
        .replace("{prefix}", prefix)
        .replace("{command}", command)
        .replace("{seconds}", &seconds.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_and_args() {
        let inv = parse_invocation(".Echo  hello   world", ".").unwrap();
        assert_eq!(inv.command, "echo");
        assert_eq!(inv.args, vec!["hello", "world"]);
    }

    #[test]
    fn test_prefix_must_be_at_start() {
        assert!(parse_invocation("hello .ping", ".").is_none());
        assert!(parse_invocation(" .ping", ".").is_none());
        assert!(parse_invocation("ping", ".").is_none());
        assert!(parse_invocation("", ".").is_none());
    }

    #[test]
    fn test_multi_char_prefix() {
        let inv = parse_invocation("!!ping", "!!").unwrap();
        assert_eq!(inv.command, "ping");
        assert!(parse_invocation("!ping", "!!").is_none());
    }

    #[test]
    fn test_bare_prefix_has_empty_command() {
        let inv = parse_invocation(".", ".").unwrap();
        assert_eq!(inv.command, "");
        assert!(inv.args.is_empty());
        assert_eq!(parse_invocation(".   ", ".").unwrap().command, "");
    }

    #[test]
    fn test_render_notice() {
        assert_eq!(
            render_notice("Wait {seconds}s before {prefix}{command}", ".", "ping", 2),
            "Wait 2s before .ping"
        );
    }
}
