//! Wire protocol for the task server.
//!
//! Clients speak one command per `\n`-terminated line. The keyword is the
//! text before the first space, matched case-insensitively; everything after
//! the first space is a single opaque argument blob that each command splits
//! its own way. Every server reply is one or more text lines followed by a
//! blank line. The protocol has no length prefix, so that blank line is the
//! end-of-block marker client readers depend on.

/// Maximum accepted length of a single protocol line (8 KiB).
pub const MAX_LINE_BYTES: usize = 8 * 1024;

/// Welcome/help block, sent unprompted at connect and in reply to HELP.
pub const WELCOME: &str = "\
Welcome to the Task Server!
 HELP for commands:
 SIGNUP <user> <pwd>           create account
 LOGIN  <user> <pwd>           login
 NEWLIST <name> <code>         create new shared list
 JOINLIST <code>               join an existing list
 USELIST <code>                switch to that list
 MYLISTS                       show your lists
 ADD \"task text\"               add task to current list
 DONE <id> / DELETE <id>       mark done / remove
 LIST                          show tasks of current list
 LOGOUT                        logout
 DELETEACC <pwd>               delete account";

/// A fully parsed client command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Signup { username: String, password: String },
    Login { username: String, password: String },
    Logout,
    DeleteAcc { password: String },
    NewList { name: String, code: String },
    JoinList { code: String },
    UseList { code: String },
    MyLists,
    /// Task text with surrounding quotes stripped. May be empty; the domain
    /// layer rejects blank text so the reply wording stays in one place.
    Add { text: String },
    Done { id: String },
    Delete { id: String },
    List,
}

impl Command {
    /// Whether this command is only meaningful for a logged-in session.
    pub fn requires_auth(&self) -> bool {
        !matches!(
            self,
            Command::Help | Command::Signup { .. } | Command::Login { .. }
        )
    }
}

/// Why a line failed to parse into a [`Command`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Recognized keyword, malformed arguments. Carries the usage line and
    /// whether the command is login-gated, so the session can decide between
    /// the usage reply and the login prompt.
    Usage {
        usage: &'static str,
        requires_auth: bool,
    },
    /// Unrecognized keyword (including blank lines).
    Unknown,
}

const USAGE_SIGNUP: &str = "Usage: SIGNUP <username> <password>";
const USAGE_LOGIN: &str = "Usage: LOGIN <username> <password>";
const USAGE_DELETEACC: &str = "Usage: DELETEACC <password>";
const USAGE_NEWLIST: &str = "Usage: NEWLIST <name> <code>";
const USAGE_JOINLIST: &str = "Usage: JOINLIST <code>";
const USAGE_USELIST: &str = "Usage: USELIST <code>";
const USAGE_DONE: &str = "Usage: DONE <id>";
const USAGE_DELETE: &str = "Usage: DELETE <id>";

fn usage(usage: &'static str, requires_auth: bool) -> ParseError {
    ParseError::Usage {
        usage,
        requires_auth,
    }
}

/// Parse one client line into a [`Command`].
pub fn parse(line: &str) -> Result<Command, ParseError> {
    let line = line.trim();
    let (keyword, arg) = line.split_once(' ').unwrap_or((line, ""));

    match keyword.to_ascii_uppercase().as_str() {
        "HELP" => Ok(Command::Help),
        "SIGNUP" => match arg.split_whitespace().collect::<Vec<_>>()[..] {
            [username, password] => Ok(Command::Signup {
                username: username.to_string(),
                password: password.to_string(),
            }),
            _ => Err(usage(USAGE_SIGNUP, false)),
        },
        "LOGIN" => match arg.split_whitespace().collect::<Vec<_>>()[..] {
            [username, password] => Ok(Command::Login {
                username: username.to_string(),
                password: password.to_string(),
            }),
            _ => Err(usage(USAGE_LOGIN, false)),
        },
        "LOGOUT" => Ok(Command::Logout),
        "DELETEACC" => match arg.split_whitespace().collect::<Vec<_>>()[..] {
            [password] => Ok(Command::DeleteAcc {
                password: password.to_string(),
            }),
            _ => Err(usage(USAGE_DELETEACC, true)),
        },
        "NEWLIST" => match arg.split_whitespace().collect::<Vec<_>>()[..] {
            [name, code] => Ok(Command::NewList {
                name: name.to_string(),
                code: code.to_string(),
            }),
            _ => Err(usage(USAGE_NEWLIST, true)),
        },
        "JOINLIST" => match arg.trim() {
            "" => Err(usage(USAGE_JOINLIST, true)),
            code => Ok(Command::JoinList {
                code: code.to_string(),
            }),
        },
        "USELIST" => match arg.trim() {
            "" => Err(usage(USAGE_USELIST, true)),
            code => Ok(Command::UseList {
                code: code.to_string(),
            }),
        },
        "MYLISTS" => Ok(Command::MyLists),
        "ADD" => Ok(Command::Add {
            text: arg.trim().trim_matches('"').trim().to_string(),
        }),
        "DONE" => match arg.trim() {
            "" => Err(usage(USAGE_DONE, true)),
            id => Ok(Command::Done { id: id.to_string() }),
        },
        "DELETE" => match arg.trim() {
            "" => Err(usage(USAGE_DELETE, true)),
            id => Ok(Command::Delete { id: id.to_string() }),
        },
        "LIST" => Ok(Command::List),
        _ => Err(ParseError::Unknown),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_is_case_insensitive() {
        assert_eq!(parse("help"), Ok(Command::Help));
        assert_eq!(parse("Help"), Ok(Command::Help));
        assert_eq!(parse("LIST"), Ok(Command::List));
        assert_eq!(parse("list"), Ok(Command::List));
    }

    #[test]
    fn signup_splits_two_fields() {
        assert_eq!(
            parse("SIGNUP alice pw1"),
            Ok(Command::Signup {
                username: "alice".to_string(),
                password: "pw1".to_string(),
            })
        );
    }

    #[test]
    fn signup_wrong_arity_is_usage() {
        for line in ["SIGNUP", "SIGNUP alice", "SIGNUP a b c"] {
            match parse(line) {
                Err(ParseError::Usage {
                    usage,
                    requires_auth,
                }) => {
                    assert_eq!(usage, "Usage: SIGNUP <username> <password>");
                    assert!(!requires_auth);
                }
                other => panic!("expected usage error for {line:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn newlist_wrong_arity_is_authed_usage() {
        match parse("NEWLIST Groceries") {
            Err(ParseError::Usage { requires_auth, .. }) => assert!(requires_auth),
            other => panic!("expected usage error, got {other:?}"),
        }
    }

    #[test]
    fn add_strips_quotes() {
        assert_eq!(
            parse("ADD \"buy milk\""),
            Ok(Command::Add {
                text: "buy milk".to_string(),
            })
        );
        // Quotes are optional.
        assert_eq!(
            parse("ADD buy milk"),
            Ok(Command::Add {
                text: "buy milk".to_string(),
            })
        );
    }

    #[test]
    fn add_with_no_text_parses_empty() {
        assert_eq!(
            parse("ADD \"\""),
            Ok(Command::Add {
                text: String::new(),
            })
        );
        assert_eq!(
            parse("ADD"),
            Ok(Command::Add {
                text: String::new(),
            })
        );
    }

    #[test]
    fn done_requires_an_id() {
        assert_eq!(
            parse("DONE ab12cd34"),
            Ok(Command::Done {
                id: "ab12cd34".to_string(),
            })
        );
        assert!(matches!(parse("DONE"), Err(ParseError::Usage { .. })));
        assert!(matches!(parse("DONE   "), Err(ParseError::Usage { .. })));
    }

    #[test]
    fn unknown_keyword() {
        assert_eq!(parse("FROBNICATE now"), Err(ParseError::Unknown));
        assert_eq!(parse(""), Err(ParseError::Unknown));
        assert_eq!(parse("   "), Err(ParseError::Unknown));
    }

    #[test]
    fn leading_whitespace_is_tolerated() {
        assert_eq!(parse("  LOGOUT  "), Ok(Command::Logout));
    }

    #[test]
    fn auth_gating() {
        assert!(!parse("HELP").unwrap().requires_auth());
        assert!(!parse("SIGNUP a b").unwrap().requires_auth());
        assert!(!parse("LOGIN a b").unwrap().requires_auth());
        assert!(parse("LOGOUT").unwrap().requires_auth());
        assert!(parse("MYLISTS").unwrap().requires_auth());
        assert!(parse("ADD x").unwrap().requires_auth());
    }
}
