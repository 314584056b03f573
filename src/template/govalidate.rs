//! A minimal, hand-rolled structural validator for rendered Go source.
//!
//! No crate in this workspace's dependency graph parses Go syntax —
//! the ecosystem's AST tooling for Go (`tree-sitter-go`, `go/parser`)
//! lives outside the Rust crate registry's reach for this purpose, and
//! fabricating a stand-in would violate the point of depending on it
//! at all. This check is deliberately narrow: it is not a Go parser,
//! it is a fast structural smoke test that catches the overwhelming
//! majority of template-authoring mistakes (an unbalanced brace from a
//! missing `{{end}}`, an unterminated string from a stray quote, a
//! forgotten `package` clause) before they reach disk. A blueprint
//! author who passes this check but writes semantically invalid Go
//! will still fail `go build` downstream — that is expected and out of
//! this engine's contract, which only promises syntactic validity.
//!
//! See DESIGN.md for the record of this decision.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoSyntaxError {
    pub message: String,
}

impl std::fmt::Display for GoSyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Runs the structural checks. `Ok(())` does not mean the file
/// compiles — only that it is not obviously broken.
pub fn validate(source: &str) -> Result<(), GoSyntaxError> {
    check_package_clause(source)?;
    check_balanced_and_terminated(source)?;
    Ok(())
}

fn check_package_clause(source: &str) -> Result<(), GoSyntaxError> {
    let has_package = source
        .lines()
        .map(str::trim_start)
        .filter(|line| !line.is_empty() && !line.starts_with("//"))
        .find(|line| !line.is_empty());

    match has_package {
        Some(first) if first.starts_with("package ") || first == "package" => Ok(()),
        _ => Err(GoSyntaxError {
            message: "file does not begin with a package clause".to_string(),
        }),
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Code,
    LineComment,
    BlockComment,
    StringDouble,
    StringBacktick,
    Rune,
}

fn check_balanced_and_terminated(source: &str) -> Result<(), GoSyntaxError> {
    let mut braces = 0i32;
    let mut parens = 0i32;
    let mut brackets = 0i32;
    let mut mode = Mode::Code;
    let mut chars = source.chars().peekable();
    let mut escaped = false;

    while let Some(c) = chars.next() {
        match mode {
            Mode::LineComment => {
                if c == '\n' {
                    mode = Mode::Code;
                }
            }
            Mode::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    mode = Mode::Code;
                }
            }
            Mode::StringDouble => {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == '"' {
                    mode = Mode::Code;
                } else if c == '\n' {
                    return Err(GoSyntaxError {
                        message: "unterminated string literal".to_string(),
                    });
                }
            }
            Mode::Rune => {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == '\'' {
                    mode = Mode::Code;
                } else if c == '\n' {
                    return Err(GoSyntaxError {
                        message: "unterminated rune literal".to_string(),
                    });
                }
            }
            Mode::StringBacktick => {
                if c == '`' {
                    mode = Mode::Code;
                }
            }
            Mode::Code => match c {
                '/' if chars.peek() == Some(&'/') => {
                    chars.next();
                    mode = Mode::LineComment;
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    mode = Mode::BlockComment;
                }
                '"' => mode = Mode::StringDouble,
                '`' => mode = Mode::StringBacktick,
                '\'' => mode = Mode::Rune,
                '{' => braces += 1,
                '}' => braces -= 1,
                '(' => parens += 1,
                ')' => parens -= 1,
                '[' => brackets += 1,
                ']' => brackets -= 1,
                _ => {}
            },
        }

        if braces < 0 || parens < 0 || brackets < 0 {
            return Err(GoSyntaxError {
                message: "unbalanced closing delimiter".to_string(),
            });
        }
    }

    if mode == Mode::StringDouble || mode == Mode::Rune {
        return Err(GoSyntaxError {
            message: "unterminated string or rune literal at end of file".to_string(),
        });
    }
    if mode == Mode::StringBacktick {
        return Err(GoSyntaxError {
            message: "unterminated raw string literal at end of file".to_string(),
        });
    }
    if braces != 0 {
        return Err(GoSyntaxError {
            message: format!("unbalanced braces (off by {braces})"),
        });
    }
    if parens != 0 {
        return Err(GoSyntaxError {
            message: format!("unbalanced parentheses (off by {parens})"),
        });
    }
    if brackets != 0 {
        return Err(GoSyntaxError {
            message: format!("unbalanced brackets (off by {brackets})"),
        });
    }

    Ok(())
}
