use std::{fmt::Display, ops::Deref};

use crate::OptionValue;

/// The ordered flag and value tokens that a node process is started with.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandLine(Vec<String>);

impl CommandLine {
    /// Builds the command line from `(flag, value)` pairs, keeping their order. `--flag` is
    /// emitted for [`OptionValue::Flag`], `--flag value` for [`OptionValue::Value`] and nothing for
    /// unset options.
    pub fn from_options<'a>(
        options: impl IntoIterator<Item = (&'a str, Option<OptionValue>)>,
    ) -> Self {
        let mut tokens = Vec::new();
        for (flag, value) in options {
            match value {
                None => {}
                Some(OptionValue::Flag) => tokens.push(format!("--{flag}")),
                Some(OptionValue::Value(value)) => {
                    tokens.push(format!("--{flag}"));
                    tokens.push(value);
                }
            }
        }
        Self(tokens)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

impl Deref for CommandLine {
    type Target = [String];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'a> IntoIterator for &'a CommandLine {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Display for CommandLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_options_leave_no_trace() {
        // Act
        let command_line = CommandLine::from_options([
            ("silent", None),
            ("port", Some(OptionValue::Value("8545".into()))),
            ("no-cors", Some(OptionValue::Flag)),
            ("fork-url", None),
        ]);

        // Assert
        assert_eq!(command_line.to_string(), "--port 8545 --no-cors");
    }

    #[test]
    fn values_are_kept_verbatim() {
        let command_line = CommandLine::from_options([(
            "mnemonic",
            Some(OptionValue::Value("test test junk".into())),
        )]);
        assert_eq!(command_line.as_slice(), ["--mnemonic", "test test junk"]);
    }
}
