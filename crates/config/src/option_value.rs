use std::{fmt::Display, path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};

/// How a set option shows up on the command line of the node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OptionValue {
    /// A bare `--flag`.
    Flag,
    /// A `--flag value` pair.
    Value(String),
}

/// Converts a configuration field into its command line representation. `None` means that the
/// option is unset and nothing is emitted for it.
pub trait ToOptionValue {
    fn to_option_value(&self) -> Option<OptionValue>;
}

/// A scalar that is passed as the value of a `--flag value` pair.
pub trait OptionArgument {
    fn to_argument(&self) -> OptionValue;
}

impl ToOptionValue for bool {
    fn to_option_value(&self) -> Option<OptionValue> {
        self.then_some(OptionValue::Flag)
    }
}

impl<T: OptionArgument> ToOptionValue for Option<T> {
    fn to_option_value(&self) -> Option<OptionValue> {
        self.as_ref().map(OptionArgument::to_argument)
    }
}

macro_rules! impl_display_argument {
    ($($ty: ty),* $(,)?) => {
        $(
            impl OptionArgument for $ty {
                fn to_argument(&self) -> OptionValue {
                    OptionValue::Value(self.to_string())
                }
            }
        )*
    };
}

impl_display_argument!(String, u16, u32, u64, u128);

impl OptionArgument for PathBuf {
    fn to_argument(&self) -> OptionValue {
        OptionValue::Value(self.display().to_string())
    }
}

/// The value of the `--prune-history` option. The node either prunes all of its history or keeps
/// the given number of states in memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PruneHistory {
    Enabled(bool),
    Keep(u64),
}

impl ToOptionValue for Option<PruneHistory> {
    fn to_option_value(&self) -> Option<OptionValue> {
        match self {
            None | Some(PruneHistory::Enabled(false)) => None,
            Some(PruneHistory::Enabled(true)) => Some(OptionValue::Flag),
            Some(PruneHistory::Keep(states)) => Some(OptionValue::Value(states.to_string())),
        }
    }
}

impl FromStr for PruneHistory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "true" => Ok(Self::Enabled(true)),
            "false" => Ok(Self::Enabled(false)),
            _ => s
                .parse()
                .map(Self::Keep)
                .map_err(|_| format!("expected `true`, `false` or a number of states, got `{s}`")),
        }
    }
}

impl Display for PruneHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Enabled(enabled) => Display::fmt(enabled, f),
            Self::Keep(states) => Display::fmt(states, f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booleans_map_to_bare_flags_only_when_set() {
        assert_eq!(true.to_option_value(), Some(OptionValue::Flag));
        assert_eq!(false.to_option_value(), None);
    }

    #[test]
    fn prune_history_parses_flags_and_counts() {
        assert_eq!("true".parse(), Ok(PruneHistory::Enabled(true)));
        assert_eq!("".parse(), Ok(PruneHistory::Enabled(true)));
        assert_eq!("false".parse(), Ok(PruneHistory::Enabled(false)));
        assert_eq!("42".parse(), Ok(PruneHistory::Keep(42)));
        assert!("many".parse::<PruneHistory>().is_err());
    }

    #[test]
    fn disabled_prune_history_is_omitted() {
        assert_eq!(Some(PruneHistory::Enabled(false)).to_option_value(), None);
        assert_eq!(
            Some(PruneHistory::Enabled(true)).to_option_value(),
            Some(OptionValue::Flag)
        );
        assert_eq!(
            Some(PruneHistory::Keep(8)).to_option_value(),
            Some(OptionValue::Value("8".into()))
        );
    }
}
