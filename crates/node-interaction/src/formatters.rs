//! Conversions between the typed arguments and results of the anvil methods and their JSON-RPC
//! representation.

use alloy::primitives::{Address, Bytes, U256, hex};
use serde_json::{Map, Value};

use crate::{AnvilMethod, Forking, RpcError, ValidBytes};

/// A single positional argument of an anvil method before it's formatted for the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Argument {
    Absent,
    Address(Address),
    Quantity(U256),
    Bytes(ValidBytes),
    Bool(bool),
    Forking(Forking),
    Text(String),
    Json(Value),
}

impl Argument {
    fn kind(&self) -> &'static str {
        match self {
            Self::Absent => "nothing",
            Self::Address(_) => "an address",
            Self::Quantity(_) => "a quantity",
            Self::Bytes(_) => "bytes",
            Self::Bool(_) => "a boolean",
            Self::Forking(_) => "a forking target",
            Self::Text(_) => "a string",
            Self::Json(_) => "a JSON value",
        }
    }
}

impl From<Address> for Argument {
    fn from(value: Address) -> Self {
        Self::Address(value)
    }
}

impl From<U256> for Argument {
    fn from(value: U256) -> Self {
        Self::Quantity(value)
    }
}

impl From<u64> for Argument {
    fn from(value: u64) -> Self {
        Self::Quantity(U256::from(value))
    }
}

impl From<bool> for Argument {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<ValidBytes> for Argument {
    fn from(value: ValidBytes) -> Self {
        Self::Bytes(value)
    }
}

impl From<Forking> for Argument {
    fn from(value: Forking) -> Self {
        Self::Forking(value)
    }
}

impl From<String> for Argument {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Value> for Argument {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl<T: Into<Argument>> From<Option<T>> for Argument {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Absent, Into::into)
    }
}

/// Formats the argument at one position of a method's parameter list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgumentFormatter {
    /// Lowercase `0x` prefixed address.
    Address,
    /// `0x` prefixed hex number without leading zeros.
    Quantity,
    /// `0x` prefixed hex bytes.
    Bytes,
    Bool,
    /// An object with the `json_rpc_url` and `block_number` fields, absent fields are omitted.
    Forking,
    Text,
    Passthrough,
}

impl ArgumentFormatter {
    /// Returns `None` for absent arguments.
    pub fn format(&self, argument: Argument) -> Result<Option<Value>, String> {
        let value = match (self, argument) {
            (_, Argument::Absent) => return Ok(None),
            (Self::Address, Argument::Address(address)) => {
                Value::String(hex::encode_prefixed(address))
            }
            (Self::Quantity, Argument::Quantity(quantity)) => Value::String(to_quantity(quantity)),
            (Self::Bytes, Argument::Bytes(bytes)) => Value::String(bytes.to_hex()?),
            (Self::Bool, Argument::Bool(value)) => Value::Bool(value),
            (Self::Forking, Argument::Forking(forking)) => format_forking(forking),
            (Self::Text, Argument::Text(text)) => Value::String(text),
            (Self::Passthrough, Argument::Json(value)) => value,
            (formatter, argument) => {
                return Err(format!(
                    "expected {}, got {}",
                    formatter.expected(),
                    argument.kind()
                ));
            }
        };
        Ok(Some(value))
    }

    fn expected(&self) -> &'static str {
        match self {
            Self::Address => "an address",
            Self::Quantity => "a quantity",
            Self::Bytes => "bytes",
            Self::Bool => "a boolean",
            Self::Forking => "a forking target",
            Self::Text => "a string",
            Self::Passthrough => "a JSON value",
        }
    }
}

fn to_quantity(quantity: U256) -> String {
    format!("0x{quantity:x}")
}

fn format_forking(forking: Forking) -> Value {
    let mut object = Map::new();
    if let Some(json_rpc_url) = forking.json_rpc_url {
        object.insert("json_rpc_url".into(), Value::String(json_rpc_url));
    }
    if let Some(block_number) = forking.block_number {
        object.insert(
            "block_number".into(),
            Value::String(to_quantity(U256::from(block_number))),
        );
    }
    Value::Object(object)
}

/// Applies `formatters` to `arguments` position by position.
///
/// Missing trailing arguments are treated as absent and absent trailing arguments are dropped from
/// the parameter list. An absent argument that is followed by a present one is sent as `null` to
/// keep the positions intact.
pub fn format_arguments(
    method: AnvilMethod,
    formatters: &[ArgumentFormatter],
    arguments: Vec<Argument>,
) -> Result<Vec<Value>, RpcError> {
    if arguments.len() > formatters.len() {
        return Err(RpcError::Arguments {
            method,
            reason: format!(
                "expected at most {} arguments, got {}",
                formatters.len(),
                arguments.len()
            ),
        });
    }

    let mut params = formatters
        .iter()
        .zip(arguments.into_iter().chain(std::iter::repeat(Argument::Absent)))
        .enumerate()
        .map(|(index, (formatter, argument))| {
            formatter
                .format(argument)
                .map_err(|reason| RpcError::Arguments {
                    method,
                    reason: format!("argument {index}: {reason}"),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    while matches!(params.last(), Some(None)) {
        params.pop();
    }
    Ok(params
        .into_iter()
        .map(|param| param.unwrap_or(Value::Null))
        .collect())
}

/// Decodes the result of a method.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResultFormatter {
    /// The method has no meaningful return value, whatever the node returns is discarded.
    ExpectNull,
    Bool,
    /// `null` when nothing matched, hex bytes otherwise.
    OptionalBytes,
    Bytes,
    Quantity,
    Raw,
}

/// A result decoded by a [`ResultFormatter`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormattedResult {
    Null,
    Bool(bool),
    OptionalBytes(Option<Bytes>),
    Bytes(Bytes),
    Quantity(U256),
    Raw(Value),
}

impl ResultFormatter {
    pub fn format(&self, value: Value) -> Result<FormattedResult, String> {
        match (self, value) {
            (Self::ExpectNull, _) => Ok(FormattedResult::Null),
            (Self::Bool, Value::Bool(value)) => Ok(FormattedResult::Bool(value)),
            (Self::OptionalBytes, Value::Null) => Ok(FormattedResult::OptionalBytes(None)),
            (Self::OptionalBytes, Value::String(string)) => {
                decode_bytes(&string).map(|bytes| FormattedResult::OptionalBytes(Some(bytes)))
            }
            (Self::Bytes, Value::String(string)) => decode_bytes(&string).map(FormattedResult::Bytes),
            (Self::Quantity, Value::String(string)) => {
                decode_quantity(&string).map(FormattedResult::Quantity)
            }
            (Self::Quantity, Value::Number(number)) => number
                .as_u64()
                .map(|number| FormattedResult::Quantity(U256::from(number)))
                .ok_or_else(|| format!("`{number}` is not an unsigned quantity")),
            (Self::Raw, value) => Ok(FormattedResult::Raw(value)),
            (formatter, value) => Err(format!("unexpected result `{value}` for {formatter:?}")),
        }
    }
}

fn decode_bytes(string: &str) -> Result<Bytes, String> {
    hex::decode(string)
        .map(Bytes::from)
        .map_err(|error| format!("`{string}` is not valid hex: {error}"))
}

fn decode_quantity(string: &str) -> Result<U256, String> {
    let digits = string
        .strip_prefix("0x")
        .ok_or_else(|| format!("`{string}` is not a 0x prefixed quantity"))?;
    U256::from_str_radix(digits, 16).map_err(|error| format!("`{string}` is not a quantity: {error}"))
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;
    use serde_json::json;

    use super::*;

    const ACCOUNT: Address = address!("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");

    #[test]
    fn addresses_are_lowercased() {
        let value = ArgumentFormatter::Address.format(ACCOUNT.into());
        assert_eq!(
            value,
            Ok(Some(json!("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48")))
        );
    }

    #[test]
    fn quantities_are_minimal_hex() {
        assert_eq!(
            ArgumentFormatter::Quantity.format(1000u64.into()),
            Ok(Some(json!("0x3e8")))
        );
        assert_eq!(
            ArgumentFormatter::Quantity.format(0u64.into()),
            Ok(Some(json!("0x0")))
        );
        assert_eq!(
            ArgumentFormatter::Quantity.format(U256::MAX.into()),
            Ok(Some(json!(format!("0x{}", "f".repeat(64)))))
        );
    }

    #[test]
    fn raw_bytes_are_hex_encoded_and_hex_strings_pass_through() {
        assert_eq!(
            ArgumentFormatter::Bytes.format(ValidBytes::from(vec![0xde, 0xad]).into()),
            Ok(Some(json!("0xdead")))
        );
        assert_eq!(
            ArgumentFormatter::Bytes.format(ValidBytes::from("0xBEEF").into()),
            Ok(Some(json!("0xBEEF")))
        );
        assert!(
            ArgumentFormatter::Bytes
                .format(ValidBytes::from("beef").into())
                .is_err()
        );
    }

    #[test]
    fn mismatched_arguments_are_rejected() {
        let result = ArgumentFormatter::Address.format(Argument::Bool(true));
        assert_eq!(result, Err("expected an address, got a boolean".to_owned()));
    }

    #[test]
    fn forking_omits_absent_fields() {
        assert_eq!(
            ArgumentFormatter::Forking.format(Forking::at_block(100).into()),
            Ok(Some(json!({ "block_number": "0x64" })))
        );
        assert_eq!(
            ArgumentFormatter::Forking
                .format(Forking::new("https://eth.llamarpc.com").with_block_number(1).into()),
            Ok(Some(json!({
                "json_rpc_url": "https://eth.llamarpc.com",
                "block_number": "0x1"
            })))
        );
        assert_eq!(
            ArgumentFormatter::Forking.format(Forking::default().into()),
            Ok(Some(json!({})))
        );
    }

    #[test]
    fn trailing_absent_arguments_are_dropped_and_inner_ones_are_null() {
        // Arrange
        let formatters = [ArgumentFormatter::Quantity, ArgumentFormatter::Quantity];

        // Act
        let none = format_arguments(AnvilMethod::Mine, &formatters, vec![]);
        let first = format_arguments(AnvilMethod::Mine, &formatters, vec![Argument::from(2u64)]);
        let second = format_arguments(
            AnvilMethod::Mine,
            &formatters,
            vec![Argument::Absent, Argument::from(12u64)],
        );

        // Assert
        assert_eq!(none.expect("Failed to format"), Vec::<Value>::new());
        assert_eq!(first.expect("Failed to format"), vec![json!("0x2")]);
        assert_eq!(
            second.expect("Failed to format"),
            vec![Value::Null, json!("0xc")]
        );
    }

    #[test]
    fn too_many_arguments_are_rejected() {
        let result = format_arguments(
            AnvilMethod::SetChainId,
            &[ArgumentFormatter::Quantity],
            vec![Argument::from(1u64), Argument::from(2u64)],
        );
        assert!(matches!(result, Err(RpcError::Arguments { .. })));
    }

    #[test]
    fn optional_bytes_decode_null_and_hex() {
        assert_eq!(
            ResultFormatter::OptionalBytes.format(Value::Null),
            Ok(FormattedResult::OptionalBytes(None))
        );
        assert_eq!(
            ResultFormatter::OptionalBytes.format(json!("0x0102")),
            Ok(FormattedResult::OptionalBytes(Some(Bytes::from(vec![1, 2]))))
        );
    }

    #[test]
    fn quantities_decode_from_hex_and_numbers() {
        assert_eq!(
            ResultFormatter::Quantity.format(json!("0x1f")),
            Ok(FormattedResult::Quantity(U256::from(31)))
        );
        assert_eq!(
            ResultFormatter::Quantity.format(json!(7)),
            Ok(FormattedResult::Quantity(U256::from(7)))
        );
        assert!(ResultFormatter::Quantity.format(json!("31")).is_err());
    }

    #[test]
    fn expect_null_discards_the_result() {
        assert_eq!(
            ResultFormatter::ExpectNull.format(json!(true)),
            Ok(FormattedResult::Null)
        );
    }

    #[test]
    fn unexpected_results_are_errors() {
        assert!(ResultFormatter::Bool.format(json!("0x1")).is_err());
    }
}
