//! Event signature parsing and log decoding.

use std::collections::HashMap;

use alloy::dyn_abi::{DynSolType, DynSolValue};
use alloy::primitives::{keccak256, Address, B256, U256};
use thiserror::Error;

use super::DecodedValue;

#[derive(Debug, Error)]
pub enum EventParseError {
    #[error("Invalid event signature: {0}")]
    InvalidSignature(String),

    #[error("Failed to parse type '{0}': {1}")]
    TypeParse(String, String),

    #[error("Missing topic {0}")]
    MissingTopic(usize),

    #[error("Failed to decode data: {0}")]
    DataDecode(String),

    #[error("Unsupported value in parameter '{0}'")]
    UnsupportedValue(String),
}

/// Parsed event parameter
#[derive(Debug, Clone)]
pub struct EventParam {
    pub name: String,
    pub param_type: DynSolType,
    pub type_string: String,
    pub indexed: bool,
}

/// Parsed event definition
#[derive(Debug, Clone)]
pub struct ParsedEvent {
    pub name: String,
    pub canonical_signature: String,
    pub topic0: B256,
    pub params: Vec<EventParam>,
}

impl ParsedEvent {
    /// Parse a full ABI signature like
    /// "Transfer(address indexed from, address indexed to, uint256 amount)".
    pub fn from_signature(signature: &str) -> Result<Self, EventParseError> {
        let signature = signature.trim();

        let open_paren = signature
            .find('(')
            .ok_or_else(|| EventParseError::InvalidSignature(signature.to_string()))?;

        let name = signature[..open_paren].trim().to_string();
        if name.is_empty() {
            return Err(EventParseError::InvalidSignature(
                "Empty event name".to_string(),
            ));
        }

        let close_paren = signature
            .rfind(')')
            .ok_or_else(|| EventParseError::InvalidSignature(signature.to_string()))?;
        let params_str = &signature[open_paren + 1..close_paren];

        let params = parse_params(params_str)?;

        // Canonical signature is types only, no names, no "indexed"
        let type_strings: Vec<&str> = params.iter().map(|p| p.type_string.as_str()).collect();
        let canonical_signature = format!("{}({})", name, type_strings.join(","));
        let topic0 = keccak256(canonical_signature.as_bytes());

        Ok(ParsedEvent {
            name,
            canonical_signature,
            topic0,
            params,
        })
    }

    pub fn indexed_params(&self) -> impl Iterator<Item = &EventParam> {
        self.params.iter().filter(|p| p.indexed)
    }

    pub fn data_params(&self) -> impl Iterator<Item = &EventParam> {
        self.params.iter().filter(|p| !p.indexed)
    }

    /// Decode a matched log's topics and data into named values.
    pub fn decode(
        &self,
        topics: &[B256],
        data: &[u8],
    ) -> Result<HashMap<String, DecodedValue>, EventParseError> {
        let mut values = HashMap::new();

        for (i, param) in self.indexed_params().enumerate() {
            let topic = topics
                .get(i + 1)
                .ok_or(EventParseError::MissingTopic(i + 1))?;
            values.insert(param.name.clone(), decode_topic(topic, &param.param_type));
        }

        let data_params: Vec<&EventParam> = self.data_params().collect();
        if !data_params.is_empty() {
            let tuple_type =
                DynSolType::Tuple(data_params.iter().map(|p| p.param_type.clone()).collect());

            let decoded = tuple_type
                .abi_decode_params(data)
                .map_err(|e| EventParseError::DataDecode(e.to_string()))?;

            let elements = match decoded {
                DynSolValue::Tuple(elements) => elements,
                other => vec![other],
            };

            for (value, param) in elements.iter().zip(data_params.iter()) {
                values.insert(param.name.clone(), convert_value(value, &param.name)?);
            }
        }

        Ok(values)
    }
}

fn decode_topic(topic: &B256, param_type: &DynSolType) -> DecodedValue {
    match param_type {
        DynSolType::Address => DecodedValue::Address(Address::from_slice(&topic[12..32])),
        DynSolType::Bool => DecodedValue::Bool(topic[31] != 0),
        // Uints, and the hash placeholder for anything indexed-dynamic
        _ => DecodedValue::Uint256(U256::from_be_bytes(topic.0)),
    }
}

fn convert_value(value: &DynSolValue, name: &str) -> Result<DecodedValue, EventParseError> {
    match value {
        DynSolValue::Address(a) => Ok(DecodedValue::Address(*a)),
        DynSolValue::Uint(v, _) => Ok(DecodedValue::Uint256(*v)),
        DynSolValue::Bool(b) => Ok(DecodedValue::Bool(*b)),
        DynSolValue::String(s) => Ok(DecodedValue::String(s.clone())),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) => Ok(DecodedValue::Array(
            items
                .iter()
                .map(|item| convert_value(item, name))
                .collect::<Result<_, _>>()?,
        )),
        _ => Err(EventParseError::UnsupportedValue(name.to_string())),
    }
}

/// Parse the parameter list from an event signature
fn parse_params(params_str: &str) -> Result<Vec<EventParam>, EventParseError> {
    let params_str = params_str.trim();
    if params_str.is_empty() {
        return Ok(Vec::new());
    }

    params_str
        .split(',')
        .map(|p| parse_single_param(p.trim()))
        .collect()
}

/// Parse a single parameter like "address indexed from" or "uint256 value"
fn parse_single_param(param_str: &str) -> Result<EventParam, EventParseError> {
    let parts: Vec<&str> = param_str.split_whitespace().collect();

    let (type_string, indexed, name) = match parts.as_slice() {
        [ty] => (ty.to_string(), false, String::new()),
        [ty, "indexed"] => (ty.to_string(), true, String::new()),
        [ty, name] => (ty.to_string(), false, name.to_string()),
        [ty, "indexed", name] => (ty.to_string(), true, name.to_string()),
        _ => {
            return Err(EventParseError::InvalidSignature(format!(
                "Invalid parameter format: {}",
                param_str
            )))
        }
    };

    let param_type = DynSolType::parse(&type_string)
        .map_err(|e| EventParseError::TypeParse(type_string.clone(), e.to_string()))?;

    Ok(EventParam {
        name,
        param_type,
        type_string,
        indexed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_signature_strips_names_and_indexed() {
        let event = ParsedEvent::from_signature(
            "Transfer(address indexed from, address indexed to, uint256 amount)",
        )
        .unwrap();
        assert_eq!(event.name, "Transfer");
        assert_eq!(event.canonical_signature, "Transfer(address,address,uint256)");
        // Well-known ERC-20 Transfer topic
        assert_eq!(
            format!("{:#x}", event.topic0),
            "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
    }

    #[test]
    fn test_decode_indexed_and_data() {
        let event = ParsedEvent::from_signature(
            "Transfer(address indexed from, address indexed to, uint256 amount)",
        )
        .unwrap();

        let from = Address::repeat_byte(0x01);
        let to = Address::repeat_byte(0x02);
        let amount = U256::from(146205398726345u64);

        let topics = vec![
            event.topic0,
            B256::left_padding_from(from.as_slice()),
            B256::left_padding_from(to.as_slice()),
        ];
        let data = DynSolValue::Tuple(vec![DynSolValue::Uint(amount, 256)]).abi_encode_params();

        let values = event.decode(&topics, &data).unwrap();
        assert_eq!(values.get("from"), Some(&DecodedValue::Address(from)));
        assert_eq!(values.get("to"), Some(&DecodedValue::Address(to)));
        assert_eq!(values.get("amount"), Some(&DecodedValue::Uint256(amount)));
    }

    #[test]
    fn test_decode_dynamic_arrays() {
        let event = ParsedEvent::from_signature(
            "AuctionStarted(address indexed comptroller, uint256 auctionStartBlock, uint8 auctionType, address[] markets, uint256[] marketsDebt, uint256 seizedRiskFund, uint256 startBidBps)",
        )
        .unwrap();

        let comptroller = Address::repeat_byte(0x0c);
        let market = Address::repeat_byte(0xaa);
        let topics = vec![event.topic0, B256::left_padding_from(comptroller.as_slice())];
        let data = DynSolValue::Tuple(vec![
            DynSolValue::Uint(U256::from(100u64), 256),
            DynSolValue::Uint(U256::from(1u64), 8),
            DynSolValue::Array(vec![DynSolValue::Address(market)]),
            DynSolValue::Array(vec![DynSolValue::Uint(U256::from(700u64), 256)]),
            DynSolValue::Uint(U256::from(55u64), 256),
            DynSolValue::Uint(U256::from(1000u64), 256),
        ])
        .abi_encode_params();

        let values = event.decode(&topics, &data).unwrap();
        assert_eq!(
            values.get("comptroller"),
            Some(&DecodedValue::Address(comptroller))
        );
        assert_eq!(
            values.get("markets").and_then(|v| v.as_array()).map(|a| a.len()),
            Some(1)
        );
        assert_eq!(
            values.get("marketsDebt"),
            Some(&DecodedValue::Array(vec![DecodedValue::Uint256(
                U256::from(700u64)
            )]))
        );
    }

    #[test]
    fn test_missing_topic_is_an_error() {
        let event =
            ParsedEvent::from_signature("Transfer(address indexed from, address indexed to, uint256 amount)")
                .unwrap();
        let result = event.decode(&[event.topic0], &[]);
        assert!(matches!(result, Err(EventParseError::MissingTopic(1))));
    }
}
