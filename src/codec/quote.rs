//! Descriptor-driven mapping between [`Quote`] and the LBC call struct.
//!
//! Every field of the on-chain struct is described once in [`QUOTE_LAYOUT`]
//! (name, ABI head offset, value width, encoder, decoder). Both the hashing
//! path and the call-submission path go through [`encode_quote`], so a field
//! is validated in exactly one place.

use alloy::hex;
use alloy::primitives::{keccak256, Address, Bytes, FixedBytes, B256, U256};
use alloy::sol_types::SolValue;
use bitcoin::Network;

use crate::blockchain::contracts::OnChainQuote;
use crate::codec::address::{
    btc_address_hash160, decode_btc_address, decode_evm_address, encode_btc_address,
    parse_hex_payload,
};
use crate::codec::{CodecError, CodecResult};
use crate::quoting::types::Quote;

/// Size of one ABI head word.
pub const WORD_SIZE: usize = 32;

/// Shape of a field inside the ABI encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// `bytes20`, left-aligned in its word.
    Bytes20,
    /// `address`, right-aligned in its word.
    Address,
    /// Dynamic `bytes`; the head word holds the tail offset.
    Bytes,
    /// `uint256`.
    Uint256,
}

impl SlotKind {
    /// Number of value bytes held in the head word, `None` for dynamic fields.
    pub const fn width(self) -> Option<usize> {
        match self {
            SlotKind::Bytes20 | SlotKind::Address => Some(20),
            SlotKind::Uint256 => Some(WORD_SIZE),
            SlotKind::Bytes => None,
        }
    }
}

/// A single encoded field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotValue {
    Bytes20(FixedBytes<20>),
    Address(Address),
    Bytes(Bytes),
    Uint(U256),
}

impl SlotValue {
    fn kind(&self) -> SlotKind {
        match self {
            SlotValue::Bytes20(_) => SlotKind::Bytes20,
            SlotValue::Address(_) => SlotKind::Address,
            SlotValue::Bytes(_) => SlotKind::Bytes,
            SlotValue::Uint(_) => SlotKind::Uint256,
        }
    }
}

/// Descriptor for one field of the on-chain quote.
pub struct FieldSlot {
    /// Solidity field name.
    pub name: &'static str,
    /// Byte offset of the field's head word in the ABI encoding.
    pub offset: usize,
    pub kind: SlotKind,
    encode: fn(&Quote) -> CodecResult<SlotValue>,
    decode: fn(&OnChainQuote, &mut Quote, Network) -> CodecResult<()>,
}

impl FieldSlot {
    /// Value width in bytes, `None` for dynamic fields.
    pub fn width(&self) -> Option<usize> {
        self.kind.width()
    }
}

impl std::fmt::Debug for FieldSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldSlot")
            .field("name", &self.name)
            .field("offset", &self.offset)
            .field("kind", &self.kind)
            .finish()
    }
}

const fn head(index: usize) -> usize {
    index * WORD_SIZE
}

/// Field table of `LiquidityBridgeContract.Quote`, in declaration order.
pub static QUOTE_LAYOUT: [FieldSlot; 17] = [
    FieldSlot {
        name: "fedBtcAddress",
        offset: head(0),
        kind: SlotKind::Bytes20,
        encode: |q| Ok(SlotValue::Bytes20(FixedBytes::from(btc_address_hash160(&q.fed_btc_addr)?))),
        decode: |raw, q, network| {
            q.fed_btc_addr = encode_btc_address(p2sh_version(network), raw.fedBtcAddress.as_slice());
            Ok(())
        },
    },
    FieldSlot {
        name: "lbcAddress",
        offset: head(1),
        kind: SlotKind::Address,
        encode: |q| Ok(SlotValue::Address(decode_evm_address(&q.lbc_addr)?)),
        decode: |raw, q, _| {
            q.lbc_addr = raw.lbcAddress.to_string();
            Ok(())
        },
    },
    FieldSlot {
        name: "liquidityProviderRskAddress",
        offset: head(2),
        kind: SlotKind::Address,
        encode: |q| Ok(SlotValue::Address(decode_evm_address(&q.lp_rsk_addr)?)),
        decode: |raw, q, _| {
            q.lp_rsk_addr = raw.liquidityProviderRskAddress.to_string();
            Ok(())
        },
    },
    FieldSlot {
        name: "btcRefundAddress",
        offset: head(3),
        kind: SlotKind::Bytes,
        encode: |q| Ok(SlotValue::Bytes(decode_btc_address(&q.btc_refund_addr)?.into())),
        decode: |raw, q, _| {
            q.btc_refund_addr = versioned_btc_address(&raw.btcRefundAddress)?;
            Ok(())
        },
    },
    FieldSlot {
        name: "rskRefundAddress",
        offset: head(4),
        kind: SlotKind::Address,
        encode: |q| Ok(SlotValue::Address(decode_evm_address(&q.rsk_refund_addr)?)),
        decode: |raw, q, _| {
            q.rsk_refund_addr = raw.rskRefundAddress.to_string();
            Ok(())
        },
    },
    FieldSlot {
        name: "liquidityProviderBtcAddress",
        offset: head(5),
        kind: SlotKind::Bytes,
        encode: |q| Ok(SlotValue::Bytes(decode_btc_address(&q.lp_btc_addr)?.into())),
        decode: |raw, q, _| {
            q.lp_btc_addr = versioned_btc_address(&raw.liquidityProviderBtcAddress)?;
            Ok(())
        },
    },
    FieldSlot {
        name: "callFee",
        offset: head(6),
        kind: SlotKind::Uint256,
        encode: |q| Ok(SlotValue::Uint(q.call_fee)),
        decode: |raw, q, _| {
            q.call_fee = raw.callFee;
            Ok(())
        },
    },
    FieldSlot {
        name: "penaltyFee",
        offset: head(7),
        kind: SlotKind::Uint256,
        encode: |q| Ok(SlotValue::Uint(q.penalty_fee)),
        decode: |raw, q, _| {
            q.penalty_fee = raw.penaltyFee;
            Ok(())
        },
    },
    FieldSlot {
        name: "contractAddress",
        offset: head(8),
        kind: SlotKind::Address,
        encode: |q| Ok(SlotValue::Address(decode_evm_address(&q.contract_addr)?)),
        decode: |raw, q, _| {
            q.contract_addr = raw.contractAddress.to_string();
            Ok(())
        },
    },
    FieldSlot {
        name: "data",
        offset: head(9),
        kind: SlotKind::Bytes,
        encode: |q| Ok(SlotValue::Bytes(parse_hex_payload(&q.data)?.into())),
        decode: |raw, q, _| {
            q.data = hex::encode(&raw.data);
            Ok(())
        },
    },
    FieldSlot {
        name: "gasLimit",
        offset: head(10),
        kind: SlotKind::Uint256,
        encode: |q| Ok(SlotValue::Uint(U256::from(q.gas_limit))),
        decode: |raw, q, _| {
            q.gas_limit = narrow(raw.gasLimit, "gasLimit")?;
            Ok(())
        },
    },
    FieldSlot {
        name: "nonce",
        offset: head(11),
        kind: SlotKind::Uint256,
        encode: |q| Ok(SlotValue::Uint(U256::from(q.nonce))),
        decode: |raw, q, _| {
            q.nonce = narrow(raw.nonce, "nonce")?;
            Ok(())
        },
    },
    FieldSlot {
        name: "value",
        offset: head(12),
        kind: SlotKind::Uint256,
        encode: |q| Ok(SlotValue::Uint(q.value)),
        decode: |raw, q, _| {
            q.value = raw.value;
            Ok(())
        },
    },
    FieldSlot {
        name: "agreementTimestamp",
        offset: head(13),
        kind: SlotKind::Uint256,
        encode: |q| Ok(SlotValue::Uint(U256::from(q.agreement_timestamp))),
        decode: |raw, q, _| {
            q.agreement_timestamp = narrow(raw.agreementTimestamp, "agreementTimestamp")?;
            Ok(())
        },
    },
    FieldSlot {
        name: "timeForDeposit",
        offset: head(14),
        kind: SlotKind::Uint256,
        encode: |q| Ok(SlotValue::Uint(U256::from(q.time_for_deposit))),
        decode: |raw, q, _| {
            q.time_for_deposit = narrow(raw.timeForDeposit, "timeForDeposit")?;
            Ok(())
        },
    },
    FieldSlot {
        name: "callTime",
        offset: head(15),
        kind: SlotKind::Uint256,
        encode: |q| Ok(SlotValue::Uint(U256::from(q.call_time))),
        decode: |raw, q, _| {
            q.call_time = narrow(raw.callTime, "callTime")?;
            Ok(())
        },
    },
    FieldSlot {
        name: "depositConfirmations",
        offset: head(16),
        kind: SlotKind::Uint256,
        encode: |q| Ok(SlotValue::Uint(U256::from(q.confirmations))),
        decode: |raw, q, _| {
            q.confirmations = narrow(raw.depositConfirmations, "depositConfirmations")?;
            Ok(())
        },
    },
];

/// Encode a quote into the LBC call struct.
///
/// Fails on the first malformed field; no partial struct is ever returned.
pub fn encode_quote(quote: &Quote) -> CodecResult<OnChainQuote> {
    let mut values = Vec::with_capacity(QUOTE_LAYOUT.len());
    for slot in QUOTE_LAYOUT.iter() {
        let value = (slot.encode)(quote).map_err(|e| CodecError::Field {
            field: slot.name,
            source: Box::new(e),
        })?;
        if value.kind() != slot.kind {
            return Err(CodecError::Layout(slot.name));
        }
        values.push(value);
    }

    let mut cursor = SlotCursor {
        values: values.into_iter(),
        slots: QUOTE_LAYOUT.iter(),
    };

    Ok(OnChainQuote {
        fedBtcAddress: cursor.bytes20()?,
        lbcAddress: cursor.address()?,
        liquidityProviderRskAddress: cursor.address()?,
        btcRefundAddress: cursor.bytes()?,
        rskRefundAddress: cursor.address()?,
        liquidityProviderBtcAddress: cursor.bytes()?,
        callFee: cursor.uint()?,
        penaltyFee: cursor.uint()?,
        contractAddress: cursor.address()?,
        data: cursor.bytes()?,
        gasLimit: cursor.uint()?,
        nonce: cursor.uint()?,
        value: cursor.uint()?,
        agreementTimestamp: cursor.uint()?,
        timeForDeposit: cursor.uint()?,
        callTime: cursor.uint()?,
        depositConfirmations: cursor.uint()?,
    })
}

/// Map an LBC call struct back to the display-form quote.
///
/// `network` picks the P2SH version byte for the federation address, which is
/// carried on-chain without one.
pub fn decode_quote(raw: &OnChainQuote, network: Network) -> CodecResult<Quote> {
    let mut quote = Quote::default();
    for slot in QUOTE_LAYOUT.iter() {
        (slot.decode)(raw, &mut quote, network).map_err(|e| CodecError::Field {
            field: slot.name,
            source: Box::new(e),
        })?;
    }
    Ok(quote)
}

/// Keccak-256 over the ABI encoding of the quote fields, as `hashQuote` computes it.
pub fn local_quote_hash(raw: &OnChainQuote) -> B256 {
    keccak256(raw.abi_encode_params())
}

struct SlotCursor {
    values: std::vec::IntoIter<SlotValue>,
    slots: std::slice::Iter<'static, FieldSlot>,
}

impl SlotCursor {
    fn next(&mut self) -> CodecResult<(SlotValue, &'static FieldSlot)> {
        match (self.values.next(), self.slots.next()) {
            (Some(value), Some(slot)) => Ok((value, slot)),
            _ => Err(CodecError::Layout("end of layout")),
        }
    }

    fn bytes20(&mut self) -> CodecResult<FixedBytes<20>> {
        match self.next()? {
            (SlotValue::Bytes20(v), _) => Ok(v),
            (_, slot) => Err(CodecError::Layout(slot.name)),
        }
    }

    fn address(&mut self) -> CodecResult<Address> {
        match self.next()? {
            (SlotValue::Address(v), _) => Ok(v),
            (_, slot) => Err(CodecError::Layout(slot.name)),
        }
    }

    fn bytes(&mut self) -> CodecResult<Bytes> {
        match self.next()? {
            (SlotValue::Bytes(v), _) => Ok(v),
            (_, slot) => Err(CodecError::Layout(slot.name)),
        }
    }

    fn uint(&mut self) -> CodecResult<U256> {
        match self.next()? {
            (SlotValue::Uint(v), _) => Ok(v),
            (_, slot) => Err(CodecError::Layout(slot.name)),
        }
    }
}

fn versioned_btc_address(bytes: &[u8]) -> CodecResult<String> {
    match bytes.split_first() {
        Some((version, payload)) => Ok(encode_btc_address(*version, payload)),
        None => Err(CodecError::invalid_address("", "empty bitcoin address")),
    }
}

fn narrow(value: U256, field: &'static str) -> CodecResult<u64> {
    u64::try_from(value).map_err(|_| CodecError::Layout(field))
}

/// Base58 version byte of P2SH addresses on `network`.
pub fn p2sh_version(network: Network) -> u8 {
    match network {
        Network::Bitcoin => 0x05,
        _ => 0xc4,
    }
}
