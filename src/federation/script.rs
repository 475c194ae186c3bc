//! Redeem scripts for the federation's custody outputs.

use bitcoin::opcodes::all::{
    OP_CHECKMULTISIG, OP_CSV, OP_DROP, OP_ELSE, OP_ENDIF, OP_NOTIF,
};
use bitcoin::script::{Builder, PushBytesBuf};
use bitcoin::ScriptBuf;

use crate::federation::{FederationError, FederationInfo, FederationResult, FederatorKey};

/// Push `OP_M <keys...> OP_N` without the trailing `OP_CHECKMULTISIG`.
fn push_multisig_body(
    mut builder: Builder,
    threshold: usize,
    keys: &[FederatorKey],
) -> FederationResult<Builder> {
    builder = builder.push_int(threshold as i64);
    for key in keys {
        builder = builder.push_key(&key.to_public_key()?);
    }
    Ok(builder.push_int(keys.len() as i64))
}

/// `OP_M <pk_1> .. <pk_N> OP_N OP_CHECKMULTISIG`
pub fn standard_redeem_script(info: &FederationInfo) -> FederationResult<ScriptBuf> {
    let builder = push_multisig_body(Builder::new(), info.threshold, &info.pub_keys)?;
    Ok(builder.push_opcode(OP_CHECKMULTISIG).into_script())
}

/// Two-branch script: the regular federation, or after `erp_csv_value`
/// blocks a majority of the emergency keys.
pub fn erp_redeem_script(info: &FederationInfo) -> FederationResult<ScriptBuf> {
    let mut builder = Builder::new().push_opcode(OP_NOTIF);
    builder = push_multisig_body(builder, info.threshold, &info.pub_keys)?;
    builder = builder
        .push_opcode(OP_ELSE)
        .push_int(i64::from(info.erp_csv_value))
        .push_opcode(OP_CSV)
        .push_opcode(OP_DROP);
    builder = push_multisig_body(builder, info.erp_threshold(), &info.erp_keys)?;
    Ok(builder
        .push_opcode(OP_ENDIF)
        .push_opcode(OP_CHECKMULTISIG)
        .into_script())
}

/// Redeem script of the active federation, validated first.
pub fn federation_redeem_script(info: &FederationInfo) -> FederationResult<ScriptBuf> {
    info.validate()?;
    if info.uses_erp_script() {
        erp_redeem_script(info)
    } else {
        standard_redeem_script(info)
    }
}

/// `<derivation> OP_DROP <redeem script>`
pub fn flyover_redeem_script(derivation: &[u8; 32], redeem: &ScriptBuf) -> FederationResult<ScriptBuf> {
    let push = PushBytesBuf::try_from(derivation.to_vec())
        .map_err(|e| FederationError::AddressEncodingFailure(e.to_string()))?;
    let prefix = Builder::new().push_slice(push).push_opcode(OP_DROP).into_script();

    let mut bytes = prefix.into_bytes();
    bytes.extend_from_slice(redeem.as_bytes());
    Ok(ScriptBuf::from_bytes(bytes))
}
