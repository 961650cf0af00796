//! ABI word-layout encoding and decoding
//!
//! Implements the standard contract ABI rules for the types in
//! [`TypeTag`]: 32-byte words, integers and addresses left-padded, fixed
//! byte strings left-aligned, and dynamic types (`bytes`, `string`, `T[]`)
//! head/tail encoded with byte offsets relative to the enclosing block.
//!
//! Decoding is strict: truncated words, out-of-range offsets, dirty bool
//! words, and empty return data against a non-empty return-type list all
//! fail with [`ContractError::Decode`] rather than yielding zero-valued
//! defaults.

use crate::{AbiValue, ContractError, Function, TypeTag};
use alloy_primitives::{Address, I256, U256};

const WORD: usize = 32;

/// Encodes a full call: 4-byte selector followed by the encoded parameters.
pub fn encode_call(function: &Function, params: &[AbiValue]) -> Result<Vec<u8>, ContractError> {
    if params.len() != function.inputs.len() {
        return Err(ContractError::Encode(format!(
            "{} takes {} parameters, got {}",
            function.signature(),
            function.inputs.len(),
            params.len()
        )));
    }
    let mut data = function.selector().to_vec();
    data.extend(encode_values(&function.inputs, params)?);
    Ok(data)
}

/// Encodes a positional value sequence as one ABI block (head words followed
/// by the dynamic tails).
pub fn encode_values(types: &[TypeTag], values: &[AbiValue]) -> Result<Vec<u8>, ContractError> {
    if types.len() != values.len() {
        return Err(ContractError::Encode(format!(
            "expected {} values, got {}",
            types.len(),
            values.len()
        )));
    }

    // Every head slot is one word for the types we support, so tail offsets
    // are known up front.
    let head_len = types.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for (ty, value) in types.iter().zip(values) {
        if !value.matches(ty) {
            return Err(ContractError::Encode(format!("value {value} does not match type {ty}")));
        }
        if ty.is_dynamic() {
            head.extend(U256::from(head_len + tail.len()).to_be_bytes::<WORD>());
            encode_tail(ty, value, &mut tail)?;
        } else {
            head.extend(encode_word(ty, value)?);
        }
    }

    head.extend(tail);
    Ok(head)
}

fn encode_word(ty: &TypeTag, value: &AbiValue) -> Result<[u8; WORD], ContractError> {
    let mut word = [0u8; WORD];
    match (ty, value) {
        (TypeTag::Address, AbiValue::Address(address)) => {
            word[12..].copy_from_slice(address.as_slice());
        }
        (TypeTag::Uint(bits), AbiValue::Uint(u)) => {
            if u.bit_len() > *bits {
                return Err(ContractError::Encode(format!("{u} does not fit in uint{bits}")));
            }
            word = u.to_be_bytes::<WORD>();
        }
        (TypeTag::Int(bits), AbiValue::Int(i)) => {
            if !int_fits(*i, *bits) {
                return Err(ContractError::Encode(format!("{i} does not fit in int{bits}")));
            }
            word = i.into_raw().to_be_bytes::<WORD>();
        }
        (TypeTag::Bool, AbiValue::Bool(b)) => {
            word[WORD - 1] = u8::from(*b);
        }
        (TypeTag::FixedBytes(n), AbiValue::FixedBytes(bytes)) => {
            word[..*n].copy_from_slice(bytes);
        }
        _ => return Err(ContractError::Encode(format!("value {value} does not match type {ty}"))),
    }
    Ok(word)
}

fn encode_tail(ty: &TypeTag, value: &AbiValue, out: &mut Vec<u8>) -> Result<(), ContractError> {
    match (ty, value) {
        (TypeTag::Bytes, AbiValue::Bytes(bytes)) => encode_byte_payload(bytes, out),
        (TypeTag::String, AbiValue::String(s)) => encode_byte_payload(s.as_bytes(), out),
        (TypeTag::Array(inner), AbiValue::Array(elems)) => {
            out.extend(U256::from(elems.len()).to_be_bytes::<WORD>());
            let elem_types = vec![(**inner).clone(); elems.len()];
            out.extend(encode_values(&elem_types, elems)?);
            Ok(())
        }
        _ => Err(ContractError::Encode(format!("value {value} does not match type {ty}"))),
    }
}

fn encode_byte_payload(bytes: &[u8], out: &mut Vec<u8>) -> Result<(), ContractError> {
    out.extend(U256::from(bytes.len()).to_be_bytes::<WORD>());
    out.extend(bytes);
    let padding = (WORD - bytes.len() % WORD) % WORD;
    out.resize(out.len() + padding, 0);
    Ok(())
}

// A signed value fits in `bits` iff arithmetic-shifting away everything but
// the sign leaves all-zeros or all-ones.
fn int_fits(value: I256, bits: usize) -> bool {
    if bits == 256 {
        return true;
    }
    let shifted = value.asr(bits - 1);
    shifted == I256::ZERO || shifted == I256::MINUS_ONE
}

/// Decodes the return data of a call against the function's declared return
/// types, one value per declared return.
pub fn decode_result(function: &Function, data: &[u8]) -> Result<Vec<AbiValue>, ContractError> {
    decode_values(&function.outputs, data)
}

/// Decodes one ABI block against a positional type sequence.
///
/// Empty data against a non-empty type list fails explicitly; a contract
/// without the requested function typically returns no data, and silently
/// producing zero-valued defaults would mask that.
pub fn decode_values(types: &[TypeTag], data: &[u8]) -> Result<Vec<AbiValue>, ContractError> {
    if types.is_empty() {
        return Ok(Vec::new());
    }
    if data.is_empty() {
        return Err(ContractError::Decode(format!(
            "empty return data against {} declared return type(s)",
            types.len()
        )));
    }

    let mut values = Vec::with_capacity(types.len());
    for (i, ty) in types.iter().enumerate() {
        let head = word_at(data, i * WORD)?;
        if ty.is_dynamic() {
            let offset = word_to_offset(head, data.len())?;
            values.push(decode_tail(ty, data, offset)?);
        } else {
            values.push(decode_word(ty, head)?);
        }
    }
    Ok(values)
}

fn word_at(data: &[u8], offset: usize) -> Result<&[u8], ContractError> {
    data.get(offset..offset + WORD).ok_or_else(|| {
        ContractError::Decode(format!(
            "truncated data: need a word at byte {offset}, have {} bytes",
            data.len()
        ))
    })
}

fn word_to_offset(word: &[u8], len: usize) -> Result<usize, ContractError> {
    let value = U256::from_be_slice(word);
    let offset =
        usize::try_from(value).map_err(|_| ContractError::Decode(format!("offset {value} overflows")))?;
    if offset >= len {
        return Err(ContractError::Decode(format!(
            "dynamic offset {offset} is out of range for {len} bytes"
        )));
    }
    Ok(offset)
}

fn decode_word(ty: &TypeTag, word: &[u8]) -> Result<AbiValue, ContractError> {
    match ty {
        TypeTag::Address => {
            if word[..12].iter().any(|b| *b != 0) {
                return Err(ContractError::Decode("dirty upper bits in address word".to_string()));
            }
            Ok(AbiValue::Address(Address::from_slice(&word[12..])))
        }
        TypeTag::Uint(bits) => {
            let value = U256::from_be_slice(word);
            if value.bit_len() > *bits {
                return Err(ContractError::Decode(format!("{value} does not fit in uint{bits}")));
            }
            Ok(AbiValue::Uint(value))
        }
        TypeTag::Int(bits) => {
            let value = I256::from_raw(U256::from_be_slice(word));
            if !int_fits(value, *bits) {
                return Err(ContractError::Decode(format!("{value} does not fit in int{bits}")));
            }
            Ok(AbiValue::Int(value))
        }
        TypeTag::Bool => match word[WORD - 1] {
            0 if word[..WORD - 1].iter().all(|b| *b == 0) => Ok(AbiValue::Bool(false)),
            1 if word[..WORD - 1].iter().all(|b| *b == 0) => Ok(AbiValue::Bool(true)),
            _ => Err(ContractError::Decode("malformed bool word".to_string())),
        },
        TypeTag::FixedBytes(n) => Ok(AbiValue::FixedBytes(word[..*n].to_vec())),
        _ => Err(ContractError::Decode(format!("{ty} is not a static type"))),
    }
}

fn decode_tail(ty: &TypeTag, data: &[u8], offset: usize) -> Result<AbiValue, ContractError> {
    match ty {
        TypeTag::Bytes => Ok(AbiValue::Bytes(decode_byte_payload(data, offset)?)),
        TypeTag::String => {
            let bytes = decode_byte_payload(data, offset)?;
            String::from_utf8(bytes)
                .map(AbiValue::String)
                .map_err(|e| ContractError::Decode(format!("invalid UTF-8 in string: {e}")))
        }
        TypeTag::Array(inner) => {
            let len = decode_length(data, offset)?;
            if len == 0 {
                return Ok(AbiValue::Array(Vec::new()));
            }
            // Element heads and tails are laid out as their own block
            // starting right after the length word.
            let block = data.get(offset + WORD..).ok_or_else(|| {
                ContractError::Decode(format!("array data truncated at byte {}", offset + WORD))
            })?;
            // Every element occupies at least one head word, so a length
            // claiming more elements than the block can hold is garbage.
            // Check before the element-type vec is allocated.
            if len > block.len() / WORD {
                return Err(ContractError::Decode(format!(
                    "array length {len} exceeds {} bytes of element data",
                    block.len()
                )));
            }
            let elem_types = vec![(**inner).clone(); len];
            decode_values(&elem_types, block).map(AbiValue::Array)
        }
        _ => Err(ContractError::Decode(format!("{ty} is not a dynamic type"))),
    }
}

fn decode_length(data: &[u8], offset: usize) -> Result<usize, ContractError> {
    let word = word_at(data, offset)?;
    let value = U256::from_be_slice(word);
    usize::try_from(value)
        .map_err(|_| ContractError::Decode(format!("length {value} overflows")))
}

fn decode_byte_payload(data: &[u8], offset: usize) -> Result<Vec<u8>, ContractError> {
    let len = decode_length(data, offset)?;
    let start = offset + WORD;
    // The length comes off the wire; checked arithmetic keeps an absurd
    // value from wrapping the range instead of erroring.
    let end = start.checked_add(len).ok_or_else(|| {
        ContractError::Decode(format!("payload length {len} overflows at byte {start}"))
    })?;
    data.get(start..end).map(<[u8]>::to_vec).ok_or_else(|| {
        ContractError::Decode(format!(
            "truncated payload: {len} bytes declared at byte {start}, have {} bytes",
            data.len()
        ))
    })
}
