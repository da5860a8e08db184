//! Run-length scheme used for compressed Data packets.
//!
//! The stream is a sequence of runs, each introduced by a control byte:
//!
//! - `0x80 | n`: the next byte repeated `n + 2` times
//! - `n` (MSB clear): the next `n + 1` bytes copied verbatim

use crate::error::Error;

/// Longest repeat run a control byte can express.
pub const MAX_REPEAT_RUN: usize = 0x7F + 2;

/// Longest literal run a control byte can express.
pub const MAX_LITERAL_RUN: usize = 0x7F + 1;

/// Decode the first `input_len` bytes of `input` into `output`.
///
/// Returns the number of bytes written. Decoding stops with an error instead
/// of writing past `output` or reading past `input_len`.
pub fn decompress(input: &[u8], input_len: usize, output: &mut [u8]) -> Result<usize, Error> {
    let input = &input[..input_len.min(input.len())];
    let capacity = output.len();
    let mut comp_idx = 0;
    let mut decomp_idx = 0;

    while comp_idx < input.len() {
        let control = input[comp_idx];
        if control & 0x80 != 0 {
            let run = (control - 0x80) as usize + 2;
            let value = *input
                .get(comp_idx + 1)
                .ok_or(Error::TruncatedCompressedData { offset: comp_idx })?;
            let dest = output
                .get_mut(decomp_idx..decomp_idx + run)
                .ok_or(Error::DecompressionOverflow { capacity })?;
            dest.fill(value);
            comp_idx += 2;
            decomp_idx += run;
        } else {
            let run = control as usize + 1;
            let src = input
                .get(comp_idx + 1..comp_idx + 1 + run)
                .ok_or(Error::TruncatedCompressedData { offset: comp_idx })?;
            let dest = output
                .get_mut(decomp_idx..decomp_idx + run)
                .ok_or(Error::DecompressionOverflow { capacity })?;
            dest.copy_from_slice(src);
            comp_idx += run + 1;
            decomp_idx += run;
        }
    }
    Ok(decomp_idx)
}

/// Encode `data` with the same scheme, the way a sender compresses a packet.
pub fn compress(data: &[u8]) -> Vec<u8> {
    let mut packed = Vec::new();
    let mut i = 0;

    while i < data.len() {
        let run_value = data[i];
        let mut run_length = 1;

        while i + run_length < data.len()
            && run_length < MAX_REPEAT_RUN
            && data[i + run_length] == run_value
        {
            run_length += 1;
        }

        if run_length > 1 {
            packed.push(0x80 | (run_length - 2) as u8);
            packed.push(run_value);
            i += run_length;
        } else {
            // extend the literal until the next pair of equal bytes
            let start = i;
            i += 1;
            while i < data.len()
                && i - start < MAX_LITERAL_RUN
                && !(i + 1 < data.len() && data[i] == data[i + 1])
            {
                i += 1;
            }

            packed.push((i - start - 1) as u8);
            packed.extend_from_slice(&data[start..i]);
        }
    }

    packed
}
